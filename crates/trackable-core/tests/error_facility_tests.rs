use trackable_core::errors::{ExError, ExErrorKind, TrackingError};
use trackable_core::{EntityKey, EntityRef, NavigationRole, TrackingState};

#[test]
fn test_invalid_transition_verifiable_by_kind() {
    let entity = EntityRef::new();
    let err = TrackingError::InvalidTransition {
        entity,
        from: TrackingState::Added,
        to: TrackingState::Modified,
    };

    let ex_err: ExError = err.into();

    assert_eq!(ex_err.kind(), ExErrorKind::InvalidTransition);
    assert_eq!(ex_err.code(), "ERR_INVALID_TRANSITION");
    assert_eq!(ex_err.entity(), Some(entity.to_string().as_str()));
    assert_eq!(ex_err.op(), Some("set_state"));
}

#[test]
fn test_inconsistent_cascade_lists_remaining_children() {
    let root = EntityRef::new();
    let remaining = vec![EntityRef::new(), EntityRef::new()];
    let err = TrackingError::InconsistentCascade {
        root,
        remaining: remaining.clone(),
    };
    assert!(err.to_string().contains("2 reachable children"));

    let ex_err: ExError = err.into();

    assert!(ex_err.kind().is_advisory());
    let related: Vec<String> = remaining.iter().map(|e| e.to_string()).collect();
    assert_eq!(ex_err.related(), Some(related.as_slice()));
}

#[test]
fn test_identity_conflict_structured_fields() {
    let existing = EntityRef::new();
    let err = TrackingError::IdentityConflict {
        entity_type: "Product".to_string(),
        key: EntityKey::Int(7),
        existing,
    };

    let ex_err: ExError = err.into();

    assert_eq!(ex_err.kind(), ExErrorKind::IdentityConflict);
    assert_eq!(ex_err.entity_type(), Some("Product"));
    assert!(ex_err.message().contains("key 7"));
    assert!(!ex_err.kind().is_advisory());
}

#[test]
fn test_structural_errors_classified() {
    let cases = vec![
        (
            TrackingError::EntityNotFound {
                entity: EntityRef::new(),
            },
            ExErrorKind::NotFound,
        ),
        (
            TrackingError::UnknownEntityType {
                entity_type: "Supplier".to_string(),
            },
            ExErrorKind::NotFound,
        ),
        (
            TrackingError::DuplicateEntityType {
                entity_type: "Product".to_string(),
            },
            ExErrorKind::AlreadyExists,
        ),
        (
            TrackingError::NavigationRoleMismatch {
                entity_type: "Product".to_string(),
                navigation: "Category".to_string(),
                expected: NavigationRole::Child,
            },
            ExErrorKind::InvalidInput,
        ),
        (
            TrackingError::TypeMismatch {
                expected: "Product".to_string(),
                actual: "Category".to_string(),
            },
            ExErrorKind::TypeMismatch,
        ),
        (
            TrackingError::CyclicGraphOverflow {
                root: EntityRef::new(),
                limit: 10,
            },
            ExErrorKind::CycleOverflow,
        ),
        (
            TrackingError::UntrackedChild {
                parent: EntityRef::new(),
                child: EntityRef::new(),
            },
            ExErrorKind::InvariantViolation,
        ),
    ];

    for (err, kind) in cases {
        let ex_err: ExError = err.into();
        assert_eq!(ex_err.kind(), kind);
    }
}

#[test]
fn test_error_kind_code_mapping() {
    let kinds = vec![
        (ExErrorKind::InvalidTransition, "ERR_INVALID_TRANSITION"),
        (ExErrorKind::InconsistentCascade, "ERR_INCONSISTENT_CASCADE"),
        (ExErrorKind::UnknownEntity, "ERR_UNKNOWN_ENTITY"),
        (ExErrorKind::IdentityConflict, "ERR_IDENTITY_CONFLICT"),
        (ExErrorKind::CycleOverflow, "ERR_CYCLE_OVERFLOW"),
        (ExErrorKind::InvariantViolation, "ERR_INVARIANT_VIOLATION"),
        (ExErrorKind::InvalidConfig, "ERR_INVALID_CONFIG"),
    ];

    for (kind, expected_code) in kinds {
        assert_eq!(kind.code(), expected_code);
    }
}

#[test]
fn test_toml_error_converts_to_invalid_config() {
    let err: TrackingError = toml::from_str::<toml::Value>("= nope")
        .map_err(TrackingError::from)
        .unwrap_err();

    assert!(matches!(err, TrackingError::InvalidConfig { .. }));
}
