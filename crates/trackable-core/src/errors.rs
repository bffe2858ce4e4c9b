use thiserror::Error;
use trackable_core_types::{SessionId, TraceId};

use crate::collection::CollectionId;
use crate::model::{EntityKey, EntityRef, NavigationRole, TrackingState};

/// Result type alias using TrackingError
pub type Result<T> = std::result::Result<T, TrackingError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that callers can match on
/// programmatically, independent of the message wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Lifecycle
    InvalidTransition,
    InconsistentCascade,

    // Structural
    UnknownEntity,
    NotFound,
    InvalidInput,
    TypeMismatch,
    AlreadyExists,
    IdentityConflict,

    // Traversal
    CycleOverflow,

    // Invariants
    InvariantViolation,

    // Integration
    InvalidConfig,
    Serialization,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidTransition => "ERR_INVALID_TRANSITION",
            ExErrorKind::InconsistentCascade => "ERR_INCONSISTENT_CASCADE",
            ExErrorKind::UnknownEntity => "ERR_UNKNOWN_ENTITY",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::TypeMismatch => "ERR_TYPE_MISMATCH",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::IdentityConflict => "ERR_IDENTITY_CONFLICT",
            ExErrorKind::CycleOverflow => "ERR_CYCLE_OVERFLOW",
            ExErrorKind::InvariantViolation => "ERR_INVARIANT_VIOLATION",
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether the calling layer may choose to continue after this kind
    ///
    /// Only cascade consistency diagnostics are advisory; everything else
    /// aborts the operation that raised it.
    pub fn is_advisory(&self) -> bool {
        matches!(self, ExErrorKind::InconsistentCascade)
    }
}

/// Canonical structured error type
///
/// Carries the classification plus correlation context for boundary layers
/// that report tracking failures.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity: Option<String>,
    entity_type: Option<String>,
    session_id: Option<SessionId>,
    trace_id: Option<TraceId>,
    message: String,
    related: Option<Vec<String>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity: None,
            entity_type: None,
            session_id: None,
            trace_id: None,
            message: String::new(),
            related: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity context
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Add entity type context
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Add session context
    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Add trace context
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add related entities (children left behind by an inconsistent cascade)
    pub fn with_related(mut self, related: Vec<String>) -> Self {
        self.related = Some(related);
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity context, if any
    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    /// Get the entity type context, if any
    pub fn entity_type(&self) -> Option<&str> {
        self.entity_type.as_deref()
    }

    /// Get the session context, if any
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Get the trace context, if any
    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get related entities, if any
    pub fn related(&self) -> Option<&[String]> {
        self.related.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity) = &self.entity {
            write!(f, " (entity: {})", entity)?;
        }
        if let Some(entity_type) = &self.entity_type {
            write!(f, " (entity_type: {})", entity_type)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for change-tracking operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackingError {
    // ===== Lifecycle Errors =====
    /// The requested state is not reachable from the entity's current state
    #[error("Invalid transition for entity {entity}: {from} -> {to}")]
    InvalidTransition {
        entity: EntityRef,
        from: TrackingState,
        to: TrackingState,
    },

    /// A parent was deleted while reachable children are still live
    #[error("Entity {root} was deleted while {} reachable children remain undeleted", .remaining.len())]
    InconsistentCascade {
        root: EntityRef,
        remaining: Vec<EntityRef>,
    },

    /// The entity was never attached to the tracking context
    #[error("Entity is not tracked: {entity}")]
    UnknownEntity { entity: EntityRef },

    /// Persistent key already belongs to another tracked instance
    #[error("Identity conflict: {entity_type} key {key} is already tracked by {existing}")]
    IdentityConflict {
        entity_type: String,
        key: EntityKey,
        existing: EntityRef,
    },

    // ===== Traversal Errors =====
    /// The walker visited more entities than the graph holds
    #[error("Graph walk from {root} exceeded {limit} visits")]
    CyclicGraphOverflow { root: EntityRef, limit: usize },

    // ===== Structural Errors =====
    /// Entity is not present in the graph store
    #[error("Entity not found: {entity}")]
    EntityNotFound { entity: EntityRef },

    /// Entity type was never registered
    #[error("Unknown entity type: {entity_type}")]
    UnknownEntityType { entity_type: String },

    /// Entity type already registered
    #[error("Entity type already registered: {entity_type}")]
    DuplicateEntityType { entity_type: String },

    /// Navigation is not declared on the entity type
    #[error("Entity type {entity_type} has no navigation named {navigation}")]
    UnknownNavigation {
        entity_type: String,
        navigation: String,
    },

    /// Navigation declared twice on the same entity type
    #[error("Entity type {entity_type} declares navigation {navigation} more than once")]
    DuplicateNavigation {
        entity_type: String,
        navigation: String,
    },

    /// Navigation used in the wrong direction
    #[error("Navigation {entity_type}.{navigation} is not a {expected} navigation")]
    NavigationRoleMismatch {
        entity_type: String,
        navigation: String,
        expected: NavigationRole,
    },

    /// Entity of the wrong type for a navigation or collection
    #[error("Type mismatch: expected {expected}, found {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Collection id not registered with the context
    #[error("Collection not found: {collection}")]
    CollectionNotFound { collection: CollectionId },

    // ===== Invariant Errors =====
    /// A tracking collection still holds a detached entity
    #[error("Collection {collection} holds detached entity {entity}")]
    DetachedCollectionMember {
        collection: CollectionId,
        entity: EntityRef,
    },

    /// A child navigation points at an entity missing from the graph
    #[error("Entity {entity} navigation {navigation} references missing entity {target}")]
    DanglingReference {
        entity: EntityRef,
        navigation: String,
        target: EntityRef,
    },

    /// A tracked entity reaches a child that was never attached
    #[error("Tracked entity {parent} reaches never-tracked child {child}")]
    UntrackedChild { parent: EntityRef, child: EntityRef },

    // ===== Integration Errors =====
    /// Configuration could not be read or parsed
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Serialization error (JSON/TOML encoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Conversion from TrackingError to ExError
///
/// Boundary layers report the structured form; the kernel itself matches on
/// `TrackingError` variants.
impl From<TrackingError> for ExError {
    fn from(err: TrackingError) -> Self {
        let message = err.to_string();
        match err {
            TrackingError::InvalidTransition { entity, .. } => {
                ExError::new(ExErrorKind::InvalidTransition)
                    .with_entity(entity.to_string())
                    .with_op("set_state")
                    .with_message(message)
            }
            TrackingError::InconsistentCascade { root, remaining } => {
                ExError::new(ExErrorKind::InconsistentCascade)
                    .with_entity(root.to_string())
                    .with_op("set_state")
                    .with_related(remaining.iter().map(|e| e.to_string()).collect())
                    .with_message(message)
            }
            TrackingError::UnknownEntity { entity } => ExError::new(ExErrorKind::UnknownEntity)
                .with_entity(entity.to_string())
                .with_message(message),
            TrackingError::IdentityConflict {
                entity_type,
                existing,
                ..
            } => ExError::new(ExErrorKind::IdentityConflict)
                .with_entity(existing.to_string())
                .with_entity_type(entity_type)
                .with_message(message),
            TrackingError::CyclicGraphOverflow { root, .. } => {
                ExError::new(ExErrorKind::CycleOverflow)
                    .with_entity(root.to_string())
                    .with_op("walk")
                    .with_message(message)
            }
            TrackingError::EntityNotFound { entity } => ExError::new(ExErrorKind::NotFound)
                .with_entity(entity.to_string())
                .with_message(message),
            TrackingError::CollectionNotFound { .. } => {
                ExError::new(ExErrorKind::NotFound).with_message(message)
            }
            TrackingError::UnknownEntityType { entity_type } => {
                ExError::new(ExErrorKind::NotFound)
                    .with_entity_type(entity_type)
                    .with_message(message)
            }
            TrackingError::DuplicateEntityType { entity_type }
            | TrackingError::DuplicateNavigation { entity_type, .. } => {
                ExError::new(ExErrorKind::AlreadyExists)
                    .with_entity_type(entity_type)
                    .with_message(message)
            }
            TrackingError::UnknownNavigation { entity_type, .. }
            | TrackingError::NavigationRoleMismatch { entity_type, .. } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_entity_type(entity_type)
                    .with_message(message)
            }
            TrackingError::TypeMismatch { expected, .. } => {
                ExError::new(ExErrorKind::TypeMismatch)
                    .with_entity_type(expected)
                    .with_message(message)
            }
            TrackingError::DetachedCollectionMember { entity, .. }
            | TrackingError::DanglingReference { entity, .. } => {
                ExError::new(ExErrorKind::InvariantViolation)
                    .with_entity(entity.to_string())
                    .with_op("validate")
                    .with_message(message)
            }
            TrackingError::UntrackedChild { parent, child } => {
                ExError::new(ExErrorKind::InvariantViolation)
                    .with_entity(parent.to_string())
                    .with_op("validate")
                    .with_related(vec![child.to_string()])
                    .with_message(message)
            }
            TrackingError::InvalidConfig { .. } => {
                ExError::new(ExErrorKind::InvalidConfig).with_message(message)
            }
            TrackingError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
            TrackingError::Internal { .. } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}

impl From<serde_json::Error> for TrackingError {
    fn from(err: serde_json::Error) -> Self {
        TrackingError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for TrackingError {
    fn from(err: toml::de::Error) -> Self {
        TrackingError::InvalidConfig {
            reason: err.to_string(),
        }
    }
}
