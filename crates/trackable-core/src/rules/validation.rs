use crate::context::TrackingContext;
use crate::errors::{Result, TrackingError};

use super::invariants;

/// Collect every invariant violation in the context
///
/// Checks, in order:
///
/// 1. Tracking collections hold only attached entities
/// 2. Navigation targets exist in the graph
/// 3. Tracked entities reach no untracked direct children
pub fn check_invariants(ctx: &TrackingContext) -> Vec<TrackingError> {
    let mut violations = Vec::new();

    violations.extend(
        invariants::find_detached_members(ctx)
            .into_iter()
            .map(|(collection, entity)| TrackingError::DetachedCollectionMember {
                collection,
                entity,
            }),
    );

    violations.extend(invariants::find_dangling_references(ctx).into_iter().map(
        |(entity, navigation, target)| TrackingError::DanglingReference {
            entity,
            navigation,
            target,
        },
    ));

    violations.extend(
        invariants::find_untracked_children(ctx)
            .into_iter()
            .map(|(parent, child)| TrackingError::UntrackedChild { parent, child }),
    );

    violations
}

/// Validate the context
///
/// # Errors
///
/// Returns the first violation found. For exhaustive reporting use
/// [`check_invariants`] or the individual finders.
pub fn validate_context(ctx: &TrackingContext) -> Result<()> {
    match check_invariants(ctx).into_iter().next() {
        Some(violation) => {
            tracing::warn!(error = %violation, "tracking invariant violated");
            Err(violation)
        }
        None => Ok(()),
    }
}
