use serde::{Deserialize, Serialize};

/// Lifecycle tag recording what persistence must do with an entity
///
/// `Detached` doubles as the baseline for entities the context has never
/// seen: querying an unknown entity reports `Detached`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    #[default]
    Unchanged,
    Added,
    Modified,
    Deleted,
    Detached,
}

/// Why a state change is being requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCause {
    /// Direct `set_state` call or a collection membership change
    Assignment,
    /// Post-commit advancement after persistence reported success
    Commit,
}

impl TrackingState {
    /// All states, in declaration order
    pub const ALL: [TrackingState; 5] = [
        TrackingState::Unchanged,
        TrackingState::Added,
        TrackingState::Modified,
        TrackingState::Deleted,
        TrackingState::Detached,
    ];

    /// Whether persistence has work to do for this state
    pub fn is_changed(self) -> bool {
        matches!(
            self,
            TrackingState::Added | TrackingState::Modified | TrackingState::Deleted
        )
    }

    /// Whether the entity currently participates in a tracked graph
    pub fn is_attached(self) -> bool {
        self != TrackingState::Detached
    }

    /// State an entity settles into once its pending change is committed
    pub fn post_commit(self) -> TrackingState {
        match self {
            TrackingState::Added | TrackingState::Modified => TrackingState::Unchanged,
            TrackingState::Deleted => TrackingState::Detached,
            other => other,
        }
    }

    /// Check whether `self -> to` is a legal direct transition
    ///
    /// Re-assigning the current state is always accepted as a no-op, and an
    /// assignment may detach from any state.
    pub fn can_transition(self, to: TrackingState, cause: TransitionCause) -> bool {
        use TrackingState::*;

        if self == to {
            return true;
        }

        match cause {
            TransitionCause::Commit => self.post_commit() == to,
            TransitionCause::Assignment => matches!(
                (self, to),
                (_, Detached)
                    | (Unchanged, Added)
                    | (Unchanged, Modified)
                    | (Unchanged, Deleted)
                    | (Deleted, Unchanged)
                    | (Detached, Unchanged)
                    | (Detached, Added)
            ),
        }
    }
}

impl std::fmt::Display for TrackingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TrackingState::Unchanged => "Unchanged",
            TrackingState::Added => "Added",
            TrackingState::Modified => "Modified",
            TrackingState::Deleted => "Deleted",
            TrackingState::Detached => "Detached",
        };
        f.write_str(name)
    }
}
