//! Cascading state assignment
//!
//! `TrackingContext::set_state` is the single mutation surface for tracking
//! state. The requested state is applied to the root and its consequences
//! propagate down child-role navigations:
//!
//! | Root becomes | New child            | Known child |
//! |--------------|----------------------|-------------|
//! | `Added`      | `Added`              | unchanged   |
//! | `Modified`   | `Unchanged`          | unchanged   |
//! | `Unchanged`  | `Unchanged`          | unchanged   |
//! | `Deleted`    | `Unchanged` (+ warn) | unchanged   |
//! | `Detached`   | -                    | `Detached`  |
//!
//! A known child is one that has been attached at some point; a detached
//! child stays detached until it is assigned a state directly.
//! Nothing propagates upward: a child's assignment never touches its parent.

use serde::Serialize;

use crate::context::TrackingContext;
use crate::errors::{Result, TrackingError};
use crate::model::{EntityRef, TrackingState, TransitionCause};
use crate::traversal::{walk, WalkOptions};
use crate::{log_op_end, log_op_error, log_op_start};

/// One applied state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateChange {
    pub entity: EntityRef,
    pub from: TrackingState,
    pub to: TrackingState,
}

/// Diagnostic produced by a cascade that completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CascadeWarning {
    /// Root deleted while reachable children were left undeleted
    InconsistentCascade {
        root: EntityRef,
        remaining: Vec<EntityRef>,
    },
}

/// Outcome of one `set_state` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub root: EntityRef,
    pub requested: TrackingState,
    /// Changes in application order, root first
    pub changes: Vec<StateChange>,
    pub warnings: Vec<CascadeWarning>,
}

impl CascadeReport {
    pub fn is_consistent(&self) -> bool {
        self.warnings.is_empty()
    }

    /// State the given entity was moved to by this cascade, if any
    pub fn change_for(&self, entity: EntityRef) -> Option<&StateChange> {
        self.changes.iter().find(|c| c.entity == entity)
    }

    /// Promote warnings to an error
    ///
    /// # Errors
    ///
    /// Returns `InconsistentCascade` if the report carries a warning.
    pub fn into_strict(self) -> Result<Self> {
        match self.warnings.first() {
            Some(CascadeWarning::InconsistentCascade { root, remaining }) => {
                Err(TrackingError::InconsistentCascade {
                    root: *root,
                    remaining: remaining.clone(),
                })
            }
            None => Ok(self),
        }
    }
}

impl TrackingContext {
    /// Assign a state to `root` and cascade to its reachable children
    ///
    /// An untracked root is attached first (baseline `Unchanged`), so any
    /// state may be assigned to a fresh graph. All checks run before the
    /// first change is written; a failed call leaves every state untouched.
    /// Collection listeners are notified inline for each change.
    ///
    /// # Errors
    ///
    /// * `EntityNotFound` - root or a reachable child is missing from the graph
    /// * `InvalidTransition` - the root cannot move from its current state
    /// * `IdentityConflict` - an entity being attached duplicates a tracked key
    /// * `CyclicGraphOverflow` - the walk exceeded its visit budget
    /// * `InconsistentCascade` - only with `strict_cascade`; states stay applied
    pub fn set_state(&mut self, root: EntityRef, state: TrackingState) -> Result<CascadeReport> {
        let started = log_op_start!("set_state", entity = %root, to = %state);

        let report = self.cascade(root, state).map_err(|e| {
            log_op_error!(started, "set_state", e.clone(), entity = %root);
            e
        })?;

        log_op_end!(
            started,
            "set_state",
            entity = %root,
            changes_len = report.changes.len(),
            warnings_len = report.warnings.len()
        );

        if self.config().strict_cascade {
            report.into_strict()
        } else {
            Ok(report)
        }
    }

    fn cascade(&mut self, root: EntityRef, to: TrackingState) -> Result<CascadeReport> {
        self.graph().get(root)?;

        let from = self.state_of(root);
        let baseline = if self.is_tracked(root) {
            from
        } else {
            TrackingState::Unchanged
        };
        if to != TrackingState::Detached && !baseline.can_transition(to, TransitionCause::Assignment)
        {
            return Err(TrackingError::InvalidTransition {
                entity: root,
                from,
                to,
            });
        }

        let children = walk(
            self.graph(),
            root,
            WalkOptions {
                include_root: false,
                max_visits: self.config().max_walk_visits,
            },
        )
        .collect::<Result<Vec<_>>>()?;

        let mut plan = Vec::with_capacity(children.len() + 1);
        plan.push((root, to));
        plan.extend(
            children
                .iter()
                .filter_map(|child| self.cascaded_state(*child, to).map(|s| (*child, s))),
        );

        let attaching: Vec<EntityRef> = plan
            .iter()
            .filter(|(entity, state)| state.is_attached() && !self.is_tracked(*entity))
            .map(|(entity, _)| *entity)
            .collect();
        for (i, entity) in attaching.iter().enumerate() {
            self.check_identity(*entity, &attaching[..i])?;
        }

        let changes: Vec<StateChange> = plan
            .into_iter()
            .filter_map(|(entity, state)| self.apply_change(entity, state, true))
            .collect();

        let mut warnings = Vec::new();
        if to == TrackingState::Deleted {
            let remaining: Vec<EntityRef> = children
                .iter()
                .copied()
                .filter(|c| {
                    let state = self.state_of(*c);
                    state.is_attached() && state != TrackingState::Deleted
                })
                .collect();

            if !remaining.is_empty() {
                tracing::warn!(
                    entity = %root,
                    remaining = remaining.len(),
                    "deleted entity still has undeleted children"
                );
                warnings.push(CascadeWarning::InconsistentCascade { root, remaining });
            }
        }

        Ok(CascadeReport {
            root,
            requested: to,
            changes,
            warnings,
        })
    }

    /// State a reachable child takes when its root becomes `root_state`.
    ///
    /// Only never-seen children adopt a state. A child that was detached
    /// earlier (including a committed delete) keeps `Detached`.
    fn cascaded_state(&self, child: EntityRef, root_state: TrackingState) -> Option<TrackingState> {
        let tracked = self.is_tracked(child);
        match root_state {
            TrackingState::Detached => tracked.then_some(TrackingState::Detached),
            _ if self.is_known(child) => None,
            TrackingState::Added => Some(TrackingState::Added),
            TrackingState::Modified | TrackingState::Unchanged | TrackingState::Deleted => {
                Some(TrackingState::Unchanged)
            }
        }
    }
}
