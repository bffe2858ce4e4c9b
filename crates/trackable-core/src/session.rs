//! Save-cycle coordination
//!
//! A `ChangeTrackingSession` sits between the tracking context and a
//! persistence layer. The persistence layer asks for a snapshot of what has
//! to be written, performs the writes, and reports success back through
//! [`ChangeTrackingSession::on_commit_succeeded`]. Only then do the
//! committed entities advance: `Added`/`Modified` settle to `Unchanged`,
//! `Deleted` leaves the tracked graph as `Detached`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use trackable_core_types::{SessionId, TrackingScope};

use crate::context::TrackingContext;
use crate::errors::{ExError, Result, TrackingError};
use crate::model::{EntityKey, EntityRef, TrackingState};
use crate::ops::StateChange;
use crate::traversal::{walk, WalkOptions};
use crate::{log_op_end, log_op_error, log_op_start};

/// Entities below a set of roots that persistence has to write
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub roots: Vec<EntityRef>,
    pub inserts: Vec<EntityRef>,
    pub updates: Vec<EntityRef>,
    pub deletes: Vec<EntityRef>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inserts.len() + self.updates.len() + self.deletes.len()
    }

    /// Every entity in the set: inserts, then updates, then deletes
    pub fn iter(&self) -> impl Iterator<Item = EntityRef> + '_ {
        self.inserts
            .iter()
            .chain(&self.updates)
            .chain(&self.deletes)
            .copied()
    }

    pub fn contains(&self, entity: EntityRef) -> bool {
        self.iter().any(|e| e == entity)
    }
}

/// Success report from the persistence layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Roots whose subgraphs were written
    pub roots: Vec<EntityRef>,
    /// Keys generated by persistence for inserted entities
    pub identities: Vec<(EntityRef, EntityKey)>,
}

impl CommitOutcome {
    pub fn new(roots: impl IntoIterator<Item = EntityRef>) -> Self {
        Self {
            roots: roots.into_iter().collect(),
            identities: Vec::new(),
        }
    }

    pub fn with_identity(mut self, entity: EntityRef, key: impl Into<EntityKey>) -> Self {
        self.identities.push((entity, key.into()));
        self
    }
}

/// What a commit advanced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub session_id: SessionId,
    pub committed_at: DateTime<Utc>,
    pub changes: Vec<StateChange>,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// Coordinates one or more save cycles over a tracking context
#[derive(Debug, Clone)]
pub struct ChangeTrackingSession {
    scope: TrackingScope,
    pending: Option<ChangeSet>,
}

impl Default for ChangeTrackingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeTrackingSession {
    pub fn new() -> Self {
        Self::with_scope(TrackingScope::new())
    }

    pub fn with_scope(scope: TrackingScope) -> Self {
        Self {
            scope,
            pending: None,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.scope.session_id
    }

    pub fn scope(&self) -> &TrackingScope {
        &self.scope
    }

    /// The last snapshot not yet committed or discarded
    pub fn pending(&self) -> Option<&ChangeSet> {
        self.pending.as_ref()
    }

    /// Drop the pending snapshot without touching any state
    pub fn discard(&mut self) -> Option<ChangeSet> {
        self.pending.take()
    }

    /// Collect the changed entities reachable from `roots`
    ///
    /// Roots are included. Entities reachable from several roots are listed
    /// once, in walk order of the first root that reaches them.
    ///
    /// # Errors
    ///
    /// * `UnknownEntity` - a root was never attached
    /// * `EntityNotFound` / `CyclicGraphOverflow` - the walk failed
    pub fn snapshot(&mut self, ctx: &TrackingContext, roots: &[EntityRef]) -> Result<&ChangeSet> {
        let started = log_op_start!(
            "snapshot",
            session_id = %self.scope.session_id,
            roots_len = roots.len()
        );

        match collect_changes(ctx, roots) {
            Ok(changes) => {
                log_op_end!(
                    started,
                    "snapshot",
                    session_id = %self.scope.session_id,
                    changes_len = changes.len()
                );
                Ok(&*self.pending.insert(changes))
            }
            Err(e) => {
                log_op_error!(started, "snapshot", self.describe_error("snapshot", &e));
                Err(e)
            }
        }
    }

    /// Advance the committed subgraphs after persistence reported success
    ///
    /// Uses the pending snapshot when it was taken for the same roots,
    /// otherwise computes the changed set now. Identities are recorded
    /// first, then each entity advances from its own state; nothing is
    /// cascaded structurally.
    ///
    /// # Errors
    ///
    /// * `UnknownEntity` - a root was never attached
    /// * `InvalidTransition` - an identity was reported for an entity that
    ///   is not `Added`
    /// * `IdentityConflict` - a reported key is already tracked
    pub fn on_commit_succeeded(
        &mut self,
        ctx: &mut TrackingContext,
        outcome: CommitOutcome,
    ) -> Result<CommitSummary> {
        let started = log_op_start!(
            "commit",
            session_id = %self.scope.session_id,
            roots_len = outcome.roots.len()
        );

        let result = self.commit(ctx, outcome);
        match &result {
            Ok(summary) => {
                log_op_end!(
                    started,
                    "commit",
                    session_id = %self.scope.session_id,
                    changes_len = summary.changes.len()
                );
            }
            Err(e) => {
                log_op_error!(started, "commit", self.describe_error("commit", e));
            }
        }
        result
    }

    /// Boundary form of an error raised by this session
    ///
    /// Classifies the error and attaches the operation name together with
    /// the session and trace ids of this session's scope.
    pub fn describe_error(&self, op: &str, err: &TrackingError) -> ExError {
        let ex_err = ExError::from(err.clone())
            .with_op(op)
            .with_session_id(self.scope.session_id.clone());
        match &self.scope.trace_id {
            Some(trace_id) => ex_err.with_trace_id(trace_id.clone()),
            None => ex_err,
        }
    }

    fn commit(&mut self, ctx: &mut TrackingContext, outcome: CommitOutcome) -> Result<CommitSummary> {
        let changes = match self.pending.take() {
            Some(pending) if pending.roots == outcome.roots => {
                for root in &outcome.roots {
                    ctx.entry(*root)?;
                }
                pending
            }
            _ => collect_changes(ctx, &outcome.roots)?,
        };

        for (entity, key) in outcome.identities {
            ctx.assign_identity(entity, key)?;
        }

        let mut summary = CommitSummary {
            session_id: self.scope.session_id.clone(),
            committed_at: Utc::now(),
            changes: Vec::with_capacity(changes.len()),
            inserted: 0,
            updated: 0,
            deleted: 0,
        };

        for entity in changes.iter() {
            let from = ctx.state_of(entity);
            let Some(change) = ctx.commit_transition(entity, from.post_commit())? else {
                continue;
            };
            match from {
                TrackingState::Added => summary.inserted += 1,
                TrackingState::Modified => summary.updated += 1,
                TrackingState::Deleted => summary.deleted += 1,
                TrackingState::Unchanged | TrackingState::Detached => {}
            }
            summary.changes.push(change);
        }

        Ok(summary)
    }
}

fn collect_changes(ctx: &TrackingContext, roots: &[EntityRef]) -> Result<ChangeSet> {
    let mut changes = ChangeSet {
        roots: roots.to_vec(),
        ..ChangeSet::default()
    };
    let mut seen = HashSet::new();
    let options = WalkOptions {
        include_root: true,
        max_visits: ctx.config().max_walk_visits,
    };

    for root in roots {
        if !ctx.is_known(*root) {
            return Err(TrackingError::UnknownEntity { entity: *root });
        }
        for entity in walk(ctx.graph(), *root, options) {
            let entity = entity?;
            if !seen.insert(entity) {
                continue;
            }
            match ctx.state_of(entity) {
                TrackingState::Added => changes.inserts.push(entity),
                TrackingState::Modified => changes.updates.push(entity),
                TrackingState::Deleted => changes.deletes.push(entity),
                TrackingState::Unchanged | TrackingState::Detached => {}
            }
        }
    }

    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityType, ModelRegistry, NavigationDescriptor};
    use crate::ops::EntityGraph;

    fn context() -> (TrackingContext, EntityRef, EntityRef) {
        let registry = ModelRegistry::new()
            .with_type(
                EntityType::new("Category")
                    .with_navigation(NavigationDescriptor::children("Products", "Product")),
            )
            .unwrap()
            .with_type(EntityType::new("Product"))
            .unwrap();
        let mut graph = EntityGraph::new(registry);
        let category = graph.create("Category").unwrap();
        let product = graph.create("Product").unwrap();
        graph.add_child(category, "Products", product).unwrap();
        (TrackingContext::new(graph), category, product)
    }

    #[test]
    fn test_snapshot_groups_by_state() {
        let (mut ctx, category, product) = context();
        ctx.set_state(category, TrackingState::Modified).unwrap();
        ctx.set_state(product, TrackingState::Deleted).unwrap();

        let mut session = ChangeTrackingSession::new();
        let changes = session.snapshot(&ctx, &[category]).unwrap();

        assert_eq!(changes.updates, vec![category]);
        assert_eq!(changes.deletes, vec![product]);
        assert!(changes.inserts.is_empty());
        assert!(session.pending().is_some());
    }

    #[test]
    fn test_snapshot_unknown_root() {
        let (ctx, category, _) = context();
        let mut session = ChangeTrackingSession::new();

        let result = session.snapshot(&ctx, &[category]);
        assert!(matches!(result, Err(TrackingError::UnknownEntity { .. })));
        assert!(session.pending().is_none());
    }

    #[test]
    fn test_commit_advances_each_entity() {
        let (mut ctx, category, product) = context();
        ctx.set_state(category, TrackingState::Modified).unwrap();
        ctx.set_state(product, TrackingState::Deleted).unwrap();

        let mut session = ChangeTrackingSession::new();
        let summary = session
            .on_commit_succeeded(&mut ctx, CommitOutcome::new([category]))
            .unwrap();

        assert_eq!(summary.updated, 1);
        assert_eq!(summary.deleted, 1);
        assert_eq!(ctx.state_of(category), TrackingState::Unchanged);
        assert_eq!(ctx.state_of(product), TrackingState::Detached);
        assert!(ctx.changed_entities().is_empty());
    }

    #[test]
    fn test_commit_records_identity() {
        let (mut ctx, category, product) = context();
        ctx.set_state(category, TrackingState::Added).unwrap();

        let mut session = ChangeTrackingSession::new();
        session.snapshot(&ctx, &[category]).unwrap();
        let summary = session
            .on_commit_succeeded(
                &mut ctx,
                CommitOutcome::new([category])
                    .with_identity(category, 10i64)
                    .with_identity(product, 20i64),
            )
            .unwrap();

        assert_eq!(summary.inserted, 2);
        assert_eq!(
            ctx.graph().get(product).unwrap().key,
            Some(EntityKey::Int(20))
        );
        assert!(!ctx.graph().get(category).unwrap().is_new());
        assert!(session.pending().is_none());
    }

    #[test]
    fn test_identity_for_unchanged_entity_rejected() {
        let (mut ctx, category, _) = context();
        ctx.set_state(category, TrackingState::Unchanged).unwrap();

        let mut session = ChangeTrackingSession::new();
        let result = session.on_commit_succeeded(
            &mut ctx,
            CommitOutcome::new([category]).with_identity(category, 1i64),
        );
        assert!(matches!(
            result,
            Err(TrackingError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_failed_commit_error_carries_session() {
        let (mut ctx, category, _) = context();
        let scope = TrackingScope::new().with_trace_id(trackable_core_types::TraceId::new());
        let mut session = ChangeTrackingSession::with_scope(scope);

        let err = session
            .on_commit_succeeded(&mut ctx, CommitOutcome::new([category]))
            .unwrap_err();
        let ex_err = session.describe_error("commit", &err);

        assert_eq!(ex_err.code(), "ERR_UNKNOWN_ENTITY");
        assert_eq!(ex_err.op(), Some("commit"));
        assert_eq!(ex_err.session_id(), Some(session.id()));
        assert_eq!(ex_err.trace_id(), session.scope().trace_id.as_ref());
        assert!(ex_err.trace_id().is_some());
    }

    #[test]
    fn test_discard_keeps_states() {
        let (mut ctx, category, _) = context();
        ctx.set_state(category, TrackingState::Added).unwrap();

        let mut session = ChangeTrackingSession::new();
        session.snapshot(&ctx, &[category]).unwrap();
        let discarded = session.discard().unwrap();

        assert_eq!(discarded.len(), 2);
        assert_eq!(ctx.state_of(category), TrackingState::Added);
    }
}
