//! Observable tracking collections
//!
//! A collection is an ordered set of entities of one type, owned by the
//! `TrackingContext`. While tracking is on, membership changes drive state
//! (insert marks new entities `Added`, remove deletes or discards them) and
//! every state change of a member is pushed to the collection's listeners.

use std::collections::HashSet;

use serde::Serialize;

use crate::context::TrackingContext;
use crate::errors::{Result, TrackingError};
use crate::model::{EntityRef, TrackingState};
use crate::ops::CascadeReport;
use crate::{log_op_end, log_op_start};

/// Handle of a collection registered with a context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CollectionId(u64);

impl CollectionId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for CollectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "collection-{}", self.0)
    }
}

/// Handle of a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }
}

/// Change record pushed to collection listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntityChanged {
    pub collection: CollectionId,
    pub entity: EntityRef,
    pub from: TrackingState,
    pub to: TrackingState,
}

/// Entities of one type observed for membership and state changes
///
/// The underlying store keeps members that were removed while persisted
/// (now `Deleted`) so change snapshots can still report them; `iter` and
/// `len` describe the current view without them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingCollection {
    entity_type: String,
    items: Vec<EntityRef>,
    removed: HashSet<EntityRef>,
    tracking: bool,
}

impl TrackingCollection {
    /// Create an unregistered collection
    pub fn new(entity_type: impl Into<String>, tracking: bool) -> Self {
        Self {
            entity_type: entity_type.into(),
            items: Vec::new(),
            removed: HashSet::new(),
            tracking,
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Members in the current view, in insertion order
    pub fn iter(&self) -> impl Iterator<Item = EntityRef> + '_ {
        self.items
            .iter()
            .copied()
            .filter(|e| !self.removed.contains(e))
    }

    /// Every member of the underlying store, including logically removed ones
    pub fn iter_all(&self) -> impl Iterator<Item = EntityRef> + '_ {
        self.items.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.items.len() - self.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the entity is in the current view
    pub fn contains(&self, entity: EntityRef) -> bool {
        self.holds(entity) && !self.removed.contains(&entity)
    }

    /// Whether the entity is in the underlying store
    pub fn holds(&self, entity: EntityRef) -> bool {
        self.items.contains(&entity)
    }

    pub(crate) fn push(&mut self, entity: EntityRef) {
        if !self.holds(entity) {
            self.items.push(entity);
        }
    }

    pub(crate) fn remove_item(&mut self, entity: EntityRef) {
        self.items.retain(|e| *e != entity);
        self.removed.remove(&entity);
    }

    pub(crate) fn mark_removed(&mut self, entity: EntityRef, removed: bool) {
        if removed {
            self.removed.insert(entity);
        } else {
            self.removed.remove(&entity);
        }
    }
}

impl TrackingContext {
    /// Register a new, empty collection with tracking on
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntityType` if the type is not registered.
    pub fn create_collection(&mut self, entity_type: &str) -> Result<CollectionId> {
        self.graph().registry().get(entity_type)?;
        Ok(self.register_collection(TrackingCollection::new(entity_type, true)))
    }

    /// Register a new, empty collection with tracking off (bulk loading)
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntityType` if the type is not registered.
    pub fn create_collection_untracked(&mut self, entity_type: &str) -> Result<CollectionId> {
        self.graph().registry().get(entity_type)?;
        Ok(self.register_collection(TrackingCollection::new(entity_type, false)))
    }

    /// Adopt a collection value, such as a `get_changes` snapshot
    pub fn register_collection(&mut self, collection: TrackingCollection) -> CollectionId {
        let id = self.allocate_collection_id();
        self.collections.insert(id, collection);
        id
    }

    /// Unregister a collection and its listeners
    ///
    /// # Errors
    ///
    /// Returns `CollectionNotFound` for an unknown id.
    pub fn drop_collection(&mut self, id: CollectionId) -> Result<TrackingCollection> {
        self.listeners.remove(&id);
        self.collections
            .remove(&id)
            .ok_or(TrackingError::CollectionNotFound { collection: id })
    }

    /// Read access to a collection
    ///
    /// # Errors
    ///
    /// Returns `CollectionNotFound` for an unknown id.
    pub fn collection(&self, id: CollectionId) -> Result<&TrackingCollection> {
        self.collections
            .get(&id)
            .ok_or(TrackingError::CollectionNotFound { collection: id })
    }

    /// Registered collections in creation order
    pub fn collections(&self) -> impl Iterator<Item = (CollectionId, &TrackingCollection)> {
        self.collections.iter().map(|(id, c)| (*id, c))
    }

    fn collection_mut(&mut self, id: CollectionId) -> Result<&mut TrackingCollection> {
        self.collections
            .get_mut(&id)
            .ok_or(TrackingError::CollectionNotFound { collection: id })
    }

    /// Insert an entity into a collection
    ///
    /// With tracking on, an untracked entity is marked `Added` (cascading to
    /// its children) and a tracked entity keeps its state. Re-inserting a
    /// member that was removed as `Deleted` re-attaches it as `Unchanged`.
    /// Returns the cascade report when a state assignment happened.
    ///
    /// # Errors
    ///
    /// * `CollectionNotFound` - unknown collection
    /// * `EntityNotFound` - entity not in the graph
    /// * `TypeMismatch` - entity type differs from the collection's
    /// * any error of [`TrackingContext::set_state`]
    pub fn collection_add(
        &mut self,
        id: CollectionId,
        entity: EntityRef,
    ) -> Result<Option<CascadeReport>> {
        let entity_type = self.graph().get(entity)?.entity_type.clone();
        let collection = self.collection(id)?;
        if collection.entity_type() != entity_type {
            return Err(TrackingError::TypeMismatch {
                expected: collection.entity_type().to_string(),
                actual: entity_type,
            });
        }

        let tracking = collection.is_tracking();
        let was_member = collection.holds(entity);
        let state = self.state_of(entity);

        if was_member && !(tracking && state == TrackingState::Deleted) {
            return Ok(None);
        }

        let started = log_op_start!("collection_add", collection_id = %id, entity = %entity);
        self.collection_mut(id)?.push(entity);

        let assigned = match (tracking, state) {
            (false, _) => Ok(None),
            (true, TrackingState::Deleted) => {
                self.set_state(entity, TrackingState::Unchanged).map(Some)
            }
            (true, _) if self.is_tracked(entity) => Ok(None),
            (true, _) => self.set_state(entity, TrackingState::Added).map(Some),
        };
        let report = match assigned {
            Ok(report) => report,
            Err(e) => {
                if !was_member && !self.is_tracked(entity) {
                    self.collection_mut(id)?.remove_item(entity);
                }
                return Err(e);
            }
        };

        log_op_end!(started, "collection_add", collection_id = %id, entity = %entity);
        Ok(report)
    }

    /// Remove an entity from a collection
    ///
    /// With tracking on, an `Added` member is discarded outright (detached
    /// with its subgraph); any other attached member is marked `Deleted` and
    /// kept in the underlying store so `get_changes` still reports it.
    ///
    /// # Errors
    ///
    /// * `CollectionNotFound` - unknown collection
    /// * `UnknownEntity` - entity is not a member of the collection
    /// * any error of [`TrackingContext::set_state`]
    pub fn collection_remove(
        &mut self,
        id: CollectionId,
        entity: EntityRef,
    ) -> Result<Option<CascadeReport>> {
        let collection = self.collection(id)?;
        if !collection.holds(entity) {
            return Err(TrackingError::UnknownEntity { entity });
        }

        if !collection.is_tracking() {
            self.collection_mut(id)?.remove_item(entity);
            return Ok(None);
        }

        let started = log_op_start!("collection_remove", collection_id = %id, entity = %entity);
        let report = match self.state_of(entity) {
            TrackingState::Added => {
                let report = self.set_state(entity, TrackingState::Detached)?;
                self.collection_mut(id)?.remove_item(entity);
                Some(report)
            }
            TrackingState::Detached => {
                self.collection_mut(id)?.remove_item(entity);
                None
            }
            TrackingState::Deleted => None,
            TrackingState::Unchanged | TrackingState::Modified => {
                Some(self.set_state(entity, TrackingState::Deleted)?)
            }
        };

        log_op_end!(started, "collection_remove", collection_id = %id, entity = %entity);
        Ok(report)
    }

    /// Turn tracking on or off for a collection
    ///
    /// Turning tracking on attaches never-tracked members as `Unchanged`
    /// (they were loaded from persistence) without raising notifications.
    /// Members that were detached earlier, such as committed deletes, are
    /// dropped from the collection instead of being attached again.
    ///
    /// # Errors
    ///
    /// Returns `CollectionNotFound` or `IdentityConflict`.
    pub fn set_tracking(&mut self, id: CollectionId, tracking: bool) -> Result<()> {
        let collection = self.collection(id)?;
        if collection.is_tracking() == tracking {
            return Ok(());
        }

        if tracking {
            let (stale, loaded): (Vec<EntityRef>, Vec<EntityRef>) = collection
                .iter_all()
                .filter(|e| !self.is_tracked(*e))
                .partition(|e| self.is_known(*e));
            for (i, entity) in loaded.iter().enumerate() {
                self.check_identity(*entity, &loaded[..i])?;
            }
            let collection = self.collection_mut(id)?;
            for entity in &stale {
                collection.remove_item(*entity);
            }
            for entity in loaded {
                self.apply_change(entity, TrackingState::Unchanged, false);
            }
        }

        self.collection_mut(id)?.tracking = tracking;
        tracing::debug!(collection_id = %id, tracking, "tracking toggled");
        Ok(())
    }

    /// Register a listener for state changes of the collection's members
    ///
    /// Listeners run synchronously inside the mutating call.
    ///
    /// # Errors
    ///
    /// Returns `CollectionNotFound` for an unknown id.
    pub fn subscribe<F>(&mut self, id: CollectionId, listener: F) -> Result<ListenerId>
    where
        F: FnMut(&EntityChanged) + 'static,
    {
        self.collection(id)?;
        let listener_id = self.allocate_listener_id();
        self.listeners
            .entry(id)
            .or_default()
            .push((listener_id, Box::new(listener)));
        Ok(listener_id)
    }

    /// Remove a listener; returns whether it was registered
    pub fn unsubscribe(&mut self, id: CollectionId, listener: ListenerId) -> bool {
        match self.listeners.get_mut(&id) {
            Some(listeners) => {
                let before = listeners.len();
                listeners.retain(|(lid, _)| *lid != listener);
                listeners.len() != before
            }
            None => false,
        }
    }

    /// Snapshot of the members needing insert, update or delete
    ///
    /// The result is a new, unregistered, non-tracking collection of the
    /// same entity type; the source collection is not modified.
    ///
    /// # Errors
    ///
    /// Returns `CollectionNotFound` for an unknown id.
    pub fn get_changes(&self, id: CollectionId) -> Result<TrackingCollection> {
        let collection = self.collection(id)?;
        let mut changes = TrackingCollection::new(collection.entity_type(), false);
        for entity in collection.iter_all() {
            if self.state_of(entity).is_changed() {
                changes.push(entity);
            }
        }
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityType, ModelRegistry};
    use crate::ops::EntityGraph;

    fn context() -> TrackingContext {
        let registry = ModelRegistry::new()
            .with_type(EntityType::new("Product"))
            .unwrap()
            .with_type(EntityType::new("Category"))
            .unwrap();
        TrackingContext::new(EntityGraph::new(registry))
    }

    #[test]
    fn test_collection_view_hides_removed() {
        let mut collection = TrackingCollection::new("Product", true);
        let a = EntityRef::new();
        let b = EntityRef::new();
        collection.push(a);
        collection.push(b);
        collection.push(a);

        collection.mark_removed(a, true);

        assert_eq!(collection.len(), 1);
        assert_eq!(collection.iter().collect::<Vec<_>>(), vec![b]);
        assert_eq!(collection.iter_all().count(), 2);
        assert!(collection.holds(a));
        assert!(!collection.contains(a));
    }

    #[test]
    fn test_add_rejects_wrong_type() {
        let mut ctx = context();
        let products = ctx.create_collection("Product").unwrap();
        let category = ctx.graph_mut().create("Category").unwrap();

        let result = ctx.collection_add(products, category);
        assert!(matches!(result, Err(TrackingError::TypeMismatch { .. })));
    }

    #[test]
    fn test_create_collection_unknown_type() {
        let mut ctx = context();
        assert!(matches!(
            ctx.create_collection("Supplier"),
            Err(TrackingError::UnknownEntityType { .. })
        ));
    }

    #[test]
    fn test_remove_non_member() {
        let mut ctx = context();
        let products = ctx.create_collection("Product").unwrap();
        let product = ctx.graph_mut().create("Product").unwrap();

        let result = ctx.collection_remove(products, product);
        assert!(matches!(result, Err(TrackingError::UnknownEntity { .. })));
    }

    #[test]
    fn test_unsubscribe() {
        let mut ctx = context();
        let products = ctx.create_collection("Product").unwrap();
        let listener = ctx.subscribe(products, |_| {}).unwrap();

        assert!(ctx.unsubscribe(products, listener));
        assert!(!ctx.unsubscribe(products, listener));
    }

    #[test]
    fn test_drop_collection() {
        let mut ctx = context();
        let products = ctx.create_collection("Product").unwrap();

        ctx.drop_collection(products).unwrap();
        assert!(matches!(
            ctx.collection(products),
            Err(TrackingError::CollectionNotFound { .. })
        ));
    }
}
