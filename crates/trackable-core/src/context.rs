use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::collection::{CollectionId, EntityChanged, ListenerId, TrackingCollection};
use crate::config::TrackingConfig;
use crate::errors::{Result, TrackingError};
use crate::model::{EntityKey, EntityRef, TrackingState, TransitionCause};
use crate::ops::{EntityGraph, StateChange};

pub(crate) type Listener = Box<dyn FnMut(&EntityChanged)>;

/// Tracking record attached to one entity instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingEntry {
    pub state: TrackingState,
    /// Monotonic counter value of the entry's last state change
    pub sequence: u64,
    pub changed_at: DateTime<Utc>,
}

/// Explicit tracking context owning one object graph
///
/// Holds the graph, the per-instance state table and the tracking
/// collections observing it. Every tracking operation goes through a
/// context value; independent graphs use independent contexts.
pub struct TrackingContext {
    graph: EntityGraph,
    config: TrackingConfig,
    entries: HashMap<EntityRef, TrackingEntry>,
    pub(crate) collections: BTreeMap<CollectionId, TrackingCollection>,
    pub(crate) listeners: HashMap<CollectionId, Vec<(ListenerId, Listener)>>,
    next_collection: u64,
    next_listener: u64,
    sequence: u64,
}

impl TrackingContext {
    /// Create a context with default configuration
    pub fn new(graph: EntityGraph) -> Self {
        Self::with_config(graph, TrackingConfig::default())
    }

    pub fn with_config(graph: EntityGraph, config: TrackingConfig) -> Self {
        Self {
            graph,
            config,
            entries: HashMap::new(),
            collections: BTreeMap::new(),
            listeners: HashMap::new(),
            next_collection: 0,
            next_listener: 0,
            sequence: 0,
        }
    }

    pub fn graph(&self) -> &EntityGraph {
        &self.graph
    }

    /// Mutable graph access for building relationships
    ///
    /// Structural edits do not change tracking state.
    pub fn graph_mut(&mut self) -> &mut EntityGraph {
        &mut self.graph
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Current state of an entity; `Detached` if it was never attached
    pub fn state_of(&self, entity: EntityRef) -> TrackingState {
        self.entries
            .get(&entity)
            .map(|e| e.state)
            .unwrap_or(TrackingState::Detached)
    }

    /// Tracking entry of an entity
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntity` if the entity was never attached.
    pub fn entry(&self, entity: EntityRef) -> Result<&TrackingEntry> {
        self.entries
            .get(&entity)
            .ok_or(TrackingError::UnknownEntity { entity })
    }

    /// Whether the entity is part of the tracked graph (not `Detached`)
    pub fn is_tracked(&self, entity: EntityRef) -> bool {
        self.state_of(entity).is_attached()
    }

    /// Whether the entity was ever attached, including detached ones
    pub fn is_known(&self, entity: EntityRef) -> bool {
        self.entries.contains_key(&entity)
    }

    /// Entities currently attached, ordered by last state change
    pub fn tracked_entities(&self) -> Vec<EntityRef> {
        self.entities_where(TrackingState::is_attached)
    }

    /// Entities needing insert, update or delete, ordered by last state change
    pub fn changed_entities(&self) -> Vec<EntityRef> {
        self.entities_where(TrackingState::is_changed)
    }

    fn entities_where(&self, predicate: impl Fn(TrackingState) -> bool) -> Vec<EntityRef> {
        let mut selected: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, entry)| predicate(entry.state))
            .map(|(id, entry)| (entry.sequence, *id))
            .collect();
        selected.sort_unstable();
        selected.into_iter().map(|(_, id)| id).collect()
    }

    /// Record a persistence-assigned key for an entity awaiting insert
    ///
    /// # Errors
    ///
    /// * `EntityNotFound` - entity not in the graph
    /// * `InvalidTransition` - entity is not `Added`, so it is not awaiting an insert
    /// * `IdentityConflict` - another attached instance already has the key
    pub fn assign_identity(&mut self, entity: EntityRef, key: EntityKey) -> Result<()> {
        let state = self.state_of(entity);
        if state != TrackingState::Added {
            return Err(TrackingError::InvalidTransition {
                entity,
                from: state,
                to: TrackingState::Unchanged,
            });
        }

        let entity_type = self.graph.get(entity)?.entity_type.clone();
        if let Some(existing) = self.attached_with_key(&entity_type, &key, entity, &[]) {
            return Err(TrackingError::IdentityConflict {
                entity_type,
                key,
                existing,
            });
        }

        self.graph.get_mut(entity)?.key = Some(key);
        tracing::debug!(entity = %entity, "identity assigned");
        Ok(())
    }

    /// Advance one entity after a successful commit
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` when `to` is not the post-commit state of
    /// the entity's current state.
    pub(crate) fn commit_transition(
        &mut self,
        entity: EntityRef,
        to: TrackingState,
    ) -> Result<Option<StateChange>> {
        let from = self.state_of(entity);
        if !from.can_transition(to, TransitionCause::Commit) {
            return Err(TrackingError::InvalidTransition { entity, from, to });
        }
        Ok(self.apply_change(entity, to, true))
    }

    /// Check that attaching `entity` does not duplicate a tracked key
    ///
    /// `pending` lists entities about to be attached by the same operation.
    pub(crate) fn check_identity(&self, entity: EntityRef, pending: &[EntityRef]) -> Result<()> {
        let node = self.graph.get(entity)?;
        let Some(key) = &node.key else {
            return Ok(());
        };

        match self.attached_with_key(&node.entity_type, key, entity, pending) {
            Some(existing) => Err(TrackingError::IdentityConflict {
                entity_type: node.entity_type.clone(),
                key: key.clone(),
                existing,
            }),
            None => Ok(()),
        }
    }

    fn attached_with_key(
        &self,
        entity_type: &str,
        key: &EntityKey,
        except: EntityRef,
        pending: &[EntityRef],
    ) -> Option<EntityRef> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.state.is_attached())
            .map(|(id, _)| *id)
            .chain(pending.iter().copied())
            .filter(|id| *id != except)
            .find(|id| {
                self.graph
                    .get(*id)
                    .map(|e| e.entity_type == entity_type && e.key.as_ref() == Some(key))
                    .unwrap_or(false)
            })
    }

    /// Write a state into the table and propagate it to collections
    ///
    /// Returns None when the entity already had that state.
    pub(crate) fn apply_change(
        &mut self,
        entity: EntityRef,
        to: TrackingState,
        notify: bool,
    ) -> Option<StateChange> {
        let from = self.state_of(entity);
        if from == to {
            return None;
        }

        self.sequence += 1;
        self.entries.insert(
            entity,
            TrackingEntry {
                state: to,
                sequence: self.sequence,
                changed_at: Utc::now(),
            },
        );

        tracing::debug!(entity = %entity, from = %from, to = %to, "state changed");
        let change = StateChange { entity, from, to };
        self.sync_collections(&change, notify);
        Some(change)
    }

    /// Mirror a state change into every collection holding the entity
    ///
    /// Listeners only hear about changes in tracking collections, but
    /// membership follows the state everywhere: a detached entity leaves
    /// every collection, a deleted one is hidden from the view.
    fn sync_collections(&mut self, change: &StateChange, notify: bool) {
        for (id, collection) in self.collections.iter_mut() {
            if !collection.holds(change.entity) {
                continue;
            }

            if notify && collection.is_tracking() {
                if let Some(listeners) = self.listeners.get_mut(id) {
                    let event = EntityChanged {
                        collection: *id,
                        entity: change.entity,
                        from: change.from,
                        to: change.to,
                    };
                    for (_, listener) in listeners.iter_mut() {
                        listener(&event);
                    }
                }
            }

            if change.to == TrackingState::Detached {
                collection.remove_item(change.entity);
            } else {
                collection.mark_removed(change.entity, change.to == TrackingState::Deleted);
            }
        }
    }

    pub(crate) fn allocate_collection_id(&mut self) -> CollectionId {
        self.next_collection += 1;
        CollectionId::new(self.next_collection)
    }

    pub(crate) fn allocate_listener_id(&mut self) -> ListenerId {
        self.next_listener += 1;
        ListenerId::new(self.next_listener)
    }
}

impl std::fmt::Debug for TrackingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingContext")
            .field("entities", &self.graph.len())
            .field("entries", &self.entries.len())
            .field("collections", &self.collections.len())
            .field("config", &self.config)
            .finish()
    }
}
