use std::collections::HashMap;

use crate::errors::{Result, TrackingError};
use crate::model::{
    Entity, EntityKey, EntityRef, ModelRegistry, NavigationDescriptor, NavigationRole,
    NavigationValue,
};

/// Arena of entities and their navigation values
///
/// HashMap-backed and single-threaded: one owner manipulates a graph at a
/// time. All relationship edits go through here so that navigation names,
/// roles and target types are checked against the registry.
#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    registry: ModelRegistry,
    pub(crate) entities: HashMap<EntityRef, Entity>,
}

impl EntityGraph {
    /// Create an empty graph over a model registry
    pub fn new(registry: ModelRegistry) -> Self {
        Self {
            registry,
            entities: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Create a new (keyless) entity of a registered type
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntityType` if the type is not registered.
    pub fn create(&mut self, entity_type: &str) -> Result<EntityRef> {
        let entity = Entity::new(self.registry.get(entity_type)?);
        let id = entity.id;
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Create an entity that already has a persistence key
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntityType` if the type is not registered.
    pub fn create_with_key(
        &mut self,
        entity_type: &str,
        key: impl Into<EntityKey>,
    ) -> Result<EntityRef> {
        let id = self.create(entity_type)?;
        self.get_mut(id)?.key = Some(key.into());
        Ok(id)
    }

    /// Insert a prebuilt entity
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntityType` if the entity's type is not registered.
    pub fn insert_entity(&mut self, entity: Entity) -> Result<EntityRef> {
        self.registry.get(&entity.entity_type)?;
        let id = entity.id;
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Get an entity
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if the entity is not in the graph.
    pub fn get(&self, entity: EntityRef) -> Result<&Entity> {
        self.entities
            .get(&entity)
            .ok_or(TrackingError::EntityNotFound { entity })
    }

    /// Get a mutable entity
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if the entity is not in the graph.
    pub fn get_mut(&mut self, entity: EntityRef) -> Result<&mut Entity> {
        self.entities
            .get_mut(&entity)
            .ok_or(TrackingError::EntityNotFound { entity })
    }

    pub fn contains(&self, entity: EntityRef) -> bool {
        self.entities.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All entities, unordered
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Find an entity instance by persistence key
    pub fn find_by_key(&self, entity_type: &str, key: &EntityKey) -> Option<EntityRef> {
        self.entities
            .values()
            .find(|e| e.entity_type == entity_type && e.key.as_ref() == Some(key))
            .map(|e| e.id)
    }

    /// Link `child` under `parent` through a child-role navigation
    ///
    /// Collections append (once); references are replaced.
    ///
    /// # Errors
    ///
    /// * `EntityNotFound` - parent or child missing
    /// * `UnknownNavigation` - navigation not declared on the parent type
    /// * `NavigationRoleMismatch` - navigation is a back-reference
    /// * `TypeMismatch` - child type differs from the navigation target
    pub fn add_child(&mut self, parent: EntityRef, navigation: &str, child: EntityRef) -> Result<()> {
        self.check_navigation(parent, navigation, NavigationRole::Child, child)?;
        let parent_entity = self.get_mut(parent)?;
        let value = parent_entity
            .navigations
            .get_mut(navigation)
            .ok_or_else(|| TrackingError::Internal {
                message: format!("navigation {} has no value slot", navigation),
            })?;

        match value {
            NavigationValue::Collection(items) => {
                if !items.contains(&child) {
                    items.push(child);
                }
            }
            NavigationValue::Reference(target) => *target = Some(child),
        }
        Ok(())
    }

    /// Point `child`'s back-reference navigation at `parent`
    ///
    /// # Errors
    ///
    /// Same as [`EntityGraph::add_child`], with the role expected to be `Parent`.
    pub fn set_parent(&mut self, child: EntityRef, navigation: &str, parent: EntityRef) -> Result<()> {
        self.check_navigation(child, navigation, NavigationRole::Parent, parent)?;
        let child_entity = self.get_mut(child)?;
        child_entity.navigations.insert(
            navigation.to_string(),
            NavigationValue::Reference(Some(parent)),
        );
        Ok(())
    }

    /// Unlink `child` from a child-role navigation of `parent`
    ///
    /// Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` or `UnknownNavigation`.
    pub fn remove_child(
        &mut self,
        parent: EntityRef,
        navigation: &str,
        child: EntityRef,
    ) -> Result<bool> {
        let entity_type = self.get(parent)?.entity_type.clone();
        let parent_entity = self.get_mut(parent)?;
        let value = parent_entity.navigations.get_mut(navigation).ok_or_else(|| {
            TrackingError::UnknownNavigation {
                entity_type,
                navigation: navigation.to_string(),
            }
        })?;

        let removed = match value {
            NavigationValue::Collection(items) => {
                let before = items.len();
                items.retain(|e| *e != child);
                items.len() != before
            }
            NavigationValue::Reference(target) if *target == Some(child) => {
                *target = None;
                true
            }
            NavigationValue::Reference(_) => false,
        };
        Ok(removed)
    }

    /// Direct children of an entity, following child-role navigations in
    /// declaration order
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` or `UnknownEntityType`.
    pub fn children(&self, entity: EntityRef) -> Result<Vec<EntityRef>> {
        let node = self.get(entity)?;
        let entity_type = self.registry.get(&node.entity_type)?;

        Ok(entity_type
            .child_navigations()
            .flat_map(|nav| node.targets(&nav.name).iter().copied())
            .collect())
    }

    fn check_navigation(
        &self,
        owner: EntityRef,
        navigation: &str,
        role: NavigationRole,
        target: EntityRef,
    ) -> Result<&NavigationDescriptor> {
        let owner_entity = self.get(owner)?;
        let target_entity = self.get(target)?;
        let owner_type = self.registry.get(&owner_entity.entity_type)?;

        let nav = owner_type
            .navigation(navigation)
            .ok_or_else(|| TrackingError::UnknownNavigation {
                entity_type: owner_type.name.clone(),
                navigation: navigation.to_string(),
            })?;

        if nav.role != role {
            return Err(TrackingError::NavigationRoleMismatch {
                entity_type: owner_type.name.clone(),
                navigation: navigation.to_string(),
                expected: role,
            });
        }

        if nav.target != target_entity.entity_type {
            return Err(TrackingError::TypeMismatch {
                expected: nav.target.clone(),
                actual: target_entity.entity_type.clone(),
            });
        }

        Ok(nav)
    }
}
