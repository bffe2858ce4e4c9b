use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::descriptor::{EntityType, NavigationKind};
use super::identity::{EntityIdentity, EntityKey, EntityRef};
use super::properties::Properties;

/// Current value of a navigation property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationValue {
    Reference(Option<EntityRef>),
    Collection(Vec<EntityRef>),
}

impl NavigationValue {
    /// Empty value for a navigation of the given kind
    pub fn empty(kind: NavigationKind) -> Self {
        match kind {
            NavigationKind::Reference => NavigationValue::Reference(None),
            NavigationKind::Collection => NavigationValue::Collection(Vec::new()),
        }
    }

    /// Entities the navigation currently points at, in stored order
    pub fn targets(&self) -> &[EntityRef] {
        match self {
            NavigationValue::Reference(Some(target)) => std::slice::from_ref(target),
            NavigationValue::Reference(None) => &[],
            NavigationValue::Collection(items) => items,
        }
    }

    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.targets().contains(entity)
    }
}

/// A domain object participating in change tracking
///
/// Entities never carry their own tracking state: the `TrackingContext`
/// attaches it per instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Instance identity (stable for the lifetime of the graph)
    pub id: EntityRef,

    /// Registered entity type name
    pub entity_type: String,

    /// Persistence key, None until assigned
    pub key: Option<EntityKey>,

    /// Navigation values by navigation name
    pub navigations: HashMap<String, NavigationValue>,

    /// Scalar properties
    pub properties: Properties,
}

impl Entity {
    /// Create an entity of the given type with empty navigations
    pub fn new(entity_type: &EntityType) -> Self {
        let navigations = entity_type
            .navigations
            .iter()
            .map(|nav| (nav.name.clone(), NavigationValue::empty(nav.kind)))
            .collect();

        Self {
            id: EntityRef::new(),
            entity_type: entity_type.name.clone(),
            key: None,
            navigations,
            properties: Properties::new(),
        }
    }

    /// Relationship-independent identity
    pub fn identity(&self) -> EntityIdentity {
        match &self.key {
            Some(key) => EntityIdentity::Persistent {
                entity_type: self.entity_type.clone(),
                key: key.clone(),
            },
            None => EntityIdentity::Temporary { instance: self.id },
        }
    }

    /// Whether persistence has never assigned this entity a key
    pub fn is_new(&self) -> bool {
        self.key.is_none()
    }

    pub fn navigation(&self, name: &str) -> Option<&NavigationValue> {
        self.navigations.get(name)
    }

    /// Targets of a navigation; empty if the navigation is unknown or unset
    pub fn targets(&self, name: &str) -> &[EntityRef] {
        self.navigations
            .get(name)
            .map(NavigationValue::targets)
            .unwrap_or(&[])
    }
}
