use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TrackingError};

/// Cardinality of a navigation property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationKind {
    /// Singular reference (one-to-one or many-to-one)
    Reference,
    /// Zero or more related entities (one-to-many)
    Collection,
}

/// Direction of a navigation relative to the declaring type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationRole {
    /// Points at dependents; followed by the walker
    Child,
    /// Back-reference to the principal; never followed by cascades
    Parent,
}

impl std::fmt::Display for NavigationRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NavigationRole::Child => f.write_str("child"),
            NavigationRole::Parent => f.write_str("parent"),
        }
    }
}

/// Statically declared navigation property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationDescriptor {
    pub name: String,
    pub kind: NavigationKind,
    pub role: NavigationRole,
    /// Entity type the navigation points at
    pub target: String,
}

impl NavigationDescriptor {
    /// Collection of children, e.g. `Category.Products`
    pub fn children(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NavigationKind::Collection,
            role: NavigationRole::Child,
            target: target.into(),
        }
    }

    /// Single owned child, e.g. `Order.Shipment`
    pub fn child(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NavigationKind::Reference,
            role: NavigationRole::Child,
            target: target.into(),
        }
    }

    /// Back-reference to a principal, e.g. `Product.Category`
    pub fn parent(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NavigationKind::Reference,
            role: NavigationRole::Parent,
            target: target.into(),
        }
    }
}

/// Relationship descriptor for one entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityType {
    pub name: String,
    /// Navigations in declaration order; walk order follows it
    pub navigations: Vec<NavigationDescriptor>,
}

impl EntityType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            navigations: Vec::new(),
        }
    }

    /// Builder-style navigation declaration
    pub fn with_navigation(mut self, navigation: NavigationDescriptor) -> Self {
        self.navigations.push(navigation);
        self
    }

    /// Look up a navigation by name
    pub fn navigation(&self, name: &str) -> Option<&NavigationDescriptor> {
        self.navigations.iter().find(|n| n.name == name)
    }

    /// Navigations the walker follows
    pub fn child_navigations(&self) -> impl Iterator<Item = &NavigationDescriptor> {
        self.navigations
            .iter()
            .filter(|n| n.role == NavigationRole::Child)
    }
}

/// Registry of entity types, built once before any graph is created
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    types: HashMap<String, EntityType>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    /// Register an entity type
    ///
    /// # Errors
    ///
    /// Returns `DuplicateEntityType` if the name is taken, or
    /// `DuplicateNavigation` if the type declares a navigation name twice.
    pub fn register(&mut self, entity_type: EntityType) -> Result<()> {
        if self.types.contains_key(&entity_type.name) {
            return Err(TrackingError::DuplicateEntityType {
                entity_type: entity_type.name,
            });
        }

        for (i, nav) in entity_type.navigations.iter().enumerate() {
            if entity_type.navigations[..i]
                .iter()
                .any(|other| other.name == nav.name)
            {
                return Err(TrackingError::DuplicateNavigation {
                    entity_type: entity_type.name.clone(),
                    navigation: nav.name.clone(),
                });
            }
        }

        self.types.insert(entity_type.name.clone(), entity_type);
        Ok(())
    }

    /// Builder-style registration
    ///
    /// # Errors
    ///
    /// Same as [`ModelRegistry::register`].
    pub fn with_type(mut self, entity_type: EntityType) -> Result<Self> {
        self.register(entity_type)?;
        Ok(self)
    }

    /// Get a registered type
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntityType` if the name was never registered.
    pub fn get(&self, name: &str) -> Result<&EntityType> {
        self.types
            .get(name)
            .ok_or_else(|| TrackingError::UnknownEntityType {
                entity_type: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
