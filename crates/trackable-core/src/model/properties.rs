use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scalar properties of an entity
///
/// Stored as JSON values so the kernel stays independent of domain structs.
/// Writing a property never changes tracking state; callers mark the entity
/// `Modified` explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Properties {
    data: BTreeMap<String, serde_json::Value>,
}

impl Properties {
    /// Create an empty property bag
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
        }
    }

    /// Get a value by name
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.data.get(name)
    }

    /// Set a value by name
    pub fn set(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.data.insert(name.into(), value);
    }

    /// Remove a value by name
    pub fn remove(&mut self, name: &str) -> Option<serde_json::Value> {
        self.data.remove(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<BTreeMap<String, serde_json::Value>> for Properties {
    fn from(data: BTreeMap<String, serde_json::Value>) -> Self {
        Self { data }
    }
}
