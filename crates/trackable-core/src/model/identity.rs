use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Instance identity of an entity inside one graph
///
/// Generated when the entity is created (UUID v7) and never reassigned, so it
/// stays valid before persistence hands out a key and across relationship
/// changes. Cycle guards and state tables are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef(Uuid);

impl EntityRef {
    /// Generate a fresh instance identity
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EntityRef {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key assigned by persistence (database identity)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityKey {
    Int(i64),
    Text(String),
}

impl From<i64> for EntityKey {
    fn from(value: i64) -> Self {
        EntityKey::Int(value)
    }
}

impl From<&str> for EntityKey {
    fn from(value: &str) -> Self {
        EntityKey::Text(value.to_string())
    }
}

impl From<String> for EntityKey {
    fn from(value: String) -> Self {
        EntityKey::Text(value)
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKey::Int(v) => write!(f, "{}", v),
            EntityKey::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Relationship-independent identity of an entity
///
/// Entities without a persistence key are identified by their instance
/// reference; once a key is assigned the (type, key) pair identifies them
/// across instances.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityIdentity {
    Temporary {
        instance: EntityRef,
    },
    Persistent {
        entity_type: String,
        key: EntityKey,
    },
}

impl EntityIdentity {
    /// Whether persistence has never seen this entity
    pub fn is_temporary(&self) -> bool {
        matches!(self, EntityIdentity::Temporary { .. })
    }

    /// Persistence key, if assigned
    pub fn key(&self) -> Option<&EntityKey> {
        match self {
            EntityIdentity::Temporary { .. } => None,
            EntityIdentity::Persistent { key, .. } => Some(key),
        }
    }
}

impl std::fmt::Display for EntityIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityIdentity::Temporary { instance } => write!(f, "temp:{}", instance),
            EntityIdentity::Persistent { entity_type, key } => {
                write!(f, "{}:{}", entity_type, key)
            }
        }
    }
}
