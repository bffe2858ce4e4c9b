//! Trackable Core - in-memory change tracking for entity graphs
//!
//! This crate tracks the lifecycle state of entities organised in a
//! parent/child object graph, independent of any database, including:
//! - Tracking states and their transition table
//! - Entity identities, type descriptors and an arena-backed graph store
//! - A cycle-safe graph walker over declared child relationships
//! - Cascading state assignment from a root to its reachable children
//! - Observable tracking collections with change snapshots
//! - Save-cycle sessions that advance states once persistence commits
//!
//! A persistence layer reads the changed set from a [`ChangeTrackingSession`]
//! snapshot and reports back with [`CommitOutcome`].

pub mod collection;
pub mod config;
pub mod context;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod ops;
pub mod rules;
pub mod session;
pub mod traversal;

pub use trackable_core_types as core_types;

// Re-export commonly used types
pub use collection::{CollectionId, EntityChanged, ListenerId, TrackingCollection};
pub use config::TrackingConfig;
pub use context::{TrackingContext, TrackingEntry};
pub use errors::{ExError, ExErrorKind, Result, TrackingError};
pub use model::{
    Entity, EntityIdentity, EntityKey, EntityRef, EntityType, ModelRegistry, NavigationDescriptor,
    NavigationKind, NavigationRole, Properties, TrackingState, TransitionCause,
};
pub use ops::cascade::{CascadeReport, CascadeWarning, StateChange};
pub use ops::EntityGraph;
pub use session::{ChangeSet, ChangeTrackingSession, CommitOutcome, CommitSummary};
