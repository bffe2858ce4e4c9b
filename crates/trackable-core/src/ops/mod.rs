pub mod cascade;
pub mod graph;

pub use cascade::{CascadeReport, CascadeWarning, StateChange};
pub use graph::EntityGraph;
