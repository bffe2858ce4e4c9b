pub mod walker;

pub use walker::{reachable, walk, Walk, WalkOptions};
