//! Consistency checks over a tracking context
//!
//! `invariants` exposes one finder per rule returning every violation;
//! `validation` folds them into a single pass/fail result.

pub mod invariants;
pub mod validation;

pub use validation::{check_invariants, validate_context};
