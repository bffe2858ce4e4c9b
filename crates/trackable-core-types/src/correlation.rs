//! Correlation types for save-cycle tracking and tracing
//!
//! A `SessionId` names one change-tracking session (one save cycle owner);
//! a `TraceId` lets the calling layer stitch tracking events into a wider trace.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a change-tracking session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new SessionId using UUIDv7
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create from an existing string (for deserialization)
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trace identifier supplied by the calling layer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceId(String);

impl TraceId {
    /// Generate a new TraceId using UUIDv7
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create from an existing string (for deserialization)
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlation carried by a tracking session
#[derive(Debug, Clone)]
pub struct TrackingScope {
    pub session_id: SessionId,
    pub trace_id: Option<TraceId>,
}

impl TrackingScope {
    /// Create a new scope with a fresh SessionId
    pub fn new() -> Self {
        Self {
            session_id: SessionId::new(),
            trace_id: None,
        }
    }

    /// Create a scope for an existing session
    pub fn with_session_id(session_id: SessionId) -> Self {
        Self {
            session_id,
            trace_id: None,
        }
    }

    /// Attach the caller's TraceId
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }
}

impl Default for TrackingScope {
    fn default() -> Self {
        Self::new()
    }
}
