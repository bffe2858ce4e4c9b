//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_SESSION_ID: &str = "session_id";
pub const FIELD_TRACE_ID: &str = "trace_id";

// Entity identifiers
pub const FIELD_ENTITY: &str = "entity";
pub const FIELD_COLLECTION_ID: &str = "collection_id";

// Tracking states
pub const FIELD_STATE_FROM: &str = "from";
pub const FIELD_STATE_TO: &str = "to";

// Counts
pub const FIELD_ROOTS_LEN: &str = "roots_len";
pub const FIELD_CHANGES_LEN: &str = "changes_len";
pub const FIELD_WARNINGS_LEN: &str = "warnings_len";
pub const FIELD_REMAINING: &str = "remaining";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
