//! Operation logging macros
//!
//! Every tracked operation logs a `start` event and then exactly one of
//! `end` or `end_error`. `log_op_start!` evaluates to the `Instant` the
//! operation started at; the closing macros take it back and record
//! `duration_ms` themselves.
//!
//! ```
//! # use trackable_core::{log_op_end, log_op_start};
//! let started = log_op_start!("set_state", entity = "e1");
//! log_op_end!(started, "set_state", changes_len = 3usize);
//! ```

/// Log the start of an operation and return its start time
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)+)?) => {{
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_START
            $(, $($field)+)?
        );
        std::time::Instant::now()
    }};
}

/// Log the successful end of an operation started at `$started`
#[macro_export]
macro_rules! log_op_end {
    ($started:expr, $op:expr $(, $($field:tt)+)?) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_END,
            duration_ms = $crate::logging_facility::elapsed_ms($started)
            $(, $($field)+)?
        )
    };
}

/// Log the failure of an operation started at `$started`
///
/// `$err` is anything convertible into `ExError`. Its stable code and
/// kind are recorded, together with the session and trace ids it carries.
///
/// ```
/// # use trackable_core::{log_op_error, log_op_start, model::EntityRef, TrackingError};
/// let started = log_op_start!("collection_remove");
/// let err = TrackingError::UnknownEntity { entity: EntityRef::new() };
/// log_op_error!(started, "collection_remove", err);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($started:expr, $op:expr, $err:expr $(, $($field:tt)+)?) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_END_ERROR,
            duration_ms = $crate::logging_facility::elapsed_ms($started),
            err.kind = ?ex_err.kind(),
            err.code = ex_err.code(),
            session_id = ex_err.session_id().map(|id| id.as_str()),
            trace_id = ex_err.trace_id().map(|id| id.as_str())
            $(, $($field)+)?
        );
    }};
}
