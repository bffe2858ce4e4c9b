//! In-memory capture of tracking events
//!
//! Installs a `tracing` layer that keeps every event's level and fields so
//! tests can ask what an operation logged: which op started or failed, for
//! which entity, with which error code, and which state changes it made.
//! Field lookups go through the schema constants.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::core_types::schema::{
    EVENT_END, EVENT_END_ERROR, EVENT_START, FIELD_CHANGES_LEN, FIELD_COLLECTION_ID,
    FIELD_COMPONENT, FIELD_DURATION_MS, FIELD_ENTITY, FIELD_ERR_CODE, FIELD_ERR_KIND,
    FIELD_EVENT, FIELD_OP, FIELD_REMAINING, FIELD_ROOTS_LEN, FIELD_SESSION_ID, FIELD_STATE_FROM,
    FIELD_STATE_TO, FIELD_TRACE_ID, FIELD_WARNINGS_LEN,
};
use crate::model::{EntityRef, TrackingState};

/// One recorded event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpEvent {
    level: Level,
    fields: BTreeMap<&'static str, String>,
}

impl OpEvent {
    pub fn level(&self) -> Level {
        self.level
    }

    /// Raw field value, formatted as it was recorded
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn component(&self) -> Option<&str> {
        self.field(FIELD_COMPONENT)
    }

    pub fn op(&self) -> Option<&str> {
        self.field(FIELD_OP)
    }

    pub fn is_start(&self) -> bool {
        self.field(FIELD_EVENT) == Some(EVENT_START)
    }

    pub fn is_end(&self) -> bool {
        self.field(FIELD_EVENT) == Some(EVENT_END)
    }

    pub fn is_error(&self) -> bool {
        self.field(FIELD_EVENT) == Some(EVENT_END_ERROR)
    }

    /// Whether the event names `entity` as its subject
    pub fn is_about(&self, entity: EntityRef) -> bool {
        self.field(FIELD_ENTITY) == Some(entity.to_string().as_str())
    }

    pub fn collection_id(&self) -> Option<&str> {
        self.field(FIELD_COLLECTION_ID)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.field(FIELD_SESSION_ID)
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.field(FIELD_TRACE_ID)
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.count(FIELD_DURATION_MS)
    }

    pub fn err_code(&self) -> Option<&str> {
        self.field(FIELD_ERR_CODE)
    }

    pub fn err_kind(&self) -> Option<&str> {
        self.field(FIELD_ERR_KIND)
    }

    pub fn roots_len(&self) -> Option<u64> {
        self.count(FIELD_ROOTS_LEN)
    }

    pub fn changes_len(&self) -> Option<u64> {
        self.count(FIELD_CHANGES_LEN)
    }

    pub fn warnings_len(&self) -> Option<u64> {
        self.count(FIELD_WARNINGS_LEN)
    }

    /// Children left live by a deleted root
    pub fn remaining(&self) -> Option<u64> {
        self.count(FIELD_REMAINING)
    }

    /// State move recorded by the event, when it carries both ends
    pub fn transition(&self) -> Option<(TrackingState, TrackingState)> {
        let from = parse_state(self.field(FIELD_STATE_FROM)?)?;
        let to = parse_state(self.field(FIELD_STATE_TO)?)?;
        Some((from, to))
    }

    fn count(&self, name: &str) -> Option<u64> {
        self.field(name)?.parse().ok()
    }
}

fn parse_state(value: &str) -> Option<TrackingState> {
    [
        TrackingState::Unchanged,
        TrackingState::Added,
        TrackingState::Modified,
        TrackingState::Deleted,
        TrackingState::Detached,
    ]
    .into_iter()
    .find(|state| state.to_string() == value)
}

#[derive(Default)]
struct Recorder(BTreeMap<&'static str, String>);

impl Visit for Recorder {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name(), value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name(), value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name(), value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name(), format!("{value:?}"));
    }
}

struct CaptureLayer(Arc<Mutex<Vec<OpEvent>>>);

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut recorder = Recorder::default();
        event.record(&mut recorder);
        let recorded = OpEvent {
            level: *event.metadata().level(),
            fields: recorder.0,
        };
        if let Ok(mut events) = self.0.lock() {
            events.push(recorded);
        }
    }
}

/// Shared handle on the captured events
#[derive(Clone, Default)]
pub struct TestCapture {
    events: Arc<Mutex<Vec<OpEvent>>>,
}

impl TestCapture {
    /// Every event captured so far
    pub fn events(&self) -> Vec<OpEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Events of one operation
    pub fn op(&self, op: &str) -> Vec<OpEvent> {
        self.matching(|e| e.op() == Some(op))
    }

    /// Events of one operation naming `entity`
    pub fn op_for(&self, op: &str, entity: EntityRef) -> Vec<OpEvent> {
        self.matching(|e| e.op() == Some(op) && e.is_about(entity))
    }

    /// State moves recorded for `entity`, in order
    pub fn transitions_of(&self, entity: EntityRef) -> Vec<(TrackingState, TrackingState)> {
        self.events()
            .iter()
            .filter(|e| e.is_about(entity))
            .filter_map(OpEvent::transition)
            .collect()
    }

    pub fn matching<F>(&self, predicate: F) -> Vec<OpEvent>
    where
        F: Fn(&OpEvent) -> bool,
    {
        self.events().into_iter().filter(|e| predicate(e)).collect()
    }
}

static CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install the capture as the global subscriber and return its handle
///
/// The subscriber is process-wide and installed once, so all tests of a
/// binary share one buffer; filter by entity refs or op names unique to
/// the test.
///
/// ```
/// use trackable_core::log_op_start;
/// use trackable_core::logging_facility::init_test_capture;
///
/// let capture = init_test_capture();
/// log_op_start!("doc_capture_op");
/// assert!(capture.op("doc_capture_op")[0].is_start());
/// ```
pub fn init_test_capture() -> TestCapture {
    CAPTURE
        .get_or_init(|| {
            let capture = TestCapture::default();
            tracing_subscriber::registry()
                .with(CaptureLayer(capture.events.clone()))
                .init();
            capture
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(fields: &[(&'static str, &str)]) -> OpEvent {
        OpEvent {
            level: Level::INFO,
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
        }
    }

    #[test]
    fn test_typed_accessors() {
        let entity = EntityRef::new();
        let id = entity.to_string();
        let e = event(&[
            (FIELD_OP, "set_state"),
            (FIELD_EVENT, EVENT_END),
            (FIELD_ENTITY, &id),
            (FIELD_CHANGES_LEN, "4"),
            (FIELD_DURATION_MS, "0"),
        ]);

        assert!(e.is_end());
        assert!(!e.is_start());
        assert!(e.is_about(entity));
        assert_eq!(e.changes_len(), Some(4));
        assert_eq!(e.duration_ms(), Some(0));
        assert_eq!(e.warnings_len(), None);
    }

    #[test]
    fn test_transition_needs_both_states() {
        let full = event(&[(FIELD_STATE_FROM, "Detached"), (FIELD_STATE_TO, "Added")]);
        let partial = event(&[(FIELD_STATE_TO, "Added")]);
        let garbled = event(&[(FIELD_STATE_FROM, "Gone"), (FIELD_STATE_TO, "Added")]);

        assert_eq!(
            full.transition(),
            Some((TrackingState::Detached, TrackingState::Added))
        );
        assert_eq!(partial.transition(), None);
        assert_eq!(garbled.transition(), None);
    }
}
