//! Remote topic events and the per-client event queue.
//!
//! Every subscription a client holds delivers into one shared unbounded
//! channel, so remote events and user intents interleave on a single
//! cooperative queue with no cross-topic ordering guarantee.

use serde_json::Value;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ChildAdded,
    ChildRemoved,
    ValueChanged,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventKind::ChildAdded => "child_added",
            EventKind::ChildRemoved => "child_removed",
            EventKind::ValueChanged => "value",
        };
        write!(f, "{s}")
    }
}

/// One incremental event from a subscribed topic.
#[derive(Debug, Clone)]
pub struct TopicEvent {
    /// The subscribed path this event was delivered for.
    pub path: String,
    pub kind: EventKind,
    /// Key of the affected child (empty for value events).
    pub key: String,
    pub value: Value,
    /// Cumulative number of children at `path` after the event.
    pub child_count: usize,
}

pub type EventSink = mpsc::UnboundedSender<TopicEvent>;
pub type EventQueue = mpsc::UnboundedReceiver<TopicEvent>;

/// Build the (sink, queue) pair one client shares across all its
/// subscriptions.
pub fn event_queue() -> (EventSink, EventQueue) {
    mpsc::unbounded_channel()
}
