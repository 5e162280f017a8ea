//! The subscription/write contract of the hosted realtime database.

use async_trait::async_trait;
use serde_json::Value;

use chattier_shared::error::RemoteWriteError;

use crate::event::{EventKind, EventSink};

/// One client session's handle onto the hosted realtime database.
///
/// Subscriptions deliver [`crate::TopicEvent`]s into the provided sink;
/// `child_added` subscriptions replay the children already present at the
/// path before reporting new ones, which channel re-entry depends on.
/// All write operations resolve asynchronously and report failures as
/// [`RemoteWriteError`]; none of them retries.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Begin delivering `kind` events at `path` into `sink`.
    fn subscribe(&self, path: &str, kind: EventKind, sink: EventSink);

    /// Stop delivering `kind` events at `path`. Idempotent.
    fn unsubscribe(&self, path: &str, kind: EventKind);

    /// Reserve a generated child id without writing anything.
    fn push_id(&self) -> String;

    /// Append `value` under a generated child id and return the id.
    async fn push(&self, path: &str, value: Value) -> Result<String, RemoteWriteError>;

    /// Set the value at `path`, creating intermediate nodes.
    async fn write(&self, path: &str, value: Value) -> Result<(), RemoteWriteError>;

    /// Remove the value at `path`; removing an absent path is a no-op.
    async fn remove(&self, path: &str) -> Result<(), RemoteWriteError>;

    /// One-shot read of the value at `path`.
    async fn fetch(&self, path: &str) -> Result<Option<Value>, RemoteWriteError>;

    /// Register a server-side removal of `path` to run if this session
    /// drops without an explicit remove.
    fn on_disconnect_remove(&self, path: &str);
}
