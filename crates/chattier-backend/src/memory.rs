//! In-process realtime database used by tests and local development.
//!
//! A [`MemoryRealtime`] holds one shared JSON tree; every client session
//! obtains its own [`MemoryStore`] handle via [`MemoryRealtime::connect`].
//! Writes through any handle fan out child events to the matching
//! subscriptions of every session, which is what multi-client
//! synchronization scenarios exercise.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use chattier_shared::error::RemoteWriteError;
use chattier_shared::paths::CONNECTED;

use crate::event::{EventKind, EventSink, TopicEvent};
use crate::store::RealtimeStore;

type SessionId = u64;

struct Subscriber {
    session: SessionId,
    path: String,
    kind: EventKind,
    sink: EventSink,
}

#[derive(Default)]
struct Hub {
    root: Map<String, Value>,
    subs: Vec<Subscriber>,
    disconnect_hooks: HashMap<SessionId, Vec<String>>,
    next_session: SessionId,
    push_seq: u64,
    fail_writes: bool,
}

impl Hub {
    fn resolve(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('/');
        let first = segments.next()?;
        let mut node = self.root.get(first)?;
        for segment in segments {
            node = node.as_object()?.get(segment)?;
        }
        Some(node)
    }

    /// Child map at `path`, creating intermediate objects along the way.
    fn collection_mut(&mut self, path: &str) -> Option<&mut Map<String, Value>> {
        let mut node = &mut self.root;
        if path.is_empty() {
            return Some(node);
        }
        for segment in path.split('/') {
            let child = node
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            node = child.as_object_mut()?;
        }
        Some(node)
    }

    fn child_count(&self, path: &str) -> usize {
        self.resolve(path)
            .and_then(|v| v.as_object())
            .map(|m| m.len())
            .unwrap_or(0)
    }

    fn emit(&mut self, path: &str, kind: EventKind, key: &str, value: Value) {
        let child_count = self.child_count(path);
        self.subs.retain(|sub| !sub.sink.is_closed());
        for sub in self.subs.iter().filter(|s| s.path == path && s.kind == kind) {
            let _ = sub.sink.send(TopicEvent {
                path: path.to_string(),
                kind,
                key: key.to_string(),
                value: value.clone(),
                child_count,
            });
        }
    }

    fn set(&mut self, path: &str, value: Value) -> Result<(), RemoteWriteError> {
        if self.fail_writes {
            return Err(RemoteWriteError::new("write", path, "simulated write failure"));
        }
        let (parent, key) = split_parent(path);
        let Some(collection) = self.collection_mut(parent) else {
            return Err(RemoteWriteError::new("write", path, "parent is not a collection"));
        };
        let is_new = collection.insert(key.to_string(), value.clone()).is_none();
        if is_new {
            self.emit(parent, EventKind::ChildAdded, key, value);
        }
        Ok(())
    }

    fn delete(&mut self, path: &str) -> Result<(), RemoteWriteError> {
        if self.fail_writes {
            return Err(RemoteWriteError::new("remove", path, "simulated write failure"));
        }
        let (parent, key) = split_parent(path);
        let removed = self
            .collection_mut(parent)
            .and_then(|collection| collection.remove(key));
        if let Some(value) = removed {
            self.emit(parent, EventKind::ChildRemoved, key, value);
        }
        Ok(())
    }

    fn generate_push_id(&mut self) -> String {
        self.push_seq += 1;
        let millis = chrono::Utc::now().timestamp_millis();
        let suffix: [u8; 2] = rand::random();
        // zero-padded so lexical key order matches generation order
        format!("{millis:013}-{:06}-{}", self.push_seq, hex::encode(suffix))
    }
}

/// Split `a/b/c` into the parent collection path `a/b` and the key `c`.
fn split_parent(path: &str) -> (&str, &str) {
    path.rsplit_once('/').unwrap_or(("", path))
}

/// The shared in-process backend. Cheap to clone into test fixtures via
/// [`MemoryRealtime::connect`].
#[derive(Default)]
pub struct MemoryRealtime {
    hub: Arc<Mutex<Hub>>,
}

impl MemoryRealtime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new client session.
    pub fn connect(&self) -> MemoryStore {
        let mut hub = self.hub.lock().expect("lock poisoned");
        hub.next_session += 1;
        let session = hub.next_session;
        debug!(session, "session connected");
        MemoryStore {
            hub: self.hub.clone(),
            session,
        }
    }

    /// Make every subsequent write operation fail, for error-path tests.
    pub fn set_fail_writes(&self, fail: bool) {
        self.hub.lock().expect("lock poisoned").fail_writes = fail;
    }

    /// Current value at `path`, for test assertions.
    pub fn snapshot(&self, path: &str) -> Option<Value> {
        self.hub.lock().expect("lock poisoned").resolve(path).cloned()
    }
}

/// One session's handle. Dropping the handle does NOT run disconnect
/// hooks; call [`MemoryStore::disconnect`] to simulate the session ending.
pub struct MemoryStore {
    hub: Arc<Mutex<Hub>>,
    session: SessionId,
}

impl MemoryStore {
    /// End this session the way an abrupt connection loss would: tear off
    /// its subscriptions and run the server-side disconnect removals,
    /// fanning the resulting events out to surviving sessions.
    pub fn disconnect(&self) {
        let mut hub = self.hub.lock().expect("lock poisoned");
        hub.subs.retain(|s| s.session != self.session);
        let hooks = hub.disconnect_hooks.remove(&self.session).unwrap_or_default();
        debug!(session = self.session, hooks = hooks.len(), "session disconnected");
        for path in hooks {
            if let Err(e) = hub.delete(&path) {
                warn!(path = %path, error = %e, "disconnect removal failed");
            }
        }
    }
}

#[async_trait]
impl RealtimeStore for MemoryStore {
    fn subscribe(&self, path: &str, kind: EventKind, sink: EventSink) {
        let mut hub = self.hub.lock().expect("lock poisoned");

        // The connectivity topic is virtual: report the current state
        // (connected, by construction) instead of reading the tree.
        if path == CONNECTED && kind == EventKind::ValueChanged {
            let _ = sink.send(TopicEvent {
                path: CONNECTED.to_string(),
                kind,
                key: "connected".to_string(),
                value: Value::Bool(true),
                child_count: 0,
            });
        }

        // Replay children already present, each reporting the full count.
        if kind == EventKind::ChildAdded {
            if let Some(children) = hub.resolve(path).and_then(|v| v.as_object()) {
                let child_count = children.len();
                for (key, value) in children {
                    let _ = sink.send(TopicEvent {
                        path: path.to_string(),
                        kind,
                        key: key.clone(),
                        value: value.clone(),
                        child_count,
                    });
                }
            }
        }

        hub.subs.push(Subscriber {
            session: self.session,
            path: path.to_string(),
            kind,
            sink,
        });
    }

    fn unsubscribe(&self, path: &str, kind: EventKind) {
        let mut hub = self.hub.lock().expect("lock poisoned");
        hub.subs
            .retain(|s| !(s.session == self.session && s.path == path && s.kind == kind));
    }

    fn push_id(&self) -> String {
        self.hub.lock().expect("lock poisoned").generate_push_id()
    }

    async fn push(&self, path: &str, value: Value) -> Result<String, RemoteWriteError> {
        let mut hub = self.hub.lock().expect("lock poisoned");
        let key = hub.generate_push_id();
        hub.set(&format!("{path}/{key}"), value)
            .map_err(|e| RemoteWriteError::new("push", path, e.message))?;
        Ok(key)
    }

    async fn write(&self, path: &str, value: Value) -> Result<(), RemoteWriteError> {
        self.hub.lock().expect("lock poisoned").set(path, value)
    }

    async fn remove(&self, path: &str) -> Result<(), RemoteWriteError> {
        self.hub.lock().expect("lock poisoned").delete(path)
    }

    async fn fetch(&self, path: &str) -> Result<Option<Value>, RemoteWriteError> {
        Ok(self.hub.lock().expect("lock poisoned").resolve(path).cloned())
    }

    fn on_disconnect_remove(&self, path: &str) {
        let mut hub = self.hub.lock().expect("lock poisoned");
        let hooks = hub.disconnect_hooks.entry(self.session).or_default();
        if !hooks.iter().any(|p| p == path) {
            hooks.push(path.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::event_queue;
    use serde_json::json;

    fn drain(queue: &mut crate::event::EventQueue) -> Vec<TopicEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = queue.try_recv() {
            events.push(ev);
        }
        events
    }

    #[tokio::test]
    async fn child_added_fans_out_to_all_sessions() -> anyhow::Result<()> {
        let backend = MemoryRealtime::new();
        let store1 = backend.connect();
        let store2 = backend.connect();

        let (sink1, mut queue1) = event_queue();
        let (sink2, mut queue2) = event_queue();
        store1.subscribe("messages/c1", EventKind::ChildAdded, sink1);
        store2.subscribe("messages/c1", EventKind::ChildAdded, sink2);

        store1.push("messages/c1", json!({"content": "hi"})).await?;

        let e1 = drain(&mut queue1);
        let e2 = drain(&mut queue2);
        assert_eq!(e1.len(), 1);
        assert_eq!(e2.len(), 1);
        assert_eq!(e1[0].value["content"], "hi");
        assert_eq!(e1[0].child_count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn subscribe_replays_existing_children_in_order() -> anyhow::Result<()> {
        let backend = MemoryRealtime::new();
        let store = backend.connect();
        for i in 0..3 {
            store
                .push("messages/c1", json!({"content": format!("m{i}")}))
                .await?;
        }

        let (sink, mut queue) = event_queue();
        store.subscribe("messages/c1", EventKind::ChildAdded, sink);

        let events = drain(&mut queue);
        let contents: Vec<_> = events
            .iter()
            .map(|e| e.value["content"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(contents, vec!["m0", "m1", "m2"]);
        // replayed history reports the full count, not a running one
        assert!(events.iter().all(|e| e.child_count == 3));
        Ok(())
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() -> anyhow::Result<()> {
        let backend = MemoryRealtime::new();
        let store = backend.connect();
        let (sink, mut queue) = event_queue();
        store.subscribe("messages/c1", EventKind::ChildAdded, sink);
        store.unsubscribe("messages/c1", EventKind::ChildAdded);

        store.push("messages/c1", json!({"content": "hi"})).await?;
        assert!(drain(&mut queue).is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn remove_emits_child_removed_with_value() -> anyhow::Result<()> {
        let backend = MemoryRealtime::new();
        let store = backend.connect();
        store.write("typing/c1/u1", json!("Alice")).await?;

        let (sink, mut queue) = event_queue();
        store.subscribe("typing/c1", EventKind::ChildRemoved, sink);
        store.remove("typing/c1/u1").await?;

        let events = drain(&mut queue);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].key, "u1");
        assert_eq!(events[0].value, json!("Alice"));
        assert_eq!(events[0].child_count, 0);
        Ok(())
    }

    #[tokio::test]
    async fn overwrite_of_existing_key_is_silent() -> anyhow::Result<()> {
        let backend = MemoryRealtime::new();
        let store = backend.connect();
        store.write("typing/c1/u1", json!("Alice")).await?;

        let (sink, mut queue) = event_queue();
        store.subscribe("typing/c1", EventKind::ChildAdded, sink);
        drain(&mut queue); // replay

        store.write("typing/c1/u1", json!("Alice")).await?;
        assert!(drain(&mut queue).is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn disconnect_runs_registered_removals_for_other_sessions() -> anyhow::Result<()> {
        let backend = MemoryRealtime::new();
        let dying = backend.connect();
        let observer = backend.connect();

        dying.write("presence/u1", json!(true)).await?;
        dying.write("typing/c1/u1", json!("Alice")).await?;
        dying.on_disconnect_remove("presence/u1");
        dying.on_disconnect_remove("typing/c1/u1");

        let (sink, mut queue) = event_queue();
        observer.subscribe("presence", EventKind::ChildRemoved, sink.clone());
        observer.subscribe("typing/c1", EventKind::ChildRemoved, sink);

        dying.disconnect();

        let events = drain(&mut queue);
        assert_eq!(events.len(), 2);
        assert!(backend.snapshot("presence/u1").is_none());
        assert!(backend.snapshot("typing/c1/u1").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn connectivity_subscription_reports_connected() {
        let backend = MemoryRealtime::new();
        let store = backend.connect();
        let (sink, mut queue) = event_queue();
        store.subscribe(CONNECTED, EventKind::ValueChanged, sink);

        let events = drain(&mut queue);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].value, Value::Bool(true));
    }

    #[tokio::test]
    async fn push_ids_sort_in_generation_order() -> anyhow::Result<()> {
        let backend = MemoryRealtime::new();
        let store = backend.connect();
        let mut keys = Vec::new();
        for _ in 0..5 {
            keys.push(store.push("messages/c1", json!({})).await?);
        }
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        Ok(())
    }

    #[tokio::test]
    async fn failed_writes_surface_remote_write_error() {
        let backend = MemoryRealtime::new();
        let store = backend.connect();
        backend.set_fail_writes(true);
        let err = store.write("presence/u1", json!(true)).await.unwrap_err();
        assert_eq!(err.op, "write");
    }
}
