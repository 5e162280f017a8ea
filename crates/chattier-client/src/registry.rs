//! Tracks which remote topics are currently listened to.
//!
//! Every subscription in the client goes through this registry; nothing
//! else calls `RealtimeStore::subscribe`. That rules out duplicate
//! listeners, which would double-deliver every event.

use std::sync::Arc;

use tracing::debug;

use chattier_backend::{EventKind, EventSink, RealtimeStore};
use chattier_shared::types::ChannelId;

/// Who a subscription belongs to, for scoped teardown on channel switch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Owner {
    Global,
    Channel(ChannelId),
}

struct Entry {
    owner: Owner,
    path: String,
    kind: EventKind,
}

pub struct SubscriptionRegistry {
    store: Arc<dyn RealtimeStore>,
    sink: EventSink,
    entries: Vec<Entry>,
}

impl SubscriptionRegistry {
    pub fn new(store: Arc<dyn RealtimeStore>, sink: EventSink) -> Self {
        Self {
            store,
            sink,
            entries: Vec::new(),
        }
    }

    /// Subscribe `path`/`kind` on behalf of `owner`. Returns false and
    /// leaves the existing listener untouched if the identical tuple is
    /// already registered.
    pub fn register(&mut self, owner: Owner, path: &str, kind: EventKind) -> bool {
        let exists = self
            .entries
            .iter()
            .any(|e| e.owner == owner && e.path == path && e.kind == kind);
        if exists {
            return false;
        }
        self.store.subscribe(path, kind, self.sink.clone());
        debug!(?owner, path, %kind, "listener registered");
        self.entries.push(Entry {
            owner,
            path: path.to_string(),
            kind,
        });
        true
    }

    /// Unregister every subscription held by `owner`. Idempotent.
    pub fn teardown_owner(&mut self, owner: &Owner) {
        let mut kept = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if &entry.owner == owner {
                self.store.unsubscribe(&entry.path, entry.kind);
                debug!(?owner, path = %entry.path, kind = %entry.kind, "listener removed");
            } else {
                kept.push(entry);
            }
        }
        self.entries = kept;
    }

    /// Unregister everything. Idempotent: a second call is a no-op.
    pub fn teardown_all(&mut self) {
        for entry in self.entries.drain(..) {
            self.store.unsubscribe(&entry.path, entry.kind);
        }
        debug!("all listeners removed");
    }

    pub fn is_registered(&self, owner: &Owner, path: &str, kind: EventKind) -> bool {
        self.entries
            .iter()
            .any(|e| &e.owner == owner && e.path == path && e.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
