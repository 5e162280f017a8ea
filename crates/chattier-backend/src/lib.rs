// Hosted-backend contracts consumed by the chattier client core, plus an
// in-process implementation used by tests and local development.

pub mod auth;
pub mod event;
pub mod memory;
pub mod storage;
pub mod store;

pub use auth::{AuthProvider, AuthUser, MemoryAuth};
pub use event::{event_queue, EventKind, EventQueue, EventSink, TopicEvent};
pub use memory::{MemoryRealtime, MemoryStore};
pub use storage::{BlobStorage, MemoryBlobStorage, UploadEvent, UploadTask};
pub use store::RealtimeStore;
