//! Blob storage contract with progress-reporting upload tasks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use chattier_shared::constants::MAX_UPLOAD_SIZE;

/// Progress or terminal event of a running upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    Progress {
        bytes_transferred: u64,
        total_bytes: u64,
    },
    Complete {
        url: String,
    },
    Failed {
        message: String,
    },
}

/// A pending upload. Yields progress events followed by exactly one
/// terminal event; after that, `next_event` returns `None`.
#[async_trait]
pub trait UploadTask: Send {
    async fn next_event(&mut self) -> Option<UploadEvent>;

    /// Abort the transfer; the next event is a `Failed` terminal.
    /// Cancelling a finished task is a no-op.
    fn cancel(&mut self);
}

pub trait BlobStorage: Send + Sync {
    fn upload(&self, path: &str, data: Bytes, content_type: &str) -> Box<dyn UploadTask>;
}

type ObjectMap = Arc<Mutex<HashMap<String, (Bytes, String)>>>;

/// In-process [`BlobStorage`]. Uploads report progress in four chunks and
/// complete with a `memory://` download URL; the object only becomes
/// visible once the terminal `Complete` event has been produced.
pub struct MemoryBlobStorage {
    objects: ObjectMap,
    max_size: usize,
    fail_uploads: Arc<Mutex<bool>>,
}

impl Default for MemoryBlobStorage {
    fn default() -> Self {
        Self {
            objects: Arc::default(),
            max_size: MAX_UPLOAD_SIZE,
            fail_uploads: Arc::default(),
        }
    }
}

impl MemoryBlobStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent upload fail at its first progress step.
    pub fn set_fail_uploads(&self, fail: bool) {
        *self.fail_uploads.lock().expect("lock poisoned") = fail;
    }

    /// Stored object payload, if the upload for `path` completed.
    pub fn object(&self, path: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .expect("lock poisoned")
            .get(path)
            .map(|(data, _)| data.clone())
    }
}

impl BlobStorage for MemoryBlobStorage {
    fn upload(&self, path: &str, data: Bytes, content_type: &str) -> Box<dyn UploadTask> {
        let fail = *self.fail_uploads.lock().expect("lock poisoned");
        Box::new(MemoryUploadTask {
            objects: self.objects.clone(),
            path: path.to_string(),
            content_type: content_type.to_string(),
            transferred: 0,
            data,
            max_size: self.max_size,
            state: if fail {
                TaskState::Doomed
            } else {
                TaskState::Running
            },
        })
    }
}

enum TaskState {
    Running,
    Doomed,
    Cancelled,
    Finished,
}

struct MemoryUploadTask {
    objects: ObjectMap,
    path: String,
    content_type: String,
    transferred: u64,
    data: Bytes,
    max_size: usize,
    state: TaskState,
}

#[async_trait]
impl UploadTask for MemoryUploadTask {
    async fn next_event(&mut self) -> Option<UploadEvent> {
        let total = self.data.len() as u64;
        match self.state {
            TaskState::Finished => None,
            TaskState::Cancelled => {
                self.state = TaskState::Finished;
                Some(UploadEvent::Failed {
                    message: "upload cancelled".to_string(),
                })
            }
            TaskState::Doomed => {
                self.state = TaskState::Finished;
                Some(UploadEvent::Failed {
                    message: "simulated transfer failure".to_string(),
                })
            }
            TaskState::Running => {
                if self.data.len() > self.max_size {
                    self.state = TaskState::Finished;
                    return Some(UploadEvent::Failed {
                        message: format!(
                            "object exceeds maximum size ({} > {} bytes)",
                            self.data.len(),
                            self.max_size
                        ),
                    });
                }
                if self.transferred < total {
                    let chunk = (total / 4).max(1);
                    self.transferred = (self.transferred + chunk).min(total);
                    return Some(UploadEvent::Progress {
                        bytes_transferred: self.transferred,
                        total_bytes: total,
                    });
                }
                self.objects.lock().expect("lock poisoned").insert(
                    self.path.clone(),
                    (self.data.clone(), self.content_type.clone()),
                );
                self.state = TaskState::Finished;
                tracing::debug!(path = %self.path, size = total, "upload complete");
                Some(UploadEvent::Complete {
                    url: format!("memory://{}", self.path),
                })
            }
        }
    }

    fn cancel(&mut self) {
        if !matches!(self.state, TaskState::Finished) {
            self.state = TaskState::Cancelled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn drain(task: &mut Box<dyn UploadTask>) -> Vec<UploadEvent> {
        let mut events = Vec::new();
        while let Some(ev) = task.next_event().await {
            events.push(ev);
        }
        events
    }

    #[tokio::test]
    async fn upload_progresses_then_completes() {
        let storage = MemoryBlobStorage::new();
        let data = Bytes::from(vec![0u8; 100]);
        let mut task = storage.upload("chat/public/c1/f.png", data, "image/png");

        let events = drain(&mut task).await;
        assert!(matches!(
            events.first(),
            Some(UploadEvent::Progress {
                bytes_transferred: 25,
                total_bytes: 100
            })
        ));
        assert_eq!(
            events.last(),
            Some(&UploadEvent::Complete {
                url: "memory://chat/public/c1/f.png".to_string()
            })
        );
        assert!(storage.object("chat/public/c1/f.png").is_some());
    }

    #[tokio::test]
    async fn cancelled_upload_fails_and_stores_nothing() {
        let storage = MemoryBlobStorage::new();
        let mut task = storage.upload("chat/public/c1/f.png", Bytes::from(vec![1u8; 64]), "image/png");

        assert!(matches!(
            task.next_event().await,
            Some(UploadEvent::Progress { .. })
        ));
        task.cancel();
        assert!(matches!(
            task.next_event().await,
            Some(UploadEvent::Failed { .. })
        ));
        assert_eq!(task.next_event().await, None);
        assert!(storage.object("chat/public/c1/f.png").is_none());
    }

    #[tokio::test]
    async fn oversized_upload_fails() {
        let storage = MemoryBlobStorage {
            max_size: 8,
            ..MemoryBlobStorage::new()
        };
        let mut task = storage.upload("p", Bytes::from(vec![0u8; 9]), "image/png");
        assert!(matches!(
            task.next_event().await,
            Some(UploadEvent::Failed { .. })
        ));
    }

    #[tokio::test]
    async fn empty_upload_completes_immediately() {
        let storage = MemoryBlobStorage::new();
        let mut task = storage.upload("p", Bytes::new(), "image/png");
        assert!(matches!(
            task.next_event().await,
            Some(UploadEvent::Complete { .. })
        ));
    }
}
