//! Media upload state machine.

use chattier_backend::{UploadEvent, UploadTask};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadState {
    #[default]
    Idle,
    Uploading { percent: u8 },
    /// The last upload failed; cleared when a new upload starts.
    Errored,
}

/// Outcome of driving the pending upload by one event.
#[derive(Debug, PartialEq, Eq)]
pub enum UploadPoll {
    Idle,
    Progress(u8),
    /// Terminal success; the caller sends the file message to
    /// `feed_path`, captured when the upload started.
    Completed { url: String, feed_path: String },
    Failed(String),
}

/// Holds at most one in-flight upload task and the message feed it will
/// post into on completion. The feed is captured at start time so a
/// channel switch mid-transfer cannot divert the file message.
#[derive(Default)]
pub struct Uploader {
    state: UploadState,
    task: Option<Box<dyn UploadTask>>,
    feed_path: Option<String>,
}

impl Uploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    pub fn in_flight(&self) -> bool {
        self.task.is_some()
    }

    /// Adopt a new upload task. A still-running previous task is
    /// cancelled first.
    pub fn begin(&mut self, task: Box<dyn UploadTask>, feed_path: String) {
        self.cancel();
        self.task = Some(task);
        self.feed_path = Some(feed_path);
        self.state = UploadState::Uploading { percent: 0 };
    }

    /// Abort the pending transfer and return to idle. Safe to call with
    /// nothing in flight.
    pub fn cancel(&mut self) {
        if let Some(mut task) = self.task.take() {
            task.cancel();
        }
        self.feed_path = None;
        self.state = UploadState::Idle;
    }

    /// Advance the pending upload by one event.
    pub async fn poll(&mut self) -> UploadPoll {
        let Some(task) = self.task.as_mut() else {
            return UploadPoll::Idle;
        };
        match task.next_event().await {
            Some(UploadEvent::Progress {
                bytes_transferred,
                total_bytes,
            }) => {
                let percent = if total_bytes == 0 {
                    100
                } else {
                    ((bytes_transferred * 100) / total_bytes) as u8
                };
                self.state = UploadState::Uploading { percent };
                UploadPoll::Progress(percent)
            }
            Some(UploadEvent::Complete { url }) => {
                self.task = None;
                self.state = UploadState::Idle;
                let feed_path = self.feed_path.take().unwrap_or_default();
                UploadPoll::Completed { url, feed_path }
            }
            Some(UploadEvent::Failed { message }) => {
                self.task = None;
                self.feed_path = None;
                self.state = UploadState::Errored;
                UploadPoll::Failed(message)
            }
            None => {
                self.task = None;
                self.feed_path = None;
                self.state = UploadState::Idle;
                UploadPoll::Idle
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chattier_backend::{BlobStorage, MemoryBlobStorage};

    #[tokio::test]
    async fn upload_runs_to_completion_with_progress() {
        let storage = MemoryBlobStorage::new();
        let mut uploader = Uploader::new();
        let task = storage.upload("chat/public/c1/f.png", Bytes::from(vec![0u8; 100]), "image/png");
        uploader.begin(task, "messages/c1".to_string());
        assert_eq!(uploader.state(), UploadState::Uploading { percent: 0 });

        let mut last_percent = 0;
        loop {
            match uploader.poll().await {
                UploadPoll::Progress(p) => {
                    assert!(p >= last_percent);
                    last_percent = p;
                    assert_eq!(uploader.state(), UploadState::Uploading { percent: p });
                }
                UploadPoll::Completed { url, feed_path } => {
                    assert_eq!(url, "memory://chat/public/c1/f.png");
                    assert_eq!(feed_path, "messages/c1");
                    break;
                }
                other => panic!("unexpected poll outcome: {other:?}"),
            }
        }
        assert_eq!(last_percent, 100);
        assert_eq!(uploader.state(), UploadState::Idle);
        assert!(!uploader.in_flight());
    }

    #[tokio::test]
    async fn failed_transfer_ends_in_errored_state() {
        let storage = MemoryBlobStorage::new();
        storage.set_fail_uploads(true);
        let mut uploader = Uploader::new();
        let task = storage.upload("p", Bytes::from_static(b"x"), "image/png");
        uploader.begin(task, "messages/c1".to_string());

        assert!(matches!(uploader.poll().await, UploadPoll::Failed(_)));
        assert_eq!(uploader.state(), UploadState::Errored);
        assert!(!uploader.in_flight());
    }

    #[tokio::test]
    async fn cancel_resets_to_idle() {
        let storage = MemoryBlobStorage::new();
        let mut uploader = Uploader::new();
        let task = storage.upload("p", Bytes::from(vec![0u8; 64]), "image/png");
        uploader.begin(task, "messages/c1".to_string());

        uploader.cancel();
        assert_eq!(uploader.state(), UploadState::Idle);
        assert_eq!(uploader.poll().await, UploadPoll::Idle);
        assert!(storage.object("p").is_none());
    }
}
