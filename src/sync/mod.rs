//! Sync boundary: moving the entity graph to and from persistence.
//!
//! The store never talks to a backend directly. A [`BackgroundSaver`] is
//! registered as a save hook and pushes each new snapshot through a
//! [`SyncBackend`] on the tokio runtime, reporting the outcome as a
//! [`SyncNotice`].

mod file;
mod http;
mod saver;
mod snapshot;

use async_trait::async_trait;

pub use file::FileBackend;
pub use http::HttpBackend;
pub use saver::{BackgroundSaver, SyncNotice};
pub use snapshot::Snapshot;

use crate::errors::SyncError;

/// A binary file sent along with a snapshot save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: &str, content_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            bytes,
        }
    }
}

/// A persistence collaborator keyed by record id.
#[async_trait]
pub trait SyncBackend: Send + Sync {
    async fn fetch(&self, record_id: &str) -> Result<Snapshot, SyncError>;

    async fn save(
        &self,
        record_id: &str,
        snapshot: &Snapshot,
        attachment: Option<Attachment>,
    ) -> Result<(), SyncError>;

    /// Short label for logs.
    fn describe(&self) -> String;
}
