use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{Attachment, Snapshot, SyncBackend};
use crate::errors::SyncError;

/// Local persistence: one `{record_id}.json` per record in a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// reader never sees a half-written snapshot. Attachments are stored next
/// to the record as `{record_id}.files/{file_name}`.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record file. Ids that could escape the directory are
    /// rejected.
    pub fn record_path(&self, record_id: &str) -> Result<PathBuf, SyncError> {
        let valid = !record_id.is_empty()
            && record_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(SyncError::InvalidRecordId {
                record_id: record_id.to_string(),
            });
        }
        Ok(self.dir.join(format!("{}.json", record_id)))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SyncError + '_ {
    move |source| SyncError::Io {
        path: path.to_path_buf(),
        source,
    }
}

// Concurrent saves of one record each get their own temp file.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SyncError> {
    let tmp = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
    tokio::fs::write(&tmp, bytes).await.map_err(io_error(&tmp))?;
    tokio::fs::rename(&tmp, path).await.map_err(io_error(path))?;
    Ok(())
}

#[async_trait]
impl SyncBackend for FileBackend {
    async fn fetch(&self, record_id: &str) -> Result<Snapshot, SyncError> {
        let path = self.record_path(record_id)?;
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SyncError::RecordNotFound {
                    record_id: record_id.to_string(),
                });
            }
            Err(e) => return Err(io_error(&path)(e)),
        };
        Snapshot::from_json(&raw)
    }

    async fn save(
        &self,
        record_id: &str,
        snapshot: &Snapshot,
        attachment: Option<Attachment>,
    ) -> Result<(), SyncError> {
        let path = self.record_path(record_id)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(io_error(&self.dir))?;

        if let Some(attachment) = attachment {
            let files = self.dir.join(format!("{}.files", record_id));
            tokio::fs::create_dir_all(&files)
                .await
                .map_err(io_error(&files))?;
            let name = Path::new(&attachment.file_name)
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "attachment".into());
            let target = files.join(name);
            write_atomic(&target, &attachment.bytes).await?;
        }

        let json = snapshot.to_json()?;
        write_atomic(&path, json.as_bytes()).await?;
        tracing::debug!(record_id, path = %path.display(), "Snapshot written");
        Ok(())
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Element;
    use anyhow::Result;

    #[tokio::test]
    async fn test_save_then_fetch() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let backend = FileBackend::new(dir.path().join("records"));
        let snapshot = Snapshot {
            global_elements: vec![Element::new("Dak")],
            ..Default::default()
        };

        backend.save("plan-1", &snapshot, None).await?;
        let fetched = backend.fetch("plan-1").await?;
        assert_eq!(fetched, snapshot);
        let leftovers = std::fs::read_dir(dir.path().join("records"))?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path());
        let err = backend.fetch("nope").await.unwrap_err();
        assert!(matches!(err, SyncError::RecordNotFound { .. }));
    }

    #[tokio::test]
    async fn test_path_traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path());
        let err = backend.fetch("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidRecordId { .. }));
    }

    #[tokio::test]
    async fn test_attachment_is_stored_beside_record() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let backend = FileBackend::new(dir.path());
        let attachment = Attachment::new("../offerte.pdf", "application/pdf", b"%PDF".to_vec());
        backend
            .save("plan-1", &Snapshot::default(), Some(attachment))
            .await?;
        let stored = std::fs::read(dir.path().join("plan-1.files/offerte.pdf"))?;
        assert_eq!(stored, b"%PDF");
        Ok(())
    }
}
