//! Moving the record between the local data directory and the remote
//! endpoint: `fetch`, `push`.

use std::path::Path;

use anyhow::{Context, Result};

use mjop::config::MjopConfig;
use mjop::sync::{Attachment, HttpBackend, SyncBackend};

fn require_remote(config: &MjopConfig) -> Result<HttpBackend> {
    config.remote_backend()?.context(
        "No remote endpoint configured; set sync.base_url in mjop.toml, MJOP_SYNC_URL or --sync-url",
    )
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

pub async fn cmd_fetch(config: MjopConfig) -> Result<()> {
    let remote = require_remote(&config)?;
    let record_id = config.record_id();

    let snapshot = remote
        .fetch(&record_id)
        .await
        .with_context(|| format!("Failed to fetch record '{}' from {}", record_id, remote.describe()))?;

    // Round-trip through the store so the local copy is repaired.
    let snapshot = mjop::sync::Snapshot::from(&snapshot.into_state());
    config
        .local_backend()
        .save(&record_id, &snapshot, None)
        .await
        .context("Failed to write fetched record locally")?;

    println!(
        "Fetched {} ({} elements, {} spaces, {} task groups)",
        record_id,
        snapshot.global_elements.len(),
        snapshot.global_spaces.len(),
        snapshot.task_groups.len()
    );
    Ok(())
}

pub async fn cmd_push(config: MjopConfig, attach: Option<&Path>) -> Result<()> {
    let remote = require_remote(&config)?;
    let record_id = config.record_id();

    let snapshot = config
        .local_backend()
        .fetch(&record_id)
        .await
        .with_context(|| format!("Failed to read local record '{}'", record_id))?;

    let attachment = match attach {
        Some(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "attachment".to_string());
            Some(Attachment::new(&file_name, content_type_for(path), bytes))
        }
        None => None,
    };

    remote
        .save(&record_id, &snapshot, attachment)
        .await
        .with_context(|| format!("Failed to push record '{}' to {}", record_id, remote.describe()))?;

    println!("Pushed {} to {}", record_id, remote.describe());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a/offerte.PDF")), "application/pdf");
        assert_eq!(content_type_for(Path::new("foto.jpeg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("noext")), "application/octet-stream");
    }
}
