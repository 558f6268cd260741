use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use reqwest::multipart::{Form, Part};

use super::{Attachment, Snapshot, SyncBackend};
use crate::errors::SyncError;

/// Remote persistence over HTTP.
///
/// `GET {base}/records/{id}` returns the snapshot JSON. `POST
/// {base}/records/{id}` takes a multipart form with a `data` field holding
/// the snapshot and an optional `file` part. Only the status of a save
/// response is looked at. The record id is sent as one percent-encoded path
/// segment.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mjop/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let invalid = || SyncError::InvalidUrl {
            url: base_url.to_string(),
        };
        let base_url = Url::parse(base_url).map_err(|_| invalid())?;
        if base_url.cannot_be_a_base() {
            return Err(invalid());
        }
        Ok(Self { client, base_url })
    }

    fn record_url(&self, record_id: &str) -> Result<Url, SyncError> {
        if matches!(record_id.trim(), "" | "." | "..") {
            return Err(SyncError::InvalidRecordId {
                record_id: record_id.to_string(),
            });
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::InvalidUrl {
                url: self.base_url.to_string(),
            })?
            .pop_if_empty()
            .extend(["records", record_id]);
        Ok(url)
    }
}

#[async_trait]
impl SyncBackend for HttpBackend {
    async fn fetch(&self, record_id: &str) -> Result<Snapshot, SyncError> {
        let resp = self.client.get(self.record_url(record_id)?).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SyncError::RecordNotFound {
                record_id: record_id.to_string(),
            });
        }
        if !status.is_success() {
            return Err(SyncError::Status {
                status: status.as_u16(),
                record_id: record_id.to_string(),
            });
        }
        let body = resp.text().await?;
        Snapshot::from_json(&body)
    }

    async fn save(
        &self,
        record_id: &str,
        snapshot: &Snapshot,
        attachment: Option<Attachment>,
    ) -> Result<(), SyncError> {
        let data = serde_json::to_string(snapshot)?;
        let mut form = Form::new().text("data", data);
        if let Some(attachment) = attachment {
            let part = Part::bytes(attachment.bytes)
                .file_name(attachment.file_name)
                .mime_str(&attachment.content_type)?;
            form = form.part("file", part);
        }

        let resp = self
            .client
            .post(self.record_url(record_id)?)
            .multipart(form)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::Status {
                status: status.as_u16(),
                record_id: record_id.to_string(),
            });
        }
        tracing::debug!(record_id, status = status.as_u16(), "Snapshot saved over HTTP");
        Ok(())
    }

    fn describe(&self) -> String {
        self.base_url.to_string()
    }
}
