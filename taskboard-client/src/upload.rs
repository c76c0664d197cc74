/// Media upload collaborator
///
/// Images (task attachments, profile pictures) are stored on an external
/// media host. The client only needs one capability from it: turn a file
/// into a public URL.
///
/// Uploads never fail loudly. A failed upload is logged and yields `None`;
/// callers skip the attachment and carry on.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;

use crate::config::MediaConfig;

/// Maximum number of images attached when creating a task
pub const MAX_TASK_IMAGES: usize = 3;

/// File selected for upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        UploadFile {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Upload errors
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Media host is not configured")]
    NotConfigured,

    #[error("Upload request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Media host rejected the upload with status {0}")]
    Rejected(u16),

    #[error("Media host response has no secure_url")]
    MissingUrl,
}

/// Turns a file into a public URL
#[async_trait]
pub trait MediaUploader: Send + Sync {
    /// Uploads one file, returning its URL or `None` on failure
    async fn upload_file(&self, file: UploadFile) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

/// Uploader posting multipart form data to the media host
#[derive(Debug, Clone)]
pub struct HttpMediaUploader {
    http: reqwest::Client,
    upload_url: String,
    upload_preset: String,
}

impl HttpMediaUploader {
    /// Builds an uploader from configuration
    ///
    /// # Errors
    ///
    /// Returns `UploadError::NotConfigured` when the media host or account
    /// name is missing.
    pub fn new(config: &MediaConfig, timeout: Duration) -> Result<Self, UploadError> {
        let upload_url = config.upload_url().ok_or(UploadError::NotConfigured)?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(HttpMediaUploader {
            http,
            upload_url,
            upload_preset: config.upload_preset.clone(),
        })
    }

    async fn try_upload(&self, file: UploadFile) -> Result<String, UploadError> {
        let part = Part::bytes(file.bytes.to_vec()).file_name(file.name);
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone());

        let response = self
            .http
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Rejected(status.as_u16()));
        }

        let body: UploadResponse = response.json().await?;
        body.secure_url.ok_or(UploadError::MissingUrl)
    }
}

#[async_trait]
impl MediaUploader for HttpMediaUploader {
    async fn upload_file(&self, file: UploadFile) -> Option<String> {
        let name = file.name.clone();
        match self.try_upload(file).await {
            Ok(url) => {
                tracing::debug!(file = %name, url = %url, "Uploaded file");
                Some(url)
            }
            Err(e) => {
                tracing::warn!(file = %name, error = %e, "Upload failed");
                None
            }
        }
    }
}
