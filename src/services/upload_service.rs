use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart, Client};
use serde::Deserialize;
use tokio::fs;
use uuid::Uuid;

use crate::error::{Error, Result};

const ALLOWED_EXTENSIONS: [&str; 5] = ["pdf", "doc", "docx", "txt", "rtf"];

/// A résumé as received from the client, before it is stored anywhere.
#[derive(Debug, Clone)]
pub struct ResumeFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl ResumeFile {
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }
}

/// Rejects empty files, unknown extensions, and PDFs whose content is not a PDF.
pub fn validate_resume(file: &ResumeFile) -> Result<String> {
    if file.bytes.is_empty() {
        return Err(Error::InvalidInput("Resume file is empty".into()));
    }
    let ext = file
        .extension()
        .ok_or_else(|| Error::InvalidInput("Resume file has no extension".into()))?;
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(Error::InvalidInput(format!(
            "File type .{} is not allowed",
            ext
        )));
    }
    if ext == "pdf" && !file.bytes.starts_with(b"%PDF") {
        return Err(Error::InvalidInput("Invalid PDF file content".into()));
    }
    Ok(ext)
}

/// Stores a résumé and returns the URL it can be fetched from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, file: &ResumeFile) -> Result<String>;

    /// Deletes a file returned by [`upload`](Self::upload) that ended up
    /// unreferenced.
    async fn discard(&self, url: &str) -> Result<()>;
}

/// Writes files under a local directory that the server exposes at `/uploads`.
pub struct LocalUploader {
    root: PathBuf,
    folder: String,
}

impl LocalUploader {
    pub fn new(root: impl Into<PathBuf>, folder: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            folder: folder.into(),
        }
    }
}

#[async_trait]
impl Uploader for LocalUploader {
    async fn upload(&self, file: &ResumeFile) -> Result<String> {
        let ext = validate_resume(file)?;
        let dir = self.root.join(&self.folder);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::Upload(e.to_string()))?;

        let stored_name = format!("{}.{}", Uuid::new_v4(), ext);
        fs::write(dir.join(&stored_name), &file.bytes)
            .await
            .map_err(|e| {
                tracing::error!("Failed to write resume file: {}", e);
                Error::Upload(format!("Failed to save file: {}", e))
            })?;

        Ok(format!("/uploads/{}/{}", self.folder, stored_name))
    }

    async fn discard(&self, url: &str) -> Result<()> {
        let prefix = format!("/uploads/{}/", self.folder);
        let name = url
            .strip_prefix(&prefix)
            .filter(|n| !n.is_empty() && !n.contains(['/', '\\']) && !n.starts_with('.'))
            .ok_or_else(|| Error::InvalidInput(format!("Not a stored resume: {}", url)))?;

        match fs::remove_file(self.root.join(&self.folder).join(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Upload(format!("Failed to remove file: {}", e))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MediaHostResponse {
    secure_url: String,
}

/// Unsigned multipart upload to a remote media host.
pub struct HttpUploader {
    client: Client,
    url: String,
    preset: Option<String>,
    folder: String,
}

impl HttpUploader {
    pub fn new(client: Client, url: String, preset: Option<String>, folder: String) -> Self {
        Self {
            client,
            url,
            preset,
            folder,
        }
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(&self, file: &ResumeFile) -> Result<String> {
        validate_resume(file)?;

        let mut part =
            multipart::Part::bytes(file.bytes.to_vec()).file_name(file.file_name.clone());
        if let Some(ct) = &file.content_type {
            part = part
                .mime_str(ct)
                .map_err(|e| Error::InvalidInput(format!("Bad content type: {}", e)))?;
        }

        let mut form = multipart::Form::new()
            .part("file", part)
            .text("folder", self.folder.clone())
            .text("resource_type", "raw");
        if let Some(preset) = &self.preset {
            form = form.text("upload_preset", preset.clone());
        }

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Upload(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body, "media host rejected upload");
            return Err(Error::Upload(format!("media host returned {}", status)));
        }

        let parsed: MediaHostResponse = response
            .json()
            .await
            .map_err(|e| Error::Upload(format!("unexpected media host response: {}", e)))?;
        Ok(parsed.secure_url)
    }

    // Unsigned presets cannot delete; the asset is left for the host's
    // own cleanup.
    async fn discard(&self, url: &str) -> Result<()> {
        tracing::warn!(url, "orphaned resume left on media host");
        Ok(())
    }
}
