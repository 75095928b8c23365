//! On-disk attachment storage.
//!
//! Uploads follow a staging-commit protocol: bytes land in a staging
//! directory first, the ledger row is written, and only then is the file
//! promoted into the served directory. A failed database write discards the
//! staged file, so a visible attachment always has a ledger row behind it.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::ServiceError;

const STAGING_DIR: &str = ".staging";

/// Extensions accepted for invoice attachments and OCR uploads.
pub const ALLOWED_EXTENSIONS: [&str; 8] =
    ["pdf", "jpg", "jpeg", "png", "gif", "webp", "tiff", "bmp"];

/// A staged upload awaiting promotion or discard.
#[derive(Debug)]
pub struct StagedAttachment {
    /// Generated filename the attachment will be served under.
    pub filename: String,
    staged_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct AttachmentStore {
    root: PathBuf,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the storage directories.
    pub async fn init(&self) -> Result<(), ServiceError> {
        tokio::fs::create_dir_all(self.root.join(STAGING_DIR)).await?;
        Ok(())
    }

    /// Lowercased extension of an uploaded filename, if it is acceptable.
    pub fn allowed_extension(original_name: &str) -> Option<String> {
        let ext = Path::new(original_name)
            .extension()?
            .to_str()?
            .to_lowercase();
        ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
    }

    /// Writes upload bytes into the staging area under a generated name.
    pub async fn stage(
        &self,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StagedAttachment, ServiceError> {
        let ext = Self::allowed_extension(original_name).ok_or_else(|| {
            ServiceError::Validation(format!(
                "File type not supported. Allowed: {}",
                ALLOWED_EXTENSIONS.join(", ")
            ))
        })?;

        let filename = format!("{}.{}", Uuid::new_v4().simple(), ext);
        let staged_path = self.root.join(STAGING_DIR).join(&filename);
        tokio::fs::write(&staged_path, bytes).await?;

        debug!("Staged attachment {} ({} bytes)", filename, bytes.len());
        Ok(StagedAttachment {
            filename,
            staged_path,
        })
    }

    /// Makes a staged attachment visible under its final name.
    pub async fn promote(&self, staged: &StagedAttachment) -> Result<(), ServiceError> {
        let final_path = self.root.join(&staged.filename);
        tokio::fs::rename(&staged.staged_path, &final_path).await?;
        debug!("Promoted attachment {}", staged.filename);
        Ok(())
    }

    /// Removes a staged attachment whose ledger write failed.
    pub async fn discard(&self, staged: StagedAttachment) {
        if let Err(err) = tokio::fs::remove_file(&staged.staged_path).await {
            warn!(
                "Failed to discard staged attachment {}: {}",
                staged.filename, err
            );
        }
    }

    /// Resolves a served filename to its path. Names containing path
    /// separators never resolve; stored names are always generated flat.
    pub fn path_of(&self, filename: &str) -> Option<PathBuf> {
        if filename.is_empty()
            || filename.contains('/')
            || filename.contains('\\')
            || filename.contains("..")
        {
            return None;
        }
        Some(self.root.join(filename))
    }

    /// Reads a promoted attachment.
    pub async fn read(&self, filename: &str) -> Result<Vec<u8>, ServiceError> {
        let path = self
            .path_of(filename)
            .ok_or_else(|| ServiceError::NotFound("File not found".to_string()))?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(ServiceError::NotFound("File not found".to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Content type for a stored attachment, keyed by extension.
    pub fn content_type(filename: &str) -> &'static str {
        match Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("pdf") => "application/pdf",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("png") => "image/png",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            Some("tiff") => "image/tiff",
            Some("bmp") => "image/bmp",
            _ => "application/octet-stream",
        }
    }
}
