//! On-disk storage for uploaded art proofs and documents.
//!
//! Files live under `<root>/<yyyy>/<mm>/<uuid>-<sanitized name>`; the
//! database keeps the path relative to the root.

use crate::errors::ServiceError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{Datelike, Utc};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

pub const ART_CONTENT_TYPES: &[&str] = &["image/png", "image/jpeg", "application/pdf", "image/svg+xml"];

pub const DOCUMENT_CONTENT_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "application/pdf",
    "image/svg+xml",
    "text/csv",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

const MAX_FILE_NAME_LEN: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Path relative to the storage root, always `/`-separated
    pub relative_path: String,
    pub size_bytes: i64,
}

#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
    max_bytes: usize,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Decode a base64 upload, enforcing the size limit.
    pub fn decode_upload(&self, content_base64: &str) -> Result<Vec<u8>, ServiceError> {
        let trimmed = content_base64.trim();
        // base64 expands by 4/3; reject obviously oversized bodies before decoding
        if trimmed.len() / 4 * 3 > self.max_bytes + 3 {
            return Err(ServiceError::PayloadTooLarge(format!(
                "File exceeds the {} byte limit",
                self.max_bytes
            )));
        }

        let bytes = STANDARD
            .decode(trimmed)
            .map_err(|e| ServiceError::InvalidInput(format!("Invalid base64 content: {}", e)))?;

        if bytes.is_empty() {
            return Err(ServiceError::InvalidInput("File is empty".to_string()));
        }
        if bytes.len() > self.max_bytes {
            return Err(ServiceError::PayloadTooLarge(format!(
                "File exceeds the {} byte limit",
                self.max_bytes
            )));
        }
        Ok(bytes)
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<StoredFile, ServiceError> {
        let now = Utc::now();
        let relative_path = format!(
            "{:04}/{:02}/{}-{}",
            now.year(),
            now.month(),
            Uuid::new_v4(),
            sanitize_file_name(file_name)
        );
        let full_path = self.root.join(&relative_path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                error!("Failed to create upload directory {:?}: {}", parent, e);
                ServiceError::from(e)
            })?;
        }

        tokio::fs::write(&full_path, bytes).await.map_err(|e| {
            error!("Failed to write upload {:?}: {}", full_path, e);
            ServiceError::from(e)
        })?;

        debug!(path = %relative_path, "Stored upload");
        Ok(StoredFile {
            relative_path,
            size_bytes: bytes.len() as i64,
        })
    }

    pub async fn read(&self, relative_path: &str) -> Result<Vec<u8>, ServiceError> {
        let full_path = self.resolve(relative_path)?;
        match tokio::fs::read(&full_path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ServiceError::NotFound(
                "Stored file is missing".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Missing files are not an error.
    pub async fn delete(&self, relative_path: &str) -> Result<(), ServiceError> {
        let full_path = self.resolve(relative_path)?;
        match tokio::fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = relative_path, "Stored file already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn resolve(&self, relative_path: &str) -> Result<PathBuf, ServiceError> {
        let path = Path::new(relative_path);
        if path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(ServiceError::StorageError(format!(
                "Refusing to access path outside storage root: {}",
                relative_path
            )));
        }
        Ok(self.root.join(path))
    }
}

/// Keep `[A-Za-z0-9._-]`, replace everything else with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        return "file".to_string();
    }
    cleaned.chars().take(MAX_FILE_NAME_LEN).collect()
}

pub fn ensure_content_type(content_type: &str, allowed: &[&str]) -> Result<(), ServiceError> {
    if allowed.contains(&content_type) {
        Ok(())
    } else {
        Err(ServiceError::InvalidInput(format!(
            "Unsupported content type '{}'",
            content_type
        )))
    }
}
