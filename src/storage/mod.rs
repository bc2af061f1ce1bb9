//! Content-addressed file storage on local disk.
//!
//! Files are named by the hex SHA-256 of their bytes, so uploading the same
//! content twice yields the same key. Public URLs are resolved against the
//! configured base URL; the server exposes the root directory at `/files`.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::config::StorageConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Invalid public base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    #[error("File storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
    public_base_url: Url,
}

impl FileStorage {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let mut base = config.public_base_url.clone();
        // Url::join drops the last segment unless the base ends with a slash
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Self {
            root: config.root_dir.clone(),
            public_base_url: Url::parse(&base)?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn key_for(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    /// Write bytes and return their key. Existing content is left untouched.
    pub async fn put(&self, bytes: &[u8]) -> Result<String, StorageError> {
        let key = Self::key_for(bytes);
        let path = self.root.join(&key);

        if tokio::fs::try_exists(&path).await? {
            return Ok(key);
        }

        tokio::fs::create_dir_all(&self.root).await?;
        let partial = self.root.join(format!("{}.partial", key));
        tokio::fs::write(&partial, bytes).await?;
        tokio::fs::rename(&partial, &path).await?;

        tracing::debug!("Stored {} bytes as {}", bytes.len(), key);
        Ok(key)
    }

    pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
        Self::validate_key(key)?;
        match tokio::fs::remove_file(self.root.join(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn resolve_url(&self, key: &str) -> Result<Url, StorageError> {
        Self::validate_key(key)?;
        Ok(self.public_base_url.join(key)?)
    }

    fn validate_key(key: &str) -> Result<(), StorageError> {
        if key.len() == 64 && key.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(())
        } else {
            Err(StorageError::InvalidKey(key.to_string()))
        }
    }
}
