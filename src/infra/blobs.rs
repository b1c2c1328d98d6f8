//! Filesystem-backed image storage.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;

use crate::application::collaborators::{BlobStore, CollaboratorError, StoredBlob};

#[derive(Debug, Error)]
pub enum BlobStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error("uploaded image is empty")]
    EmptyPayload,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<BlobStorageError> for CollaboratorError {
    fn from(err: BlobStorageError) -> Self {
        CollaboratorError::Blob(err.to_string())
    }
}

/// Images live under `root`, addressed by relative paths such as
/// `20240101/120000/<upload>/front.jpg`, and are served under `public_base_url`.
#[derive(Debug)]
pub struct FilesystemBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl FilesystemBlobStore {
    /// Open the store, creating the directory if necessary.
    pub fn new(root: PathBuf, public_base_url: impl Into<String>) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            public_base_url: public_base_url.into(),
        })
    }

    pub fn public_url(&self, stored_path: &str) -> String {
        format!(
            "{}/{}",
            self.public_base_url.trim_end_matches('/'),
            stored_path.trim_start_matches('/')
        )
    }

    pub async fn read(&self, stored_path: &str) -> Result<Bytes, BlobStorageError> {
        let absolute = self.resolve(stored_path)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    async fn store(&self, stored_path: &str, bytes: Bytes) -> Result<StoredBlob, BlobStorageError> {
        if bytes.is_empty() {
            return Err(BlobStorageError::EmptyPayload);
        }
        let absolute = self.resolve(stored_path)?;
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        if let Err(err) = file.write_all(&bytes).await {
            drop(file);
            let _ = fs::remove_file(&absolute).await;
            return Err(err.into());
        }
        file.flush().await?;

        let checksum = hex::encode(Sha256::digest(&bytes));
        Ok(StoredBlob {
            path: stored_path.to_string(),
            url: self.public_url(stored_path),
            checksum,
            size_bytes: bytes.len() as u64,
        })
    }

    /// Missing files count as deleted.
    async fn remove(&self, stored_path: &str) -> Result<(), BlobStorageError> {
        let absolute = self.resolve(stored_path)?;
        match fs::remove_file(&absolute).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn walk(&self) -> Result<Vec<String>, BlobStorageError> {
        let mut paths = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(directory) = pending.pop() {
            let mut entries = match fs::read_dir(&directory).await {
                Ok(entries) => entries,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&self.root) {
                    paths.push(relative_to_stored(relative));
                }
            }
        }

        paths.sort();
        Ok(paths)
    }

    fn resolve(&self, stored_path: &str) -> Result<PathBuf, BlobStorageError> {
        let relative = Path::new(stored_path);
        if stored_path.is_empty()
            || relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(BlobStorageError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}

fn relative_to_stored(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn write(
        &self,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<StoredBlob, CollaboratorError> {
        let stored = self.store(path, bytes).await?;
        debug!(
            target: "plaqueboard::blobs",
            path = %stored.path,
            content_type,
            size_bytes = stored.size_bytes,
            "Stored image"
        );
        Ok(stored)
    }

    async fn delete(&self, path: &str) -> Result<(), CollaboratorError> {
        Ok(self.remove(path).await?)
    }

    async fn list_paths(&self) -> Result<Vec<String>, CollaboratorError> {
        Ok(self.walk().await?)
    }
}
