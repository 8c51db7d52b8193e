use std::path::PathBuf;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;

use super::ObjectStorage;

/// Filesystem-backed storage for single-node deployments and development.
pub struct LocalDirStorage {
    root: PathBuf,
}

impl LocalDirStorage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        // Object paths are relative and forward-slash separated; refuse
        // anything that would escape the root.
        if path.is_empty() || path.starts_with('/') || path.split('/').any(|seg| seg == "..") {
            return Err(anyhow!("invalid object path '{path}'"));
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl ObjectStorage for LocalDirStorage {
    async fn upload(&self, bytes: Bytes, path: &str, _content_type: &str) -> Result<String> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&full, &bytes).await?;
        Ok(path.to_string())
    }

    async fn url_for(&self, path: &str) -> Result<String> {
        let full = self.resolve(path)?;
        Ok(format!("file://{}", full.display()))
    }
}
