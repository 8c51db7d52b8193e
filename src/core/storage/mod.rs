//! Durable object storage collaborator.
//!
//! Uploads must be idempotent/overwriting: a clip regeneration targets the
//! same job-scoped path, so a second upload to an existing path replaces the
//! object rather than erroring.

mod bucket;
mod local;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

pub use bucket::HttpBucketStorage;
pub use local::LocalDirStorage;

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` at `path`, overwriting any existing object. Returns the
    /// stored pointer (the path as persisted on the owning record).
    async fn upload(&self, bytes: Bytes, path: &str, content_type: &str) -> Result<String>;

    /// A URL the rest of the product can hand to players/UI for `path`.
    async fn url_for(&self, path: &str) -> Result<String>;
}
