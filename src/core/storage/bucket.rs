use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;

use super::ObjectStorage;

/// Client for an HTTP object-storage service (Supabase-style bucket API).
/// Uploads run in upsert mode so job retries targeting the same path
/// overwrite instead of failing.
pub struct HttpBucketStorage {
    base_url: String,
    bucket: String,
    service_token: String,
    client: Client,
}

impl HttpBucketStorage {
    pub fn new(base_url: String, bucket: String, service_token: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket,
            service_token,
            client: Client::new(),
        }
    }

    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("BACKLOT_STORAGE_URL").ok()?;
        let token = std::env::var("BACKLOT_STORAGE_TOKEN").unwrap_or_default();
        let bucket = std::env::var("BACKLOT_STORAGE_BUCKET")
            .unwrap_or_else(|_| "generated-videos".to_string());
        Some(Self::new(base_url, bucket, token))
    }
}

#[async_trait]
impl ObjectStorage for HttpBucketStorage {
    async fn upload(&self, bytes: Bytes, path: &str, content_type: &str) -> Result<String> {
        let res = self
            .client
            .post(format!(
                "{}/storage/v1/object/{}/{}",
                self.base_url, self.bucket, path
            ))
            .header("Authorization", format!("Bearer {}", self.service_token))
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(anyhow!(
                "storage upload error ({}): {}",
                res.status(),
                res.text().await.unwrap_or_default()
            ));
        }
        Ok(path.to_string())
    }

    async fn url_for(&self, path: &str) -> Result<String> {
        Ok(format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        ))
    }
}
