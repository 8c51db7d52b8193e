use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ProviderKind, ProviderPoll, RenderSpec, VideoProvider};

const DEFAULT_BASE_URL: &str = "https://api.pika.art";

#[derive(Serialize)]
struct PikaGenerateRequest<'a> {
    prompt: &'a str,
    image_url: &'a str,
    duration: u32,
    resolution: &'a str,
    motion: &'a str,
}

#[derive(Deserialize)]
struct PikaGenerateResponse {
    request_id: String,
}

#[derive(Deserialize)]
struct PikaStatusResponse {
    status: String,
    #[serde(default)]
    video: Option<PikaVideo>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct PikaVideo {
    url: String,
}

/// Queue-style image-to-video API: submit, then poll the request id until
/// the queue reports COMPLETED or FAILED.
pub struct PikaProvider {
    api_key: String,
    base_url: String,
    client: Client,
}

impl PikaProvider {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client: Client::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(
            std::env::var("PIKA_API_KEY").unwrap_or_default(),
            std::env::var("PIKA_API_BASE_URL").ok(),
        )
    }
}

#[async_trait]
impl VideoProvider for PikaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Pika
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn create(&self, spec: &RenderSpec) -> Result<String> {
        if spec.image_url.is_empty() {
            return Err(anyhow!("pika requires a source image for image-to-video"));
        }
        let req = PikaGenerateRequest {
            prompt: &spec.prompt,
            image_url: &spec.image_url,
            duration: spec.duration_sec,
            resolution: &spec.resolution,
            motion: &spec.motion_strength,
        };
        let res = self
            .client
            .post(format!("{}/v1/generate", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&req)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(anyhow!(
                "Pika API error ({}): {}",
                res.status(),
                res.text().await.unwrap_or_default()
            ));
        }
        let parsed: PikaGenerateResponse = res.json().await?;
        Ok(parsed.request_id)
    }

    async fn poll(&self, provider_job_id: &str) -> Result<ProviderPoll> {
        let res = self
            .client
            .get(format!(
                "{}/v1/requests/{}/status",
                self.base_url, provider_job_id
            ))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(anyhow!(
                "Pika status error ({}): {}",
                res.status(),
                res.text().await.unwrap_or_default()
            ));
        }
        let parsed: PikaStatusResponse = res.json().await?;
        match parsed.status.as_str() {
            "COMPLETED" => match parsed.video {
                Some(video) => Ok(ProviderPoll::Succeeded {
                    artifact_url: video.url,
                }),
                None => Ok(ProviderPoll::Failed {
                    error: "completed without a video url".to_string(),
                }),
            },
            "FAILED" => Ok(ProviderPoll::Failed {
                error: parsed
                    .error
                    .unwrap_or_else(|| "video generation failed".to_string()),
            }),
            // IN_QUEUE / IN_PROGRESS / anything transitional
            _ => Ok(ProviderPoll::Running),
        }
    }
}
