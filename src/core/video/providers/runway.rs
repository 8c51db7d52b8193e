use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ProviderKind, ProviderPoll, RenderSpec, VideoProvider};

const DEFAULT_BASE_URL: &str = "https://api.dev.runwayml.com";
const API_VERSION: &str = "2024-11-06";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunwayCreateRequest<'a> {
    prompt_image: &'a str,
    prompt_text: &'a str,
    model: &'a str,
    duration: u32,
    ratio: &'a str,
}

#[derive(Deserialize)]
struct RunwayCreateResponse {
    id: String,
}

#[derive(Deserialize)]
struct RunwayTaskResponse {
    status: String,
    #[serde(default)]
    output: Vec<String>,
    #[serde(default)]
    failure: Option<String>,
}

pub struct RunwayProvider {
    api_key: String,
    base_url: String,
    client: Client,
}

impl RunwayProvider {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client: Client::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(
            std::env::var("RUNWAY_API_KEY").unwrap_or_default(),
            std::env::var("RUNWAY_API_BASE_URL").ok(),
        )
    }
}

#[async_trait]
impl VideoProvider for RunwayProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Runway
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn create(&self, spec: &RenderSpec) -> Result<String> {
        let req = RunwayCreateRequest {
            prompt_image: &spec.image_url,
            prompt_text: &spec.prompt,
            model: "gen3a_turbo",
            duration: spec.duration_sec,
            ratio: &spec.aspect_ratio,
        };
        let res = self
            .client
            .post(format!("{}/v1/image_to_video", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("X-Runway-Version", API_VERSION)
            .json(&req)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(anyhow!(
                "Runway API error ({}): {}",
                res.status(),
                res.text().await.unwrap_or_default()
            ));
        }
        let parsed: RunwayCreateResponse = res.json().await?;
        Ok(parsed.id)
    }

    async fn poll(&self, provider_job_id: &str) -> Result<ProviderPoll> {
        let res = self
            .client
            .get(format!("{}/v1/tasks/{}", self.base_url, provider_job_id))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("X-Runway-Version", API_VERSION)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(anyhow!(
                "Runway status error ({}): {}",
                res.status(),
                res.text().await.unwrap_or_default()
            ));
        }
        let parsed: RunwayTaskResponse = res.json().await?;
        match parsed.status.as_str() {
            "SUCCEEDED" => match parsed.output.into_iter().next() {
                Some(artifact_url) => Ok(ProviderPoll::Succeeded { artifact_url }),
                None => Ok(ProviderPoll::Failed {
                    error: "succeeded without output".to_string(),
                }),
            },
            "FAILED" | "CANCELLED" => Ok(ProviderPoll::Failed {
                error: parsed
                    .failure
                    .unwrap_or_else(|| "video generation failed".to_string()),
            }),
            // PENDING / THROTTLED / RUNNING
            _ => Ok(ProviderPoll::Running),
        }
    }
}
