//! Generative-video provider clients.
//!
//! Dispatch is closed over [`ProviderKind`]: a job stores which provider
//! accepted it and every later poll goes back to that adapter. The create
//! path goes through [`ProviderRouter`], which tries configured adapters in
//! priority order.

mod pika;
mod runway;

use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use pika::PikaProvider;
pub use runway::RunwayProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Pika,
    Runway,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Pika => "pika",
            ProviderKind::Runway => "runway",
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        match value {
            "pika" => Some(ProviderKind::Pika),
            "runway" => Some(ProviderKind::Runway),
            _ => None,
        }
    }
}

/// What a render request looks like to every adapter.
#[derive(Debug, Clone)]
pub struct RenderSpec {
    pub prompt: String,
    pub image_url: String,
    pub duration_sec: u32,
    pub resolution: String,
    pub motion_strength: String,
    pub aspect_ratio: String,
}

/// Provider-reported job state, already mapped out of each vendor's
/// vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderPoll {
    Running,
    Succeeded { artifact_url: String },
    Failed { error: String },
}

#[async_trait]
pub trait VideoProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Whether this adapter has the credentials it needs. Unconfigured
    /// adapters are skipped by the router instead of erroring.
    fn is_configured(&self) -> bool;

    /// Submit a render. Returns the provider-side job id.
    async fn create(&self, spec: &RenderSpec) -> Result<String>;

    /// One status check for a previously created job.
    async fn poll(&self, provider_job_id: &str) -> Result<ProviderPoll>;
}

pub struct ProviderRouter {
    providers: Vec<Arc<dyn VideoProvider>>,
    priority: Vec<ProviderKind>,
}

impl ProviderRouter {
    /// `priority` is the comma-separated provider list from config, e.g.
    /// `"pika,runway"`. Unknown names are logged and ignored.
    pub fn new(providers: Vec<Arc<dyn VideoProvider>>, priority: &[String]) -> Self {
        let mut order = Vec::new();
        for name in priority {
            match ProviderKind::from_name(name.trim()) {
                Some(kind) if !order.contains(&kind) => order.push(kind),
                Some(_) => {}
                None => warn!("Ignoring unknown video provider '{}' in priority list", name),
            }
        }
        Self {
            providers,
            priority: order,
        }
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn VideoProvider>> {
        self.providers.iter().find(|p| p.kind() == kind).cloned()
    }

    pub fn first_kind(&self) -> Option<ProviderKind> {
        self.priority.first().copied()
    }

    /// Try each configured provider in priority order until one accepts the
    /// job. Returns which provider accepted and its job id; errors only when
    /// every candidate failed or none was configured.
    pub async fn create(&self, spec: &RenderSpec) -> Result<(ProviderKind, String)> {
        let mut errors: Vec<String> = Vec::new();
        for kind in &self.priority {
            let Some(provider) = self.get(*kind) else {
                continue;
            };
            if !provider.is_configured() {
                continue;
            }
            match provider.create(spec).await {
                Ok(provider_job_id) => return Ok((*kind, provider_job_id)),
                Err(e) => {
                    warn!("Provider {} rejected render: {}", kind.as_str(), e);
                    errors.push(format!("{}: {}", kind.as_str(), e));
                }
            }
        }
        Err(anyhow!(
            "all video providers failed or none configured (tried: {})",
            if errors.is_empty() {
                "none".to_string()
            } else {
                errors.join("; ")
            }
        ))
    }
}
