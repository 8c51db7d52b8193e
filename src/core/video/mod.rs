//! External job lifecycle manager for long-running video renders.
//!
//! One create path, one poll path. There is no internal polling loop;
//! polling is driven by repeated caller invocation, and every poll either
//! reports the persisted state or advances the job exactly one transition.
//! Jobs left `running` by a crashed caller are not reconciled here; that
//! recovery pass is deliberately out of scope (see DESIGN.md).

pub mod clips;
pub mod providers;
pub mod quota;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::core::config::EngineConfig;
use crate::core::storage::ObjectStorage;
use crate::core::store::{NewVideoJob, ProjectStore, VideoJobRecord};
use crate::core::video::providers::{ProviderKind, ProviderPoll, ProviderRouter, RenderSpec};
use crate::core::workflow::{JobStatus, job_can_transition};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenderOptions {
    pub duration_sec: Option<u32>,
    pub resolution: Option<String>,
    pub motion_strength: Option<String>,
}

/// Create-path input. Exactly one media source must be given: a direct URL
/// or a storage pointer resolvable through the object store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnimateRequest {
    pub source_image_url: Option<String>,
    pub image_path: Option<String>,
    pub client_request_id: Option<String>,
    pub prompt: Option<String>,
    #[serde(default)]
    pub options: RenderOptions,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CreateJobOutcome {
    /// A job row exists; it is `running` when the provider accepted, or
    /// `failed` (with the error recorded) when the provider call threw.
    Created { job: VideoJobRecord },
    /// Dedup hit on `client_request_id`: the existing job, provider untouched.
    Duplicate { job: VideoJobRecord },
    QuotaExceeded { used: i64, limit: i64 },
}

/// Reject a status write the job state machine does not allow.
fn check_transition(job: &VideoJobRecord, to: JobStatus) -> Result<()> {
    let Some(from) = JobStatus::from_status(&job.status) else {
        return Err(anyhow!("job {} has unknown status '{}'", job.id, job.status));
    };
    if !job_can_transition(from, to) {
        return Err(anyhow!(
            "invalid job state transition: {} -> {}",
            from.as_str(),
            to.as_str()
        ));
    }
    Ok(())
}

pub struct VideoJobManager {
    store: Arc<ProjectStore>,
    router: Arc<ProviderRouter>,
    storage: Arc<dyn ObjectStorage>,
    client: reqwest::Client,
    config: EngineConfig,
}

impl VideoJobManager {
    pub fn new(
        store: Arc<ProjectStore>,
        router: Arc<ProviderRouter>,
        storage: Arc<dyn ObjectStorage>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            router,
            storage,
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Resolve the request's media source to a fetchable URL, rejecting
    /// empty or ambiguous input before anything is persisted.
    async fn resolve_source(&self, req: &AnimateRequest) -> Result<String> {
        match (&req.source_image_url, &req.image_path) {
            (Some(_), Some(_)) => Err(anyhow!(
                "provide either source_image_url or image_path, not both"
            )),
            (Some(url), None) => {
                url::Url::parse(url).context("source_image_url is not a valid URL")?;
                Ok(url.clone())
            }
            (None, Some(path)) => self
                .storage
                .url_for(path)
                .await
                .context("could not resolve image_path through storage"),
            (None, None) => Err(anyhow!("must provide source_image_url or image_path")),
        }
    }

    /// Create path: validate → dedup → quota → persist `queued` → call the
    /// provider → `running` (and count quota) or `failed`.
    ///
    /// A provider failure still leaves an auditable `failed` job row, so the
    /// job is never stuck at `queued` without error context.
    pub async fn create_job(
        &self,
        owner_id: &str,
        req: &AnimateRequest,
    ) -> Result<CreateJobOutcome> {
        let source_url = self.resolve_source(req).await?;

        if let Some(client_request_id) = req.client_request_id.as_deref()
            && let Some(existing) = self
                .store
                .get_video_job_by_client_request(owner_id, client_request_id)
                .await?
        {
            info!(
                "Duplicate render request (client_request_id: {}), returning job {}",
                client_request_id, existing.id
            );
            return Ok(CreateJobOutcome::Duplicate { job: existing });
        }

        let quota = quota::check(&self.store, owner_id, self.config.video_daily_limit).await?;
        if !quota.allowed {
            return Ok(CreateJobOutcome::QuotaExceeded {
                used: quota.used,
                limit: quota.limit,
            });
        }

        let options = serde_json::json!({
            "duration_sec": req.options.duration_sec.unwrap_or(self.config.video_default_duration_sec),
            "resolution": req.options.resolution.clone().unwrap_or_else(|| self.config.video_default_resolution.clone()),
            "motion_strength": req.options.motion_strength.clone().unwrap_or_else(|| self.config.video_default_motion.clone()),
        });

        // Persisted before the provider call so a provider failure still has
        // a row to land on. The provider column is finalized on acceptance.
        let placeholder = self
            .router
            .first_kind()
            .map(ProviderKind::as_str)
            .unwrap_or("pika");
        let job = self
            .store
            .create_video_job(&NewVideoJob {
                owner_id,
                client_request_id: req.client_request_id.as_deref(),
                source_image_url: &source_url,
                provider: placeholder,
                options: options.clone(),
            })
            .await?;

        let spec = RenderSpec {
            prompt: req
                .prompt
                .clone()
                .unwrap_or_else(|| "Animate image".to_string()),
            image_url: source_url,
            duration_sec: options["duration_sec"].as_u64().unwrap_or(4) as u32,
            resolution: options["resolution"].as_str().unwrap_or("720p").to_string(),
            motion_strength: options["motion_strength"]
                .as_str()
                .unwrap_or("low")
                .to_string(),
            aspect_ratio: "16:9".to_string(),
        };

        match self.router.create(&spec).await {
            Ok((kind, provider_job_id)) => {
                check_transition(&job, JobStatus::Running)?;
                self.store
                    .mark_job_running(&job.id, kind.as_str(), &provider_job_id)
                    .await?;
                quota::increment(&self.store, owner_id).await?;
                info!(
                    "Video job {} accepted by {} (provider job {})",
                    job.id,
                    kind.as_str(),
                    provider_job_id
                );
                let job = self.refetch(&job.id, owner_id).await?;
                Ok(CreateJobOutcome::Created { job })
            }
            Err(e) => {
                let message = e.to_string();
                error!("Video job {} failed to start: {}", job.id, message);
                check_transition(&job, JobStatus::Failed)?;
                self.store.mark_job_failed(&job.id, &message).await?;
                let job = self.refetch(&job.id, owner_id).await?;
                Ok(CreateJobOutcome::Created { job })
            }
        }
    }

    /// Poll path. Safe to call any number of times for any job state:
    ///
    /// - terminal job: returns the stored row with no provider traffic; a
    ///   `succeeded` job's artifact is never re-downloaded or re-uploaded;
    /// - `running` + provider still processing: no state change;
    /// - `running` + provider success: download once, upload to a
    ///   deterministic job-scoped path, set `output_location`, `succeeded`;
    /// - `running` + provider failure: `failed` with the provider's error;
    /// - transport error talking to the provider: stored state unchanged, so
    ///   a later poll can retry without a wrong `failed` transition.
    pub async fn poll_job(&self, owner_id: &str, job_id: &str) -> Result<Option<VideoJobRecord>> {
        let Some(job) = self.store.get_video_job(job_id, owner_id).await? else {
            return Ok(None);
        };

        let Some(status) = JobStatus::from_status(&job.status) else {
            return Ok(Some(job));
        };
        if status.is_terminal() || status == JobStatus::Queued {
            return Ok(Some(job));
        }
        let Some(provider_job_id) = job.provider_job_id.clone() else {
            return Ok(Some(job));
        };

        let Some(kind) = ProviderKind::from_name(&job.provider) else {
            warn!("Job {} has unknown provider '{}'", job.id, job.provider);
            return Ok(Some(job));
        };
        let Some(provider) = self.router.get(kind) else {
            return Ok(Some(job));
        };

        let poll = match provider.poll(&provider_job_id).await {
            Ok(poll) => poll,
            Err(e) => {
                // Could not reach the provider, which is not "the provider
                // said failed". Leave the stored state alone.
                warn!("Transient poll error for job {}: {}", job.id, e);
                return Ok(Some(job));
            }
        };

        match poll {
            ProviderPoll::Running => Ok(Some(job)),
            ProviderPoll::Succeeded { artifact_url } => {
                if job.output_location.is_some() {
                    return Ok(Some(job));
                }
                match self.store_artifact(&job, &artifact_url).await {
                    Ok(location) => {
                        check_transition(&job, JobStatus::Succeeded)?;
                        self.store.mark_job_succeeded(&job.id, &location).await?;
                        info!("Video job {} succeeded, stored at {}", job.id, location);
                    }
                    Err(e) => {
                        // The provider-side artifact may not be retrievable a
                        // second time, so this is terminal rather than
                        // silently retried.
                        let message = format!("failed to store artifact: {e}");
                        error!("Video job {}: {}", job.id, message);
                        check_transition(&job, JobStatus::Failed)?;
                        self.store.mark_job_failed(&job.id, &message).await?;
                    }
                }
                Ok(Some(self.refetch(&job.id, owner_id).await?))
            }
            ProviderPoll::Failed { error } => {
                check_transition(&job, JobStatus::Failed)?;
                self.store.mark_job_failed(&job.id, &error).await?;
                Ok(Some(self.refetch(&job.id, owner_id).await?))
            }
        }
    }

    /// Playback URL for a succeeded job, if its artifact is stored.
    pub async fn playback_url(&self, job: &VideoJobRecord) -> Option<String> {
        let location = job.output_location.as_deref()?;
        match self.storage.url_for(location).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Could not derive playback URL for job {}: {}", job.id, e);
                None
            }
        }
    }

    async fn store_artifact(&self, job: &VideoJobRecord, artifact_url: &str) -> Result<String> {
        let res = self.client.get(artifact_url).send().await?;
        if !res.status().is_success() {
            return Err(anyhow!("artifact download error ({})", res.status()));
        }
        let bytes = res.bytes().await?;
        let path = format!("{}/generated-videos/{}.mp4", job.owner_id, job.id);
        self.storage.upload(bytes, &path, "video/mp4").await
    }

    async fn refetch(&self, job_id: &str, owner_id: &str) -> Result<VideoJobRecord> {
        self.store
            .get_video_job(job_id, owner_id)
            .await?
            .ok_or_else(|| anyhow!("job {job_id} disappeared"))
    }
}
