//! Batch clip generation: one render per shot, fixed-size concurrent
//! batches with inter-batch pacing to respect provider rate limits.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::core::store::{NewVideoClip, ProjectStore, VideoClipRecord};

pub const CLIP_BATCH_SIZE: usize = 3;
pub const INTER_BATCH_PAUSE: Duration = Duration::from_secs(2);

/// One shot out of a shot list, as handed to the renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShotSpec {
    pub shot_number: i64,
    pub prompt: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub duration_sec: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct RenderedClip {
    pub video_url: String,
    pub duration_sec: Option<f64>,
}

/// Opaque "render this shot and give me the artifact URL" collaborator.
#[async_trait]
pub trait ClipRenderer: Send + Sync {
    async fn render(&self, shot: &ShotSpec) -> Result<RenderedClip>;
}

#[derive(Debug, Clone, Serialize)]
pub struct ClipOutcome {
    pub clip_id: String,
    pub clip_number: i64,
    pub success: bool,
    pub video_url: Option<String>,
    pub error: Option<String>,
}

pub struct BatchClipGenerator {
    store: Arc<ProjectStore>,
    renderer: Arc<dyn ClipRenderer>,
}

impl BatchClipGenerator {
    pub fn new(store: Arc<ProjectStore>, renderer: Arc<dyn ClipRenderer>) -> Self {
        Self { store, renderer }
    }

    /// Create one pending clip record per shot, then render in batches of
    /// [`CLIP_BATCH_SIZE`]: all renders within a batch run concurrently, the
    /// whole batch is awaited before the next one starts, and batches are
    /// separated by [`INTER_BATCH_PAUSE`]. One failed clip never stops its
    /// batch or the batches after it.
    pub async fn generate(
        self: &Arc<Self>,
        shot_list_id: &str,
        project_id: &str,
        provider_label: &str,
        shots: &[ShotSpec],
    ) -> Result<Vec<ClipOutcome>> {
        if shots.is_empty() {
            bail!("shot list {shot_list_id} has no shots to render");
        }

        let inserts: Vec<NewVideoClip<'_>> = shots
            .iter()
            .map(|shot| NewVideoClip {
                shot_list_id,
                project_id,
                clip_number: shot.shot_number,
                provider: provider_label,
                metadata: serde_json::json!({ "shot_number": shot.shot_number }),
            })
            .collect();
        let clips = self.store.create_video_clips(&inserts).await?;

        let work: Vec<(VideoClipRecord, ShotSpec)> = clips
            .into_iter()
            .zip(shots.iter().cloned())
            .collect();

        info!(
            "Rendering {} clip(s) for shot list {} in batches of {}",
            work.len(),
            shot_list_id,
            CLIP_BATCH_SIZE
        );
        Ok(self.process_batches(work).await)
    }

    /// Re-render only the clips currently failed for this shot list,
    /// leaving succeeded clips untouched. Shots are matched to clips by
    /// `shot_number`.
    pub async fn retry_failed(
        self: &Arc<Self>,
        shot_list_id: &str,
        shots: &[ShotSpec],
    ) -> Result<Vec<ClipOutcome>> {
        let clips = self.store.list_clips_by_shot_list(shot_list_id).await?;
        let mut work = Vec::new();
        for clip in clips.into_iter().filter(|c| c.status == "failed") {
            match shots.iter().find(|s| s.shot_number == clip.clip_number) {
                Some(shot) => work.push((clip, shot.clone())),
                None => warn!(
                    "No shot spec for failed clip {} (shot {}), skipping retry",
                    clip.id, clip.clip_number
                ),
            }
        }

        if work.is_empty() {
            return Ok(Vec::new());
        }
        info!(
            "Retrying {} failed clip(s) for shot list {}",
            work.len(),
            shot_list_id
        );
        Ok(self.process_batches(work).await)
    }

    async fn process_batches(
        self: &Arc<Self>,
        work: Vec<(VideoClipRecord, ShotSpec)>,
    ) -> Vec<ClipOutcome> {
        let mut outcomes = Vec::with_capacity(work.len());
        let total_batches = work.len().div_ceil(CLIP_BATCH_SIZE);

        for (batch_index, batch) in work.chunks(CLIP_BATCH_SIZE).enumerate() {
            let mut set = JoinSet::new();
            for (clip, shot) in batch.iter().cloned() {
                let generator = Arc::clone(self);
                set.spawn(async move { generator.render_one(clip, shot).await });
            }

            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(e) => warn!("Clip render task join error: {}", e),
                }
            }

            if batch_index + 1 < total_batches {
                tokio::time::sleep(INTER_BATCH_PAUSE).await;
            }
        }

        outcomes.sort_by_key(|o| o.clip_number);
        outcomes
    }

    async fn render_one(&self, clip: VideoClipRecord, shot: ShotSpec) -> ClipOutcome {
        if let Err(e) = self.store.mark_clip_generating(&clip.id).await {
            return ClipOutcome {
                clip_id: clip.id,
                clip_number: clip.clip_number,
                success: false,
                video_url: None,
                error: Some(e.to_string()),
            };
        }

        match self.renderer.render(&shot).await {
            Ok(rendered) => {
                let persisted = self
                    .store
                    .complete_clip(&clip.id, &rendered.video_url, rendered.duration_sec)
                    .await;
                match persisted {
                    Ok(_) => ClipOutcome {
                        clip_id: clip.id,
                        clip_number: clip.clip_number,
                        success: true,
                        video_url: Some(rendered.video_url),
                        error: None,
                    },
                    Err(e) => ClipOutcome {
                        clip_id: clip.id,
                        clip_number: clip.clip_number,
                        success: false,
                        video_url: Some(rendered.video_url),
                        error: Some(e.to_string()),
                    },
                }
            }
            Err(e) => {
                let message = e.to_string();
                if let Err(store_err) = self.store.fail_clip(&clip.id, &message).await {
                    warn!("Could not persist clip failure {}: {}", clip.id, store_err);
                }
                ClipOutcome {
                    clip_id: clip.id,
                    clip_number: clip.clip_number,
                    success: false,
                    video_url: None,
                    error: Some(message),
                }
            }
        }
    }
}

/// Default renderer: submits through the provider router and polls the
/// accepting provider until the render is terminal, bounded by
/// `max_polls * poll_interval`.
pub struct RouterClipRenderer {
    router: Arc<crate::core::video::providers::ProviderRouter>,
    poll_interval: Duration,
    max_polls: usize,
}

impl RouterClipRenderer {
    pub fn new(
        router: Arc<crate::core::video::providers::ProviderRouter>,
        poll_interval: Duration,
        max_polls: usize,
    ) -> Self {
        Self {
            router,
            poll_interval,
            max_polls,
        }
    }
}

#[async_trait]
impl ClipRenderer for RouterClipRenderer {
    async fn render(&self, shot: &ShotSpec) -> Result<RenderedClip> {
        use crate::core::video::providers::{ProviderPoll, RenderSpec};

        let spec = RenderSpec {
            prompt: shot.prompt.clone(),
            image_url: shot.image_url.clone().unwrap_or_default(),
            duration_sec: shot.duration_sec.unwrap_or(5.0) as u32,
            resolution: "720p".to_string(),
            motion_strength: "low".to_string(),
            aspect_ratio: "16:9".to_string(),
        };

        let (kind, provider_job_id) = self.router.create(&spec).await?;
        let provider = self
            .router
            .get(kind)
            .ok_or_else(|| anyhow::anyhow!("provider {} vanished from router", kind.as_str()))?;

        for _ in 0..self.max_polls {
            tokio::time::sleep(self.poll_interval).await;
            match provider.poll(&provider_job_id).await {
                Ok(ProviderPoll::Succeeded { artifact_url }) => {
                    return Ok(RenderedClip {
                        video_url: artifact_url,
                        duration_sec: shot.duration_sec,
                    });
                }
                Ok(ProviderPoll::Failed { error }) => anyhow::bail!(error),
                Ok(ProviderPoll::Running) => {}
                // Transient: keep polling until the attempt budget runs out.
                Err(e) => warn!("Clip poll error (will retry): {}", e),
            }
        }
        anyhow::bail!(
            "render did not finish within {} polls",
            self.max_polls
        )
    }
}
