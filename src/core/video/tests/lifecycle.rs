//! Video job lifecycle: create-path validation, dedup, quota, and the
//! idempotent poll path.

use std::path::PathBuf;
use std::sync::Arc;

use crate::core::config::EngineConfig;
use crate::core::storage::ObjectStorage;
use crate::core::store::ProjectStore;
use crate::core::test_support::{
    MemoryStorage, MockProvider, PollStep, open_temp_store, spawn_artifact_server,
};
use crate::core::video::providers::{ProviderKind, ProviderRouter, VideoProvider};
use crate::core::video::{AnimateRequest, CreateJobOutcome, VideoJobManager};

fn test_config(limit: i64) -> EngineConfig {
    EngineConfig {
        data_dir: PathBuf::from("."),
        api_host: "127.0.0.1".to_string(),
        api_port: 0,
        video_daily_limit: limit,
        video_default_duration_sec: 4,
        video_default_resolution: "720p".to_string(),
        video_default_motion: "low".to_string(),
        video_provider_priority: vec!["pika".to_string(), "runway".to_string()],
        dispatch_cron: None,
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    store: Arc<ProjectStore>,
    pika: Arc<MockProvider>,
    runway: Arc<MockProvider>,
    storage: Arc<MemoryStorage>,
    manager: VideoJobManager,
}

async fn harness_with(
    pika: MockProvider,
    runway: MockProvider,
    storage: MemoryStorage,
    limit: i64,
) -> Harness {
    let (dir, store) = open_temp_store().await;
    let pika = Arc::new(pika);
    let runway = Arc::new(runway);
    let storage = Arc::new(storage);
    let providers: Vec<Arc<dyn VideoProvider>> = vec![pika.clone(), runway.clone()];
    let router = Arc::new(ProviderRouter::new(
        providers,
        &["pika".to_string(), "runway".to_string()],
    ));
    let manager = VideoJobManager::new(
        store.clone(),
        router,
        storage.clone() as Arc<dyn ObjectStorage>,
        test_config(limit),
    );
    Harness {
        _dir: dir,
        store,
        pika,
        runway,
        storage,
        manager,
    }
}

async fn default_harness() -> Harness {
    harness_with(
        MockProvider::accepting(ProviderKind::Pika),
        MockProvider::accepting(ProviderKind::Runway),
        MemoryStorage::new(),
        20,
    )
    .await
}

fn url_request(client_request_id: Option<&str>) -> AnimateRequest {
    AnimateRequest {
        source_image_url: Some("https://cdn.example/stills/frame.png".to_string()),
        client_request_id: client_request_id.map(str::to_string),
        ..AnimateRequest::default()
    }
}

fn created(outcome: CreateJobOutcome) -> crate::core::store::VideoJobRecord {
    match outcome {
        CreateJobOutcome::Created { job } => job,
        other => panic!("expected Created, got {other:?}"),
    }
}

#[tokio::test]
async fn create_persists_running_job_and_counts_quota() {
    let h = default_harness().await;
    let job = created(h.manager.create_job("owner-1", &url_request(None)).await.unwrap());

    assert_eq!(job.status, "running");
    assert_eq!(job.provider, "pika");
    assert_eq!(job.provider_job_id.as_deref(), Some("pika-job-1"));
    assert!(job.output_location.is_none());
    assert_eq!(h.pika.create_count(), 1);
    assert_eq!(h.store.quota_used_today("owner-1").await.unwrap(), 1);
}

#[tokio::test]
async fn create_requires_exactly_one_media_source() {
    let h = default_harness().await;

    let none = AnimateRequest::default();
    assert!(h.manager.create_job("owner-1", &none).await.is_err());

    let both = AnimateRequest {
        source_image_url: Some("https://cdn.example/a.png".to_string()),
        image_path: Some("owner-1/stills/a.png".to_string()),
        ..AnimateRequest::default()
    };
    assert!(h.manager.create_job("owner-1", &both).await.is_err());

    let invalid = AnimateRequest {
        source_image_url: Some("not a url".to_string()),
        ..AnimateRequest::default()
    };
    assert!(h.manager.create_job("owner-1", &invalid).await.is_err());

    // Nothing above reached a provider or the quota counter.
    assert_eq!(h.pika.create_count(), 0);
    assert_eq!(h.store.quota_used_today("owner-1").await.unwrap(), 0);
}

#[tokio::test]
async fn create_resolves_storage_pointer_sources() {
    let h = default_harness().await;
    let req = AnimateRequest {
        image_path: Some("owner-1/stills/frame.png".to_string()),
        ..AnimateRequest::default()
    };
    let job = created(h.manager.create_job("owner-1", &req).await.unwrap());
    assert_eq!(job.source_image_url, "mem://owner-1/stills/frame.png");
}

#[tokio::test]
async fn duplicate_client_request_returns_existing_job_without_provider_call() {
    let h = default_harness().await;
    let req = url_request(Some("req-abc"));

    let first = created(h.manager.create_job("owner-1", &req).await.unwrap());
    let second = h.manager.create_job("owner-1", &req).await.unwrap();

    match second {
        CreateJobOutcome::Duplicate { job } => assert_eq!(job.id, first.id),
        other => panic!("expected Duplicate, got {other:?}"),
    }
    assert_eq!(h.pika.create_count(), 1);
    assert_eq!(h.store.quota_used_today("owner-1").await.unwrap(), 1);
}

#[tokio::test]
async fn dedup_is_scoped_per_owner() {
    let h = default_harness().await;
    let req = url_request(Some("req-abc"));

    created(h.manager.create_job("owner-1", &req).await.unwrap());
    let other_owner = h.manager.create_job("owner-2", &req).await.unwrap();
    assert!(matches!(other_owner, CreateJobOutcome::Created { .. }));
    assert_eq!(h.pika.create_count(), 2);
}

#[tokio::test]
async fn quota_exhaustion_rejects_before_the_provider() {
    let h = harness_with(
        MockProvider::accepting(ProviderKind::Pika),
        MockProvider::accepting(ProviderKind::Runway),
        MemoryStorage::new(),
        1,
    )
    .await;

    created(h.manager.create_job("owner-1", &url_request(None)).await.unwrap());
    let outcome = h.manager.create_job("owner-1", &url_request(None)).await.unwrap();

    match outcome {
        CreateJobOutcome::QuotaExceeded { used, limit } => {
            assert_eq!(used, 1);
            assert_eq!(limit, 1);
        }
        other => panic!("expected QuotaExceeded, got {other:?}"),
    }
    assert_eq!(h.pika.create_count(), 1);
}

#[tokio::test]
async fn provider_rejection_leaves_auditable_failed_job_and_no_quota_use() {
    let h = harness_with(
        MockProvider::rejecting(ProviderKind::Pika),
        MockProvider::rejecting(ProviderKind::Runway),
        MemoryStorage::new(),
        20,
    )
    .await;

    let job = created(h.manager.create_job("owner-1", &url_request(None)).await.unwrap());
    assert_eq!(job.status, "failed");
    assert!(
        job.error_message
            .as_deref()
            .unwrap_or_default()
            .contains("all video providers failed")
    );
    // Provider rejection never consumes quota.
    assert_eq!(h.store.quota_used_today("owner-1").await.unwrap(), 0);
}

#[tokio::test]
async fn unconfigured_provider_falls_through_to_next_in_priority() {
    let h = harness_with(
        MockProvider::unconfigured(ProviderKind::Pika),
        MockProvider::accepting(ProviderKind::Runway),
        MemoryStorage::new(),
        20,
    )
    .await;

    let job = created(h.manager.create_job("owner-1", &url_request(None)).await.unwrap());
    assert_eq!(job.status, "running");
    assert_eq!(job.provider, "runway");
    assert_eq!(h.pika.create_count(), 0);
    assert_eq!(h.runway.create_count(), 1);
}

#[tokio::test]
async fn poll_while_provider_still_processing_changes_nothing() {
    let h = default_harness().await;
    let job = created(h.manager.create_job("owner-1", &url_request(None)).await.unwrap());

    h.pika.script_polls(vec![PollStep::Running]).await;
    let polled = h.manager.poll_job("owner-1", &job.id).await.unwrap().unwrap();
    assert_eq!(polled.status, "running");
    assert!(polled.output_location.is_none());
    assert_eq!(h.storage.upload_count(), 0);
}

#[tokio::test]
async fn successful_poll_stores_artifact_exactly_once() {
    let (artifact_url, _server) = spawn_artifact_server().await;
    let h = default_harness().await;
    let job = created(h.manager.create_job("owner-1", &url_request(None)).await.unwrap());

    h.pika
        .script_polls(vec![PollStep::Succeeded(artifact_url)])
        .await;

    let polled = h.manager.poll_job("owner-1", &job.id).await.unwrap().unwrap();
    assert_eq!(polled.status, "succeeded");
    let expected_location = format!("owner-1/generated-videos/{}.mp4", job.id);
    assert_eq!(polled.output_location.as_deref(), Some(expected_location.as_str()));
    assert_eq!(h.storage.upload_count(), 1);

    // N further polls: cached state, no provider traffic, no re-upload.
    let polls_before = h.pika.poll_calls.load(std::sync::atomic::Ordering::SeqCst);
    for _ in 0..3 {
        let again = h.manager.poll_job("owner-1", &job.id).await.unwrap().unwrap();
        assert_eq!(again.status, "succeeded");
        assert_eq!(again.output_location.as_deref(), Some(expected_location.as_str()));
    }
    assert_eq!(h.storage.upload_count(), 1);
    assert_eq!(
        h.pika.poll_calls.load(std::sync::atomic::Ordering::SeqCst),
        polls_before
    );
}

#[tokio::test]
async fn transient_poll_error_preserves_running_state() {
    let h = default_harness().await;
    let job = created(h.manager.create_job("owner-1", &url_request(None)).await.unwrap());

    h.pika.script_polls(vec![PollStep::Transport]).await;
    let polled = h.manager.poll_job("owner-1", &job.id).await.unwrap().unwrap();
    // Could not reach the provider: stored status must still be running, not
    // failed, so a later poll can retry.
    assert_eq!(polled.status, "running");
    assert!(polled.error_message.is_none());

    let (artifact_url, _server) = spawn_artifact_server().await;
    h.pika
        .script_polls(vec![PollStep::Succeeded(artifact_url)])
        .await;
    let recovered = h.manager.poll_job("owner-1", &job.id).await.unwrap().unwrap();
    assert_eq!(recovered.status, "succeeded");
}

#[tokio::test]
async fn provider_reported_failure_is_terminal_with_its_error() {
    let h = default_harness().await;
    let job = created(h.manager.create_job("owner-1", &url_request(None)).await.unwrap());

    h.pika
        .script_polls(vec![PollStep::Failed("content policy".to_string())])
        .await;
    let polled = h.manager.poll_job("owner-1", &job.id).await.unwrap().unwrap();
    assert_eq!(polled.status, "failed");
    assert_eq!(polled.error_message.as_deref(), Some("content policy"));
    assert_eq!(h.storage.upload_count(), 0);
}

#[tokio::test]
async fn storage_failure_after_provider_success_is_terminal() {
    let (artifact_url, _server) = spawn_artifact_server().await;
    let h = harness_with(
        MockProvider::accepting(ProviderKind::Pika),
        MockProvider::accepting(ProviderKind::Runway),
        MemoryStorage::failing(),
        20,
    )
    .await;
    let job = created(h.manager.create_job("owner-1", &url_request(None)).await.unwrap());

    h.pika
        .script_polls(vec![PollStep::Succeeded(artifact_url)])
        .await;
    let polled = h.manager.poll_job("owner-1", &job.id).await.unwrap().unwrap();
    // A storage failure after provider success is not retried silently; it
    // needs operator attention and says so on the record.
    assert_eq!(polled.status, "failed");
    assert!(
        polled
            .error_message
            .unwrap()
            .contains("failed to store artifact")
    );
    assert!(polled.output_location.is_none());
}

#[tokio::test]
async fn jobs_are_scoped_to_their_owner() {
    let h = default_harness().await;
    let job = created(h.manager.create_job("owner-1", &url_request(None)).await.unwrap());

    let other = h.manager.poll_job("owner-2", &job.id).await.unwrap();
    assert!(other.is_none());
}
