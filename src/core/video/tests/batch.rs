//! Batch clip generation: batch splitting, pacing-safe concurrency bounds,
//! per-clip failure isolation, and failed-subset retry.

use std::sync::Arc;

use crate::core::store::ProjectStore;
use crate::core::test_support::{ScriptedRenderer, open_temp_store};
use crate::core::video::clips::{BatchClipGenerator, CLIP_BATCH_SIZE, ShotSpec};

fn shots(count: i64) -> Vec<ShotSpec> {
    (1..=count)
        .map(|n| ShotSpec {
            shot_number: n,
            prompt: format!("shot {n}"),
            image_url: Some(format!("https://cdn.example/stills/{n}.png")),
            duration_sec: Some(5.0),
        })
        .collect()
}

fn generator(
    store: &Arc<ProjectStore>,
    renderer: Arc<ScriptedRenderer>,
) -> Arc<BatchClipGenerator> {
    Arc::new(BatchClipGenerator::new(store.clone(), renderer))
}

#[tokio::test(start_paused = true)]
async fn seven_shots_render_in_batches_of_three() {
    let (_dir, store) = open_temp_store().await;
    let renderer = Arc::new(ScriptedRenderer::new(vec![]));
    let generator = generator(&store, renderer.clone());

    let outcomes = generator
        .generate("shotlist-1", "project-1", "pika", &shots(7))
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 7);
    assert!(outcomes.iter().all(|o| o.success));
    // Batches of [3, 3, 1]: never more than CLIP_BATCH_SIZE in flight.
    assert!(renderer.max_concurrency() <= CLIP_BATCH_SIZE);

    let clips = store.list_clips_by_shot_list("shotlist-1").await.unwrap();
    assert_eq!(clips.len(), 7);
    for clip in clips {
        assert_eq!(clip.status, "completed");
        assert!(clip.video_url.is_some());
    }
}

#[tokio::test(start_paused = true)]
async fn failed_shot_does_not_stop_its_batch_or_later_batches() {
    let (_dir, store) = open_temp_store().await;
    let renderer = Arc::new(ScriptedRenderer::new(vec![2]));
    let generator = generator(&store, renderer.clone());

    let outcomes = generator
        .generate("shotlist-1", "project-1", "pika", &shots(7))
        .await
        .unwrap();

    let by_number = |n: i64| outcomes.iter().find(|o| o.clip_number == n).unwrap();
    assert!(by_number(1).success);
    assert!(!by_number(2).success);
    assert!(by_number(3).success);
    // The second batch still ran.
    for n in 4..=7 {
        assert!(by_number(n).success, "shot {n} should have rendered");
    }

    let clips = store.list_clips_by_shot_list("shotlist-1").await.unwrap();
    let failed: Vec<_> = clips.iter().filter(|c| c.status == "failed").collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].clip_number, 2);
    assert!(
        failed[0]
            .error_message
            .as_deref()
            .unwrap()
            .contains("shot 2")
    );
}

#[tokio::test(start_paused = true)]
async fn retry_failed_rerenders_only_the_failed_subset() {
    let (_dir, store) = open_temp_store().await;
    let first_renderer = Arc::new(ScriptedRenderer::new(vec![2, 5]));
    let first_pass = generator(&store, first_renderer.clone());
    first_pass
        .generate("shotlist-1", "project-1", "pika", &shots(7))
        .await
        .unwrap();

    // Second pass with a healthy renderer, same store.
    let second_renderer = Arc::new(ScriptedRenderer::new(vec![]));
    let retry_pass = generator(&store, second_renderer.clone());
    let outcomes = retry_pass
        .retry_failed("shotlist-1", &shots(7))
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.success));
    // Only shots 2 and 5 were re-rendered; succeeded clips untouched.
    assert_eq!(second_renderer.calls_for(2).await, 1);
    assert_eq!(second_renderer.calls_for(5).await, 1);
    assert_eq!(second_renderer.calls_for(1).await, 0);
    assert_eq!(second_renderer.calls_for(7).await, 0);

    let clips = store.list_clips_by_shot_list("shotlist-1").await.unwrap();
    assert!(clips.iter().all(|c| c.status == "completed"));
}

#[tokio::test(start_paused = true)]
async fn retry_with_nothing_failed_is_a_noop() {
    let (_dir, store) = open_temp_store().await;
    let renderer = Arc::new(ScriptedRenderer::new(vec![]));
    let generator = generator(&store, renderer.clone());

    generator
        .generate("shotlist-1", "project-1", "pika", &shots(3))
        .await
        .unwrap();
    let outcomes = generator
        .retry_failed("shotlist-1", &shots(3))
        .await
        .unwrap();
    assert!(outcomes.is_empty());
    // No clip was rendered twice.
    for n in 1..=3 {
        assert_eq!(renderer.calls_for(n).await, 1);
    }
}

#[tokio::test]
async fn generate_rejects_an_empty_shot_list() {
    let (_dir, store) = open_temp_store().await;
    let renderer = Arc::new(ScriptedRenderer::new(vec![]));
    let generator = generator(&store, renderer);

    assert!(
        generator
            .generate("shotlist-1", "project-1", "pika", &[])
            .await
            .is_err()
    );
}
