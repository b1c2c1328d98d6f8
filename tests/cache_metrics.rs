mod support;

use std::collections::HashSet;
use std::sync::atomic::Ordering;

use metrics_util::debugging::DebuggingRecorder;
use plaqueboard::application::moderation::Actor;
use plaqueboard::cache::CacheConfig;
use plaqueboard::domain::entities::GeoPoint;
use plaqueboard::domain::types::ViewerRole;
use time::{Duration, macros::datetime};

use support::{Harness, stored_plaque};

#[tokio::test]
async fn cache_and_moderation_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let harness = Harness::with_cache(CacheConfig {
        entry_limit: 1,
        ..CacheConfig::default()
    });
    let at = datetime!(2015-01-01 00:00:00 UTC);
    let point = GeoPoint::new(52.2053, 0.1218).expect("valid point");
    harness
        .store
        .seed(stored_plaque("One", true, at, point, &["a"]))
        .await;
    harness
        .store
        .seed(stored_plaque("Two", true, at + Duration::minutes(1), point, &["b"]))
        .await;

    // miss, hit, then a second key evicts the first
    for _ in 0..2 {
        harness
            .selection
            .page_approved(ViewerRole::Anonymous, None, None)
            .await
            .expect("page");
    }
    harness
        .selection
        .pages_summary(ViewerRole::Anonymous, None)
        .await
        .expect("summary");

    harness.selection.random_approved(2).await.expect("random");

    let plaque = harness
        .submit(&Actor::admin("curator"), "Three", "c")
        .await;
    harness.blobs.fail_deletes.store(true, Ordering::SeqCst);
    harness.moderation.delete(plaque.id).await.expect("delete");

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "plaqueboard_cache_hit_total",
        "plaqueboard_cache_miss_total",
        "plaqueboard_cache_evict_total",
        "plaqueboard_cache_flush_total",
        "plaqueboard_cache_event_queue_len",
        "plaqueboard_cache_consume_ms",
        "plaqueboard_random_sample_attempts",
        "plaqueboard_cleanup_failure_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
