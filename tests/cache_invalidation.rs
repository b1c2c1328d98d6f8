mod support;

use plaqueboard::application::moderation::{Actor, AddCommentCommand};
use plaqueboard::cache::CacheConfig;
use plaqueboard::domain::entities::GeoPoint;
use plaqueboard::domain::types::{ExportDetail, ViewerRole};
use time::{Duration, OffsetDateTime, macros::datetime};

use support::{Harness, stored_plaque};

fn somewhere() -> GeoPoint {
    GeoPoint::new(53.4808, -2.2426).expect("valid point")
}

async fn approved_titles(harness: &Harness) -> Vec<String> {
    harness
        .selection
        .page_approved(ViewerRole::Anonymous, None, None)
        .await
        .expect("page")
        .plaques
        .into_iter()
        .map(|plaque| plaque.title)
        .collect()
}

#[tokio::test]
async fn reads_are_memoized_until_a_mutation_flushes_them() {
    let harness = Harness::new();
    let at = datetime!(2015-01-01 00:00:00 UTC);
    harness
        .store
        .seed(stored_plaque("Cached", true, at, somewhere(), &[]))
        .await;

    assert_eq!(approved_titles(&harness).await, vec!["Cached"]);
    assert!(!harness.cache.is_empty());

    // Rows written behind the services' back stay invisible while cached.
    harness
        .store
        .seed(stored_plaque("Sneaky", true, at + Duration::hours(1), somewhere(), &[]))
        .await;
    assert_eq!(approved_titles(&harness).await, vec!["Cached"]);

    harness
        .submit(&Actor::admin("curator"), "Fresh", "")
        .await;
    assert_eq!(
        approved_titles(&harness).await,
        vec!["Fresh", "Sneaky", "Cached"]
    );
}

#[tokio::test]
async fn comments_flush_the_chrome() {
    let harness = Harness::new();
    let plaque = harness
        .submit(&Actor::admin("curator"), "Commented", "")
        .await;

    let before = harness
        .selection
        .chrome(ViewerRole::Anonymous)
        .await
        .expect("chrome");
    assert!(before.latest_comments.is_empty());

    harness
        .moderation
        .add_comment(&Actor::admin("curator"), AddCommentCommand {
            plaque_id: plaque.id,
            text: "Restored in 2019".to_string(),
        })
        .await
        .expect("comment");

    let after = harness
        .selection
        .chrome(ViewerRole::Anonymous)
        .await
        .expect("chrome");
    assert_eq!(after.latest_comments.len(), 1);
    assert_eq!(after.latest_comments[0].text, "Restored in 2019");
}

#[tokio::test]
async fn admin_and_anonymous_values_are_cached_separately() {
    let harness = Harness::new();
    let at = datetime!(2016-06-06 06:00:00 UTC);
    let approved = stored_plaque("Visible", true, at, somewhere(), &[]);
    let pending = stored_plaque("Queued", false, at + Duration::hours(1), somewhere(), &[]);
    harness.store.seed(approved.clone()).await;
    harness.store.seed(pending.clone()).await;

    let anonymous = harness
        .selection
        .resolve("queued", ViewerRole::Anonymous)
        .await
        .expect("anonymous");
    assert!(anonymous.is_fallback());

    let admin = harness
        .selection
        .resolve("queued", ViewerRole::Admin)
        .await
        .expect("admin");
    assert!(!admin.is_fallback());
    assert_eq!(admin.plaque().id, pending.id);

    let anonymous_again = harness
        .selection
        .resolve("queued", ViewerRole::Anonymous)
        .await
        .expect("anonymous again");
    assert_eq!(anonymous_again.plaque().id, approved.id);
}

#[tokio::test]
async fn manual_flush_drops_every_entry() {
    let harness = Harness::new();
    harness
        .store
        .seed(stored_plaque("Before", true, OffsetDateTime::now_utc(), somewhere(), &[]))
        .await;
    approved_titles(&harness).await;
    harness.syndication.rss_feed().await.expect("feed");
    assert!(harness.cache.len() >= 2);

    harness.moderation.flush_cache().await;
    assert!(harness.cache.is_empty());
}

#[tokio::test]
async fn a_disabled_cache_always_recomputes() {
    let harness = Harness::with_cache(CacheConfig {
        enabled: false,
        ..CacheConfig::default()
    });
    let at = datetime!(2017-07-07 07:00:00 UTC);
    harness
        .store
        .seed(stored_plaque("One", true, at, somewhere(), &[]))
        .await;
    assert_eq!(approved_titles(&harness).await, vec!["One"]);

    harness
        .store
        .seed(stored_plaque("Two", true, at + Duration::minutes(5), somewhere(), &[]))
        .await;
    assert_eq!(approved_titles(&harness).await, vec!["Two", "One"]);
    assert!(harness.cache.is_empty());
}

#[tokio::test]
async fn cached_exports_follow_deletions() {
    let harness = Harness::new();
    let admin = Actor::admin("curator");
    let kept = harness.submit(&admin, "Kept", "").await;
    let removed = harness.submit(&admin, "Removed", "").await;

    let before = harness
        .export
        .all(ExportDetail::Summary)
        .await
        .expect("export");
    assert_eq!(before.len(), 2);

    harness.moderation.delete(removed.id).await.expect("delete");

    let after = harness
        .export
        .all(ExportDetail::Summary)
        .await
        .expect("export");
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].id(), kept.id);
}
