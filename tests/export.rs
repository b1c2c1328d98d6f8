mod support;

use bytes::Bytes;
use plaqueboard::application::collaborators::BlobStore;
use plaqueboard::application::export::ExportError;
use plaqueboard::domain::entities::GeoPoint;
use plaqueboard::domain::error::DomainError;
use plaqueboard::domain::plaques::PlaqueRepresentation;
use plaqueboard::domain::types::ExportDetail;
use serde_json::Value;
use time::{Duration, macros::datetime};
use uuid::Uuid;

use support::{Harness, stored_plaque};

fn edinburgh() -> GeoPoint {
    GeoPoint::new(55.9533, -3.1883).expect("valid point")
}

#[tokio::test]
async fn full_exports_carry_provenance_and_summaries_do_not() {
    let harness = Harness::new();
    let at = datetime!(2012-12-12 12:00:00 UTC);
    let mut plaque = stored_plaque("Walter Scott", true, at, edinburgh(), &["author"]);
    plaque.old_site_id = Some(99);
    harness.store.seed(plaque.clone()).await;
    harness
        .store
        .seed(stored_plaque("Unlisted", false, at, edinburgh(), &[]))
        .await;

    let summary = harness
        .export
        .all(ExportDetail::Summary)
        .await
        .expect("summary export");
    assert_eq!(summary.len(), 1);
    assert!(matches!(summary[0], PlaqueRepresentation::Summary(_)));
    let json = serde_json::to_value(&summary[0]).expect("json");
    assert_eq!(json["title_page_url"], "/plaques/walter-scott");
    assert!(json.get("description").is_none());

    let full = harness
        .export
        .all(ExportDetail::Full)
        .await
        .expect("full export");
    let json = serde_json::to_value(&full[0]).expect("json");
    assert_eq!(json["old_site_id"], 99);
    assert_eq!(json["description"], "Walter Scott was here");
    assert_eq!(json["tags"], Value::from(vec!["author"]));
}

#[tokio::test]
async fn exports_by_id_keep_request_order_and_drop_unknowns() {
    let harness = Harness::new();
    let at = datetime!(2013-03-03 03:00:00 UTC);
    let first = stored_plaque("First", true, at, edinburgh(), &[]);
    let second = stored_plaque("Second", true, at + Duration::hours(1), edinburgh(), &[]);
    let pending = stored_plaque("Pending", false, at, edinburgh(), &[]);
    for plaque in [&first, &second, &pending] {
        harness.store.seed(plaque.clone()).await;
    }

    let raw = format!(
        "{}, nonsense {} {},{}",
        second.id,
        Uuid::new_v4(),
        pending.id,
        first.id
    );
    let exported = harness
        .export
        .by_ids(&raw, ExportDetail::Summary)
        .await
        .expect("export");
    let ids: Vec<Uuid> = exported.iter().map(PlaqueRepresentation::id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    let none = harness
        .export
        .by_ids("", ExportDetail::Full)
        .await
        .expect("empty");
    assert!(none.is_empty());
}

#[tokio::test]
async fn exports_since_a_timestamp_are_newest_first() {
    let harness = Harness::new();
    let at = datetime!(2014-04-04 04:00:00 UTC);
    let old = stored_plaque("Old", true, at, edinburgh(), &[]);
    let middle = stored_plaque("Middle", true, at + Duration::days(1), edinburgh(), &[]);
    let new = stored_plaque("New", true, at + Duration::days(2), edinburgh(), &[]);
    for plaque in [&old, &middle, &new] {
        harness.store.seed(plaque.clone()).await;
    }

    let exported = harness
        .export
        .created_after("2014-04-04 12:00:00", ExportDetail::Summary)
        .await
        .expect("export");
    let ids: Vec<Uuid> = exported.iter().map(PlaqueRepresentation::id).collect();
    assert_eq!(ids, vec![new.id, middle.id]);

    let rfc3339 = harness
        .export
        .created_after("2014-04-05T04:00:00Z", ExportDetail::Summary)
        .await
        .expect("rfc3339");
    assert_eq!(rfc3339.len(), 1, "the cutoff itself is excluded");

    let err = harness
        .export
        .created_after("yesterday", ExportDetail::Summary)
        .await
        .expect_err("malformed");
    assert!(matches!(
        err,
        ExportError::Domain(DomainError::MalformedTimestamp { .. })
    ));
}

#[tokio::test]
async fn the_feed_lists_approved_plaques_with_absolute_links() {
    let harness = Harness::new();
    let at = datetime!(2015-05-05 05:00:00 UTC);
    harness
        .store
        .seed(stored_plaque("Fish & Chips", true, at, edinburgh(), &[]))
        .await;
    harness
        .store
        .seed(stored_plaque("Secret", false, at, edinburgh(), &[]))
        .await;

    let feed = harness.syndication.rss_feed().await.expect("feed");
    assert!(feed.starts_with("<?xml"));
    assert!(feed.contains("<title>Fish &amp; Chips</title>"));
    assert!(feed.contains("<link>https://plaques.example.org/plaques/fish-&amp;-chips</link>"));
    assert!(!feed.contains("Secret"));
}

#[tokio::test]
async fn counts_report_orphaned_images_on_request() {
    let harness = Harness::new();
    let at = datetime!(2016-06-16 16:00:00 UTC);
    let plaque = stored_plaque("Referenced", true, at, edinburgh(), &[]);
    harness.store.seed(plaque.clone()).await;
    harness
        .store
        .seed(stored_plaque("Waiting", false, at, edinburgh(), &[]))
        .await;

    let referenced = plaque.pic.clone().expect("pic");
    for path in [referenced.as_str(), "stray/left-behind.jpg"] {
        harness
            .blobs
            .write(path, Bytes::from_static(b"jpeg"), "image/jpeg")
            .await
            .expect("write blob");
    }

    let quick = harness.diagnostics.counts(false).await.expect("counts");
    assert_eq!(quick.plaques, 2);
    assert_eq!(quick.pending, 1);
    assert_eq!(quick.comments, 0);
    assert_eq!(quick.images, Some(2));
    assert_eq!(quick.orphaned_images, None);

    let scanned = harness.diagnostics.counts(true).await.expect("counts");
    assert_eq!(
        scanned.orphaned_images,
        Some(vec!["stray/left-behind.jpg".to_string()])
    );
}
