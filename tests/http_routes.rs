mod support;

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header::CONTENT_TYPE},
    response::Response,
};
use bytes::Bytes;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tempfile::TempDir;
use time::macros::datetime;
use tower::ServiceExt;

use plaqueboard::application::collaborators::BlobStore;
use plaqueboard::domain::entities::GeoPoint;
use plaqueboard::infra::blobs::FilesystemBlobStore;
use plaqueboard::infra::db::PostgresRepositories;
use plaqueboard::infra::http::{HttpState, build_admin_router, build_router};

use support::{Harness, stored_plaque};

const BOUNDARY: &str = "plaqueboard-test-boundary";

struct Server {
    harness: Harness,
    blobs: Arc<FilesystemBlobStore>,
    public: Router,
    admin: Router,
    _dir: TempDir,
}

fn server() -> Server {
    let harness = Harness::new();
    let dir = TempDir::new().expect("temp dir");
    let blobs = Arc::new(
        FilesystemBlobStore::new(dir.path().join("images"), "/images").expect("blob store"),
    );
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://plaqueboard@localhost/plaqueboard")
        .expect("lazy pool");
    let db = Arc::new(PostgresRepositories::new(pool, "public"));

    let state = HttpState::new(
        Arc::new(harness.selection.clone()),
        Arc::new(harness.moderation.clone()),
        Arc::new(harness.export.clone()),
        Arc::new(harness.syndication.clone()),
        Arc::new(harness.diagnostics.clone()),
        blobs.clone(),
        db,
        1024 * 1024,
    );

    Server {
        public: build_router(state.clone()),
        admin: build_admin_router(state),
        harness,
        blobs,
        _dir: dir,
    }
}

fn london() -> GeoPoint {
    GeoPoint::new(51.5074, -0.1278).expect("valid point")
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.expect("router response")
}

async fn get(router: &Router, uri: &str) -> Response {
    send(
        router,
        Request::get(uri).body(Body::empty()).expect("request"),
    )
    .await
}

async fn post(router: &Router, uri: &str) -> Response {
    send(
        router,
        Request::post(uri).body(Body::empty()).expect("request"),
    )
    .await
}

async fn body_bytes(response: Response) -> Bytes {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body")
}

async fn json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}

fn plaque_form(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"plaque_image_file\"; filename=\"{file_name}\"\r\nContent-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/plaques")
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

const GOOD_FIELDS: &[(&str, &str)] = &[
    ("title", "Site of the Globe Theatre"),
    ("description", "Shakespeare's playhouse"),
    ("lat", "51.5081"),
    ("lng", "-0.0972"),
    ("tags", "Theatre, Shakespeare"),
];

#[tokio::test]
async fn anonymous_submissions_wait_for_admin_approval() {
    let server = server();
    server
        .harness
        .store
        .seed(stored_plaque("Earliest", true, datetime!(2010-01-01 00:00 UTC), london(), &[]))
        .await;

    let response = send(
        &server.public,
        plaque_form(GOOD_FIELDS, Some(("globe.jpg", b"\xff\xd8 globe"))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json(response).await;
    assert_eq!(created["approved"], false);
    assert_eq!(created["title_url"], "site-of-the-globe-theatre");
    assert_eq!(created["tags"], serde_json::json!(["theatre", "shakespeare"]));
    let id = created["id"].as_str().expect("id").to_string();

    let public_view = json(get(&server.public, "/plaques/site-of-the-globe-theatre").await).await;
    assert_eq!(public_view["match"], "fallback");
    assert_eq!(public_view["plaque"]["title"], "Earliest");

    let admin_view = json(get(&server.admin, "/plaques/site-of-the-globe-theatre").await).await;
    assert_eq!(admin_view["match"], "found");
    assert_eq!(admin_view["plaque"]["id"], id.as_str());

    let approve = post(&server.admin, &format!("/plaques/{id}/approve")).await;
    assert_eq!(approve.status(), StatusCode::OK);

    let listing = json(get(&server.public, "/plaques").await).await;
    assert_eq!(listing["plaques"][0]["id"], id.as_str());
    assert_eq!(listing["has_more"], false);
}

#[tokio::test]
async fn admin_submissions_are_approved_immediately() {
    let server = server();

    let response = send(
        &server.admin,
        plaque_form(GOOD_FIELDS, Some(("globe.jpg", b"\xff\xd8 globe"))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json(response).await;
    assert_eq!(created["approved"], true);
    assert_eq!(created["created_by"], "admin");
}

#[tokio::test]
async fn submissions_without_an_image_are_bad_requests() {
    let server = server();

    let response = send(&server.public, plaque_form(GOOD_FIELDS, None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let no_location: Vec<(&str, &str)> = GOOD_FIELDS
        .iter()
        .copied()
        .filter(|(name, _)| *name != "lat")
        .collect();
    let response = send(
        &server.public,
        plaque_form(&no_location, Some(("globe.jpg", b"\xff\xd8 globe"))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn moderation_routes_exist_only_on_the_admin_listener() {
    let server = server();

    for uri in ["/pending", "/counts", "/pending/next"] {
        let response = get(&server.public, uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
    let response = post(&server.public, "/cache/flush").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(&server.admin, "/pending/next").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = post(&server.admin, "/cache/flush").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let counts = json(get(&server.admin, "/counts").await).await;
    assert_eq!(counts["plaques"], 0);
    assert_eq!(counts["pending"], 0);
}

#[tokio::test]
async fn deleting_through_the_admin_listener_reports_removed_comments() {
    let server = server();
    let plaque = stored_plaque("Doomed", true, datetime!(2011-11-11 11:00 UTC), london(), &[]);
    server.harness.store.seed(plaque.clone()).await;

    let comment = send(
        &server.public,
        Request::post(format!("/plaques/{}/comments", plaque.id))
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"text":"Nice"}"#))
            .expect("request"),
    )
    .await;
    assert_eq!(comment.status(), StatusCode::CREATED);

    let deleted = send(
        &server.admin,
        Request::delete(format!("/plaques/{}", plaque.id))
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(deleted.status(), StatusCode::OK);
    let deleted = json(deleted).await;
    assert_eq!(deleted["comments_removed"], 1);

    let again = send(
        &server.admin,
        Request::delete(format!("/plaques/{}", plaque.id))
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn random_selection_with_nothing_approved_is_not_found() {
    let server = server();

    let response = get(&server.public, "/random/plaques?count=3").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let tags = json(get(&server.public, "/random/tags").await).await;
    assert_eq!(tags, serde_json::json!([]));

    let featured = get(&server.public, "/featured").await;
    assert_eq!(featured.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn geo_queries_need_a_radius() {
    let server = server();

    let response = get(&server.public, "/geo?lat=51.5&lng=-0.1").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(&server.public, "/geo?lat=51.5&lng=-0.1&radius=500").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn malformed_cursors_are_bad_requests() {
    let server = server();

    let response = get(&server.public, "/plaques?cursor=%%%").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn exports_since_a_form_timestamp() {
    let server = server();
    server
        .harness
        .store
        .seed(stored_plaque("Recent", true, datetime!(2020-02-02 02:00 UTC), london(), &[]))
        .await;

    let response = send(
        &server.public,
        Request::post("/export/updated")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("updated_on=2020-01-01+00%3A00%3A00"))
            .expect("request"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let exported = json(response).await;
    assert_eq!(exported[0]["title"], "Recent");

    let response = send(
        &server.public,
        Request::post("/export/updated")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("updated_on=soon"))
            .expect("request"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn the_feed_is_served_as_rss() {
    let server = server();

    let response = get(&server.public, "/rss.xml").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).expect("content type"),
        "application/rss+xml"
    );
    let body = body_bytes(response).await;
    assert!(body.starts_with(b"<?xml"));
}

#[tokio::test]
async fn stored_images_are_served_and_traversal_is_refused() {
    let server = server();
    server
        .blobs
        .write(
            "20200101/101010/front.jpg",
            Bytes::from_static(b"\xff\xd8 image"),
            "image/jpeg",
        )
        .await
        .expect("write image");

    let response = get(&server.public, "/images/20200101/101010/front.jpg").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).expect("content type"),
        "image/jpeg"
    );
    assert_eq!(&body_bytes(response).await[..], b"\xff\xd8 image");

    let missing = get(&server.public, "/images/20200101/101010/back.jpg").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let traversal = get(&server.public, "/images/..%2F..%2Fetc%2Fpasswd").await;
    assert_eq!(traversal.status(), StatusCode::NOT_FOUND);
}
