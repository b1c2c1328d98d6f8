use std::io::ErrorKind;

use axum::{
    Form, Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use crate::{
    application::{
        error::HttpError,
        moderation::{AddCommentCommand, SubmitPlaqueCommand},
        selection::CHROME_ITEMS,
    },
    domain::{plaques::PlaqueRepresentation, types::ExportDetail},
    infra::blobs::BlobStorageError,
};

use super::{
    HttpState, db_health_response,
    forms::read_plaque_form,
    middleware::{log_responses, set_request_context},
};
use crate::domain::types::ViewerRole;

/// Routes both listeners serve. What they return depends on the listener's role.
pub(super) fn shared_routes(upload_limit: usize) -> Router<HttpState> {
    Router::new()
        .route(
            "/plaques",
            get(list_plaques)
                .post(submit_plaque)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/plaques/{key}", get(show_plaque))
        .route("/plaques/{key}/comments", post(add_comment))
        .route("/random/plaques", get(random_plaques))
        .route("/random/tags", get(random_tags))
        .route("/tags/{tag}", get(plaques_by_tag))
        .route("/search", get(search))
        .route("/geo", get(geo_search))
        .route("/featured", get(featured))
        .route("/chrome", get(chrome))
        .route("/pages", get(pages))
        .route("/export/summary", get(export_summary))
        .route("/export/full", get(export_full))
        .route("/export/keys/{ids}", get(export_keys))
        .route("/export/updated", post(export_updated))
        .route("/rss.xml", get(rss_feed))
        .route("/images/{*path}", get(serve_image))
        .route("/_health/db", get(health))
}

/// Anonymous listener.
pub fn build_router(state: HttpState) -> Router {
    let state = state.with_role(ViewerRole::Anonymous);
    shared_routes(state.upload_limit)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn_with_state(
            ViewerRole::Anonymous,
            set_request_context,
        ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ListQuery {
    pub(super) per_page: Option<u32>,
    pub(super) cursor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CountQuery {
    count: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchParams {
    q: String,
}

#[derive(Debug, Deserialize)]
struct GeoParams {
    lat: f64,
    lng: f64,
    radius: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DetailQuery {
    detail: Option<ExportDetail>,
}

#[derive(Debug, Deserialize)]
struct UpdatedForm {
    updated_on: String,
}

#[derive(Debug, Deserialize)]
struct CommentForm {
    text: String,
}

async fn list_plaques(
    State(state): State<HttpState>,
    Query(query): Query<ListQuery>,
) -> Result<Response, HttpError> {
    let page = state
        .selection
        .page_approved(state.role(), query.per_page, query.cursor.as_deref())
        .await?;
    Ok(Json(page).into_response())
}

async fn show_plaque(
    State(state): State<HttpState>,
    Path(key): Path<String>,
) -> Result<Response, HttpError> {
    let resolved = state.selection.resolve(&key, state.role()).await?;
    Ok(Json(resolved).into_response())
}

async fn random_plaques(
    State(state): State<HttpState>,
    Query(query): Query<CountQuery>,
) -> Result<Response, HttpError> {
    let count = query
        .count
        .unwrap_or(state.selection.options().default_per_page);
    let plaques = state.selection.random_approved(count).await?;
    Ok(Json(plaques).into_response())
}

async fn random_tags(
    State(state): State<HttpState>,
    Query(query): Query<CountQuery>,
) -> Result<Response, HttpError> {
    let tags = state
        .selection
        .random_tags(query.count.unwrap_or(CHROME_ITEMS))
        .await?;
    Ok(Json(tags).into_response())
}

async fn plaques_by_tag(
    State(state): State<HttpState>,
    Path(tag): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Response, HttpError> {
    let plaques = state
        .selection
        .by_tag(state.role(), &tag, query.per_page)
        .await?;
    Ok(Json(plaques).into_response())
}

async fn search(
    State(state): State<HttpState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, HttpError> {
    let plaques = state
        .selection
        .by_search_term(state.role(), &params.q, None)
        .await?;
    Ok(Json(plaques).into_response())
}

async fn geo_search(
    State(state): State<HttpState>,
    Query(params): Query<GeoParams>,
) -> Result<Response, HttpError> {
    let plaques = state
        .selection
        .by_geo(state.role(), params.lat, params.lng, params.radius, None)
        .await?;
    Ok(Json(plaques).into_response())
}

async fn featured(State(state): State<HttpState>) -> Result<Response, HttpError> {
    match state.selection.featured(state.role()).await? {
        Some(plaque) => Ok(Json(plaque).into_response()),
        None => Err(HttpError::new(
            "infra::http::public::featured",
            StatusCode::NOT_FOUND,
            "Nothing is featured",
            "No featured plaque is visible",
        )),
    }
}

async fn chrome(State(state): State<HttpState>) -> Result<Response, HttpError> {
    let values = state.selection.chrome(state.role()).await?;
    Ok(Json(values).into_response())
}

async fn pages(
    State(state): State<HttpState>,
    Query(query): Query<ListQuery>,
) -> Result<Response, HttpError> {
    let summary = state
        .selection
        .pages_summary(state.role(), query.per_page)
        .await?;
    Ok(Json(summary).into_response())
}

async fn export_summary(State(state): State<HttpState>) -> Result<Response, HttpError> {
    export_all(&state, ExportDetail::Summary).await
}

async fn export_full(State(state): State<HttpState>) -> Result<Response, HttpError> {
    export_all(&state, ExportDetail::Full).await
}

async fn export_all(state: &HttpState, detail: ExportDetail) -> Result<Response, HttpError> {
    let plaques: Vec<PlaqueRepresentation> = state.export.all(detail).await?;
    Ok(Json(plaques).into_response())
}

async fn export_keys(
    State(state): State<HttpState>,
    Path(ids): Path<String>,
    Query(query): Query<DetailQuery>,
) -> Result<Response, HttpError> {
    let detail = query.detail.unwrap_or(ExportDetail::Summary);
    let plaques = state.export.by_ids(&ids, detail).await?;
    Ok(Json(plaques).into_response())
}

async fn export_updated(
    State(state): State<HttpState>,
    Form(form): Form<UpdatedForm>,
) -> Result<Response, HttpError> {
    let plaques = state
        .export
        .created_after(&form.updated_on, ExportDetail::Summary)
        .await?;
    Ok(Json(plaques).into_response())
}

async fn submit_plaque(
    State(state): State<HttpState>,
    mut multipart: Multipart,
) -> Result<Response, HttpError> {
    let form = read_plaque_form(&mut multipart).await?;
    let plaque = state
        .moderation
        .submit(&state.actor(), SubmitPlaqueCommand {
            fields: form.fields,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(plaque)).into_response())
}

async fn add_comment(
    State(state): State<HttpState>,
    Path(id): Path<Uuid>,
    Json(form): Json<CommentForm>,
) -> Result<Response, HttpError> {
    let comment = state
        .moderation
        .add_comment(&state.actor(), AddCommentCommand {
            plaque_id: id,
            text: form.text,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(comment)).into_response())
}

async fn rss_feed(State(state): State<HttpState>) -> Response {
    match state.syndication.rss_feed().await {
        Ok(body) => xml_response(body, "application/rss+xml"),
        Err(err) => HttpError::new(
            "infra::http::public::rss",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to generate RSS feed",
            err.to_string(),
        )
        .into_response(),
    }
}

async fn serve_image(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::public::serve_image";

    match state.blobs.read(&path).await {
        Ok(bytes) => build_image_response(&path, bytes),
        Err(BlobStorageError::InvalidPath) => image_not_found(SOURCE),
        Err(BlobStorageError::Io(err)) if err.kind() == ErrorKind::NotFound => {
            image_not_found(SOURCE)
        }
        Err(err) => {
            error!(
                target: "plaqueboard::http",
                path = %path,
                error = %err,
                "failed to read stored image"
            );
            HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read image",
                err.to_string(),
            )
            .into_response()
        }
    }
}

fn image_not_found(source: &'static str) -> Response {
    HttpError::new(
        source,
        StatusCode::NOT_FOUND,
        "Image not found",
        "The requested image is not available",
    )
    .into_response()
}

async fn health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.health_check().await)
}

fn build_image_response(path: &str, bytes: Bytes) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}

fn xml_response(body: String, content_type: &str) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
