//! Admin listener: everything the public one serves, seen with the admin
//! role, plus moderation and maintenance.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    application::{error::HttpError, moderation::EditPlaqueCommand},
    domain::{
        entities::PlaqueRecord,
        plaques::PlaqueRepresentation,
        types::{ExportDetail, ViewerRole},
    },
};

use super::{
    HttpState,
    forms::read_plaque_form,
    middleware::{log_responses, set_request_context},
    public::shared_routes,
};

const SOURCE: &str = "infra::http::admin";

pub fn build_admin_router(state: HttpState) -> Router {
    let state = state.with_role(ViewerRole::Admin);
    let upload_limit = state.upload_limit;

    let admin_routes = Router::new()
        .route(
            "/plaques/{key}",
            put(edit_plaque)
                .delete(delete_plaque)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/plaques/{key}/approve", post(approve_plaque))
        .route("/plaques/{key}/disapprove", post(disapprove_plaque))
        .route("/plaques/{key}/feature", post(feature_plaque))
        .route("/plaques/{key}/json", get(feature_and_show))
        .route("/plaques/random/json", get(feature_random_and_show))
        .route("/pending", get(pending))
        .route("/pending/next", get(next_pending))
        .route("/pending/approve-all", post(approve_all_pending))
        .route("/counts", get(counts))
        .route("/cache/flush", post(flush_cache))
        .route("/search/reindex", post(reindex))
        .route("/search/{doc_id}", delete(delete_search_doc))
        .route("/maintenance/backfill", post(backfill));

    shared_routes(upload_limit)
        .merge(admin_routes)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn_with_state(
            ViewerRole::Admin,
            set_request_context,
        ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PendingQuery {
    limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CountsQuery {
    find_orphans: bool,
}

async fn edit_plaque(
    State(state): State<HttpState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Response, HttpError> {
    let form = read_plaque_form(&mut multipart).await?;
    let plaque = state
        .moderation
        .edit(&state.actor(), EditPlaqueCommand {
            id,
            fields: form.fields,
            img_rot: form.img_rot,
        })
        .await?;
    Ok(Json(plaque).into_response())
}

async fn delete_plaque(
    State(state): State<HttpState>,
    Path(id): Path<Uuid>,
) -> Result<Response, HttpError> {
    let deleted = state.moderation.delete(id).await?;
    Ok(Json(deleted).into_response())
}

async fn approve_plaque(
    State(state): State<HttpState>,
    Path(id): Path<Uuid>,
) -> Result<Response, HttpError> {
    let plaque = state.moderation.approve(id).await?;
    Ok(Json(plaque).into_response())
}

async fn disapprove_plaque(
    State(state): State<HttpState>,
    Path(id): Path<Uuid>,
) -> Result<Response, HttpError> {
    let plaque = state.moderation.disapprove(id).await?;
    Ok(Json(plaque).into_response())
}

async fn feature_plaque(
    State(state): State<HttpState>,
    Path(id): Path<Uuid>,
) -> Result<Response, HttpError> {
    let plaque = state.moderation.feature(id).await?;
    Ok(Json(plaque).into_response())
}

/// Viewing a plaque's JSON here features it.
async fn feature_and_show(
    State(state): State<HttpState>,
    Path(key): Path<String>,
) -> Result<Response, HttpError> {
    let resolved = state.selection.resolve(&key, state.role()).await?;
    feature_and_represent(&state, resolved.plaque()).await
}

async fn feature_random_and_show(State(state): State<HttpState>) -> Result<Response, HttpError> {
    let plaque = state
        .selection
        .random_approved(1)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| {
            HttpError::new(
                SOURCE,
                StatusCode::SERVICE_UNAVAILABLE,
                "No plaque could be picked",
                "Random sampling gave up before finding a plaque",
            )
        })?;
    feature_and_represent(&state, &plaque).await
}

async fn feature_and_represent(
    state: &HttpState,
    plaque: &PlaqueRecord,
) -> Result<Response, HttpError> {
    let featured = state.moderation.feature(plaque.id).await?;
    Ok(Json(PlaqueRepresentation::of(&featured, ExportDetail::Full)).into_response())
}

async fn pending(
    State(state): State<HttpState>,
    Query(query): Query<PendingQuery>,
) -> Result<Response, HttpError> {
    let plaques = state.selection.pending(query.limit).await?;
    Ok(Json(plaques).into_response())
}

async fn next_pending(State(state): State<HttpState>) -> Result<Response, HttpError> {
    match state.selection.next_pending().await? {
        Some(plaque) => Ok(Json(plaque).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

async fn approve_all_pending(State(state): State<HttpState>) -> Result<Response, HttpError> {
    let approved = state.moderation.approve_all_pending().await?;
    Ok(Json(approved).into_response())
}

async fn counts(
    State(state): State<HttpState>,
    Query(query): Query<CountsQuery>,
) -> Result<Response, HttpError> {
    let counts = state.diagnostics.counts(query.find_orphans).await?;
    Ok(Json(counts).into_response())
}

async fn flush_cache(State(state): State<HttpState>) -> Response {
    state.moderation.flush_cache().await;
    StatusCode::NO_CONTENT.into_response()
}

async fn reindex(State(state): State<HttpState>) -> Result<Response, HttpError> {
    let report = state.moderation.reindex_all().await?;
    Ok(Json(report).into_response())
}

async fn delete_search_doc(
    State(state): State<HttpState>,
    Path(doc_id): Path<Uuid>,
) -> Result<Response, HttpError> {
    state.moderation.delete_search_doc(doc_id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn backfill(State(state): State<HttpState>) -> Result<Response, HttpError> {
    let report = state.moderation.backfill().await?;
    Ok(Json(report).into_response())
}
