mod admin;
mod forms;
mod middleware;
mod public;

pub use admin::build_admin_router;
pub use public::build_router;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sqlx::Error as SqlxError;

use crate::application::diagnostics::DiagnosticsService;
use crate::application::error::ErrorReport;
use crate::application::export::ExportService;
use crate::application::moderation::{Actor, ModerationService};
use crate::application::selection::SelectionService;
use crate::application::syndication::SyndicationService;
use crate::domain::types::ViewerRole;
use crate::infra::blobs::FilesystemBlobStore;
use crate::infra::db::PostgresRepositories;

/// Services shared by both listeners. The role is fixed per listener when
/// the router is built.
#[derive(Clone)]
pub struct HttpState {
    pub selection: Arc<SelectionService>,
    pub moderation: Arc<ModerationService>,
    pub export: Arc<ExportService>,
    pub syndication: Arc<SyndicationService>,
    pub diagnostics: Arc<DiagnosticsService>,
    pub blobs: Arc<FilesystemBlobStore>,
    pub db: Arc<PostgresRepositories>,
    pub upload_limit: usize,
    role: ViewerRole,
}

impl HttpState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        selection: Arc<SelectionService>,
        moderation: Arc<ModerationService>,
        export: Arc<ExportService>,
        syndication: Arc<SyndicationService>,
        diagnostics: Arc<DiagnosticsService>,
        blobs: Arc<FilesystemBlobStore>,
        db: Arc<PostgresRepositories>,
        upload_limit: usize,
    ) -> Self {
        Self {
            selection,
            moderation,
            export,
            syndication,
            diagnostics,
            blobs,
            db,
            upload_limit,
            role: ViewerRole::Anonymous,
        }
    }

    fn with_role(mut self, role: ViewerRole) -> Self {
        self.role = role;
        self
    }

    pub fn role(&self) -> ViewerRole {
        self.role
    }

    pub fn actor(&self) -> Actor {
        match self.role {
            ViewerRole::Admin => Actor::admin("admin"),
            ViewerRole::Anonymous => Actor::anonymous(),
        }
    }
}

fn db_health_response(result: Result<(), SqlxError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
