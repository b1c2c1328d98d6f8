use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::{
        export::ExportError,
        moderation::ModerationError,
        pagination::PaginationError,
        repos::RepoError,
        selection::SelectionError,
    },
    domain::error::DomainError,
    infra::error::InfraError,
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

fn repo_status(error: &RepoError) -> (StatusCode, &'static str) {
    match error {
        RepoError::NotFound => (StatusCode::NOT_FOUND, "Resource not found"),
        RepoError::Duplicate { .. } => (StatusCode::CONFLICT, "Resource already exists"),
        RepoError::InvalidInput { .. } | RepoError::Pagination(_) => {
            (StatusCode::BAD_REQUEST, "Request could not be processed")
        }
        RepoError::Timeout => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Service temporarily unavailable",
        ),
        RepoError::Persistence(_) | RepoError::Integrity { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

fn domain_status(error: &DomainError) -> (StatusCode, &'static str) {
    match error {
        DomainError::NotFound { .. } => (StatusCode::NOT_FOUND, "Resource not found"),
        DomainError::Invariant { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
        DomainError::MissingLocation => (StatusCode::BAD_REQUEST, "A location is required"),
        DomainError::InvalidLocation { .. } => {
            (StatusCode::BAD_REQUEST, "The location is out of range")
        }
        DomainError::MissingImage => (StatusCode::BAD_REQUEST, "An image is required"),
        DomainError::MalformedTimestamp { .. } => {
            (StatusCode::BAD_REQUEST, "The timestamp could not be parsed")
        }
        DomainError::Validation { .. } => {
            (StatusCode::BAD_REQUEST, "Request could not be processed")
        }
    }
}

impl From<RepoError> for HttpError {
    fn from(error: RepoError) -> Self {
        let (status, message) = repo_status(&error);
        HttpError::from_error("application::error::repo_error", status, message, &error)
    }
}

impl From<DomainError> for HttpError {
    fn from(error: DomainError) -> Self {
        let (status, message) = domain_status(&error);
        HttpError::from_error("application::error::domain_error", status, message, &error)
    }
}

impl From<PaginationError> for HttpError {
    fn from(error: PaginationError) -> Self {
        match error {
            PaginationError::InvalidCursor(cursor) => HttpError::new(
                "application::error::pagination_error",
                StatusCode::BAD_REQUEST,
                "Invalid cursor",
                format!("Cursor `{cursor}` could not be decoded"),
            ),
        }
    }
}

impl From<SelectionError> for HttpError {
    fn from(error: SelectionError) -> Self {
        const SOURCE: &str = "application::error::selection_error";
        match error {
            SelectionError::NoPlaquesAvailable => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "No plaques available",
                "There are no approved plaques to choose from",
            ),
            SelectionError::Pagination(err) => HttpError::from(err),
            SelectionError::Domain(err) => HttpError::from(err),
            SelectionError::Repo(err) => HttpError::from(err),
        }
    }
}

impl From<ExportError> for HttpError {
    fn from(error: ExportError) -> Self {
        match error {
            ExportError::Domain(err) => HttpError::from(err),
            ExportError::Repo(err) => HttpError::from(err),
        }
    }
}

impl From<ModerationError> for HttpError {
    fn from(error: ModerationError) -> Self {
        const SOURCE: &str = "application::error::moderation_error";
        match error {
            ModerationError::NotFound { id } => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Plaque not found",
                format!("Plaque `{id}` does not exist"),
            ),
            ModerationError::Domain(err) => HttpError::from(err),
            ModerationError::TitleUrl(err) => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "The title cannot be used for an address",
                &err,
            ),
            ModerationError::Collaborator(err) => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_GATEWAY,
                "A backing service failed",
                &err,
            ),
            ModerationError::Repo(err) => HttpError::from(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Moderation(#[from] ModerationError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("resource not found")]
    NotFound,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) | AppError::NotFound => {
                StatusCode::NOT_FOUND
            }
            AppError::Domain(err) if err.is_validation() => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Infra(InfraError::Database { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Repo(err) => repo_status(err).0,
            AppError::Moderation(_) | AppError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Infra(_) | AppError::Domain(_) | AppError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn presentation_message(&self) -> &'static str {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) | AppError::NotFound => {
                "Resource not found"
            }
            AppError::Domain(err) if err.is_validation() => "Request could not be processed",
            AppError::Validation(_) => "Request could not be processed",
            AppError::Infra(InfraError::Database { .. }) => "Service temporarily unavailable",
            AppError::Infra(InfraError::Configuration { .. }) => "Service misconfigured",
            AppError::Infra(InfraError::Telemetry(_)) => "Logging subsystem could not start",
            AppError::Infra(InfraError::Io(_)) => "I/O failure during request",
            AppError::Repo(err) => repo_status(err).1,
            AppError::Moderation(_)
            | AppError::Export(_)
            | AppError::Domain(_)
            | AppError::Unexpected(_) => "Unexpected error occurred",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.presentation_message();
        let report = ErrorReport::from_error("application::error::AppError", status, &self);
        let mut response = (status, message).into_response();
        report.attach(&mut response);
        response
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn moderation_not_found_maps_to_404() {
        let error = HttpError::from(ModerationError::NotFound { id: Uuid::nil() });
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn missing_location_is_a_bad_request() {
        let error = HttpError::from(ModerationError::Domain(DomainError::MissingLocation));
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn empty_approved_set_is_reported() {
        let error = HttpError::from(SelectionError::NoPlaquesAvailable);
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn report_carries_the_error_chain() {
        let error = AppError::from(RepoError::Timeout);
        let response = error.into_response();
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(report.messages, vec!["database timeout".to_string()]);
    }
}
