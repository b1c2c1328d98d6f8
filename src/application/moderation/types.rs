use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::collaborators::CollaboratorError;
use crate::application::repos::RepoError;
use crate::domain::error::DomainError;
use crate::domain::slug::SlugError;
use crate::domain::types::ViewerRole;

/// Pending plaques approved by one bulk approval.
pub const APPROVE_ALL_LIMIT: u32 = 500;
/// Plaques read and indexed per reindex batch.
pub const REINDEX_BATCH_SIZE: u32 = 100;

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("plaque `{id}` does not exist")]
    NotFound { id: Uuid },
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("could not assign a title url: {0}")]
    TitleUrl(#[from] SlugError),
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
    #[error(transparent)]
    Repo(RepoError),
}

impl ModerationError {
    /// Map a repository error, naming the plaque on `NotFound`.
    pub(crate) fn for_plaque(id: Uuid) -> impl FnOnce(RepoError) -> Self {
        move |err| match err {
            RepoError::NotFound => Self::NotFound { id },
            other => Self::Repo(other),
        }
    }
}

impl From<RepoError> for ModerationError {
    fn from(err: RepoError) -> Self {
        Self::Repo(err)
    }
}

/// Who is acting, and under which role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub role: ViewerRole,
    pub identity: Option<String>,
}

impl Actor {
    pub fn anonymous() -> Self {
        Self {
            role: ViewerRole::Anonymous,
            identity: None,
        }
    }

    pub fn admin(identity: impl Into<String>) -> Self {
        Self {
            role: ViewerRole::Admin,
            identity: Some(identity.into()),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn name(&self) -> &str {
        self.identity.as_deref().unwrap_or("anonymous")
    }
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Raw plaque form fields. Location parts stay textual so parsing failures
/// surface as validation errors.
#[derive(Debug, Clone, Default)]
pub struct PlaqueFields {
    pub title: String,
    pub description: String,
    pub lat: Option<String>,
    pub lng: Option<String>,
    /// Comma separated.
    pub tags: String,
    pub old_site_id: Option<String>,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone)]
pub struct SubmitPlaqueCommand {
    pub fields: PlaqueFields,
}

#[derive(Debug, Clone)]
pub struct EditPlaqueCommand {
    pub id: Uuid,
    pub fields: PlaqueFields,
    /// Applied only when non-zero.
    pub img_rot: i32,
}

#[derive(Debug, Clone)]
pub struct AddCommentCommand {
    pub plaque_id: Uuid,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct ModerationOptions {
    /// Recipient of submission notices; `None` disables them.
    pub admin_recipient: Option<String>,
    pub public_base_url: String,
}

impl From<(&crate::config::NotifierSettings, &crate::config::SiteSettings)> for ModerationOptions {
    fn from(
        (notifier, site): (&crate::config::NotifierSettings, &crate::config::SiteSettings),
    ) -> Self {
        Self {
            admin_recipient: notifier.admin_recipient.clone(),
            public_base_url: site.public_base_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct ReindexReport {
    /// Documents accepted by the index.
    pub good: u64,
    /// Documents the index rejected.
    pub failed: u64,
    /// Batches submitted.
    pub put: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct BackfillReport {
    pub updated_on: u64,
    pub title_urls: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_not_found_names_the_plaque() {
        let id = Uuid::new_v4();
        let err = ModerationError::for_plaque(id)(RepoError::NotFound);
        assert!(matches!(err, ModerationError::NotFound { id: missing } if missing == id));
    }
}
