//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{CursorPage, PageRequest, PaginationError, PlaqueCursor};
use crate::domain::entities::{CommentRecord, FeaturedPlaqueRecord, GeoPoint, PlaqueRecord};
use crate::domain::types::ViewerRole;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which plaques a read may observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaqueScope {
    /// Approved plaques only.
    Public,
    /// Approved and pending plaques.
    Admin,
}

impl PlaqueScope {
    pub fn for_role(role: ViewerRole) -> Self {
        match role {
            ViewerRole::Anonymous => Self::Public,
            ViewerRole::Admin => Self::Admin,
        }
    }

    pub fn includes_pending(self) -> bool {
        matches!(self, Self::Admin)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlaqueQueryFilter {
    /// Exact, already normalized tag.
    pub tag: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreatePlaqueParams {
    pub id: Uuid,
    pub title_url: String,
    pub old_site_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub location: GeoPoint,
    pub tags: Vec<String>,
    pub pic: Option<String>,
    pub img_url: Option<String>,
    pub approved: bool,
    /// Write time. An approved plaque is moved after the latest approved one.
    pub created_on: OffsetDateTime,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdatePlaqueParams {
    pub id: Uuid,
    /// `None` keeps the stored title url.
    pub title_url: Option<String>,
    pub title: String,
    pub description: String,
    pub location: GeoPoint,
    pub tags: Vec<String>,
    /// `None` keeps the stored image.
    pub image: Option<PlaqueImage>,
    /// `None` keeps the stored rotation.
    pub img_rot: Option<i32>,
    pub old_site_id: Option<i64>,
    pub updated_on: OffsetDateTime,
    pub updated_by: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PlaqueImage {
    pub pic: String,
    pub img_url: String,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub plaque_id: Uuid,
    pub text: String,
    pub approved: bool,
    pub created_on: OffsetDateTime,
    pub created_by: Option<String>,
}

/// What a cascading delete removed.
#[derive(Debug, Clone, Serialize)]
pub struct DeletedPlaque {
    pub plaque: PlaqueRecord,
    pub comments_removed: u64,
}

#[async_trait]
pub trait PlaquesRepo: Send + Sync {
    /// Plaques ordered by `(created_on DESC, id DESC)`.
    async fn list_plaques(
        &self,
        scope: PlaqueScope,
        filter: &PlaqueQueryFilter,
        page: PageRequest<PlaqueCursor>,
    ) -> Result<CursorPage<PlaqueRecord>, RepoError>;

    async fn count_plaques(&self, scope: PlaqueScope) -> Result<u64, RepoError>;

    async fn count_pending(&self) -> Result<u64, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PlaqueRecord>, RepoError>;

    async fn find_by_title_url(&self, title_url: &str) -> Result<Option<PlaqueRecord>, RepoError>;

    async fn find_by_old_site_id(&self, old_site_id: i64)
    -> Result<Option<PlaqueRecord>, RepoError>;

    async fn find_by_comment(&self, comment_id: Uuid) -> Result<Option<PlaqueRecord>, RepoError>;

    /// Plaques for the given ids in no particular order; unknown ids are skipped.
    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<PlaqueRecord>, RepoError>;

    /// Earliest and latest `created_on` among approved plaques.
    async fn approved_time_bounds(
        &self,
    ) -> Result<Option<(OffsetDateTime, OffsetDateTime)>, RepoError>;

    /// The approved plaque with the smallest `created_on` strictly after `instant`.
    async fn first_approved_after(
        &self,
        instant: OffsetDateTime,
    ) -> Result<Option<PlaqueRecord>, RepoError>;

    async fn earliest_approved(&self) -> Result<Option<PlaqueRecord>, RepoError>;

    /// Oldest pending plaques first.
    async fn list_pending(&self, limit: u32) -> Result<Vec<PlaqueRecord>, RepoError>;

    /// Approved plaques, newest first, skipping `offset`.
    async fn list_approved_block(
        &self,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<PlaqueRecord>, RepoError>;

    /// Approved plaques with `created_on` strictly after `since`, newest first.
    async fn list_approved_created_after(
        &self,
        since: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<PlaqueRecord>, RepoError>;

    /// Every plaque regardless of state, oldest first.
    async fn list_all_block(&self, offset: u64, limit: u32)
    -> Result<Vec<PlaqueRecord>, RepoError>;

    async fn list_missing_title_url(&self, limit: u32) -> Result<Vec<PlaqueRecord>, RepoError>;

    /// Blob paths referenced by any plaque.
    async fn list_pics(&self) -> Result<Vec<String>, RepoError>;

    async fn title_url_taken(
        &self,
        title_url: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait PlaquesWriteRepo: Send + Sync {
    async fn create_plaque(&self, params: CreatePlaqueParams) -> Result<PlaqueRecord, RepoError>;

    async fn update_plaque(&self, params: UpdatePlaqueParams) -> Result<PlaqueRecord, RepoError>;

    /// Approving resets `created_on` to `now`, or just after the latest
    /// approved plaque when that is not later, decided while holding the
    /// plaqueset write lock. Disapproving leaves `created_on` alone.
    async fn set_approval(
        &self,
        id: Uuid,
        approved: bool,
        now: OffsetDateTime,
    ) -> Result<PlaqueRecord, RepoError>;

    /// Approve up to `limit` pending plaques, oldest first, in one transaction.
    /// They share one `created_on`, chosen as in [`Self::set_approval`].
    async fn approve_pending(
        &self,
        limit: u32,
        now: OffsetDateTime,
    ) -> Result<Vec<PlaqueRecord>, RepoError>;

    /// Remove the plaque and its comments in one transaction.
    async fn delete_plaque(&self, id: Uuid) -> Result<DeletedPlaque, RepoError>;

    /// Set `updated_on = created_on` where it is missing.
    async fn backfill_updated_on(&self) -> Result<u64, RepoError>;

    async fn set_title_url(&self, id: Uuid, title_url: &str) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn add_comment(&self, params: CreateCommentParams) -> Result<CommentRecord, RepoError>;

    async fn list_for_plaque(&self, plaque_id: Uuid) -> Result<Vec<CommentRecord>, RepoError>;

    /// Newest approved comments on approved plaques.
    async fn latest_approved(&self, limit: u32) -> Result<Vec<CommentRecord>, RepoError>;

    async fn count_comments(&self) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait FeaturedRepo: Send + Sync {
    async fn append_featured(
        &self,
        plaque_id: Uuid,
        at: OffsetDateTime,
    ) -> Result<FeaturedPlaqueRecord, RepoError>;

    async fn latest_featured(&self) -> Result<Option<FeaturedPlaqueRecord>, RepoError>;
}
