use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::pagination::PaginationError;
use crate::application::repos::RepoError;
use crate::domain::entities::{CommentRecord, PlaqueRecord};
use crate::domain::error::DomainError;

/// Ceiling on any caller-supplied page size or sample count.
pub const MAX_PER_PAGE: u32 = 100;

/// Random plaques, random tags and latest comments shown in the chrome.
pub const CHROME_ITEMS: u32 = 5;

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("no approved plaques are available")]
    NoPlaquesAvailable,
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl SelectionError {
    pub(crate) fn from_repo(err: RepoError) -> Self {
        match err {
            RepoError::Pagination(err) => Self::Pagination(err),
            other => Self::Repo(other),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SelectionOptions {
    pub default_per_page: u32,
    pub pending_preview: u32,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            default_per_page: 20,
            pending_preview: 5,
        }
    }
}

impl From<&crate::config::SiteSettings> for SelectionOptions {
    fn from(settings: &crate::config::SiteSettings) -> Self {
        Self {
            default_per_page: settings.per_page.get(),
            pending_preview: settings.pending_preview.get(),
        }
    }
}

/// One page of the approved listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaquePage {
    pub plaques: Vec<PlaqueRecord>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PagesSummary {
    pub per_page: u32,
    pub total_plaques: u64,
    pub pages: u64,
}

impl PagesSummary {
    pub fn new(per_page: u32, total_plaques: u64) -> Self {
        Self {
            per_page,
            total_plaques,
            pages: total_plaques.div_ceil(u64::from(per_page.max(1))),
        }
    }

    /// Page numbers starting at 1.
    pub fn page_numbers(&self) -> impl Iterator<Item = u64> {
        1..=self.pages
    }
}

/// Result of looking up a single plaque by a caller-supplied key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "match", content = "plaque", rename_all = "snake_case")]
pub enum Resolved {
    Found(PlaqueRecord),
    /// Nothing matched; this is the earliest approved plaque.
    Fallback(PlaqueRecord),
}

impl Resolved {
    pub fn plaque(&self) -> &PlaqueRecord {
        match self {
            Resolved::Found(plaque) | Resolved::Fallback(plaque) => plaque,
        }
    }

    pub fn into_plaque(self) -> PlaqueRecord {
        match self {
            Resolved::Found(plaque) | Resolved::Fallback(plaque) => plaque,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Resolved::Fallback(_))
    }
}

/// Footer aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChromeValues {
    /// Only computed for admins.
    pub pending_count: Option<u64>,
    pub random_plaques: Vec<PlaqueRecord>,
    pub random_tags: Vec<String>,
    pub latest_comments: Vec<CommentRecord>,
}
