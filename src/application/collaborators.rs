//! Contracts for the external services the core leans on: the search index,
//! the blob store holding plaque images, and the admin notifier.
//!
//! Every caller treats these as best effort. A failure is logged and counted,
//! never allowed to undo a committed entity write.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{GeoPoint, PlaqueRecord};

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("search index failure: {0}")]
    Search(String),
    #[error("malformed search query `{query}`")]
    InvalidQuery { query: String },
    #[error("blob store failure: {0}")]
    Blob(String),
    #[error("notifier failure: {0}")]
    Notify(String),
}

/// Document stored in the search index. The document id is the plaque id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub doc_id: Uuid,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub location: GeoPoint,
    #[serde(with = "time::serde::rfc3339")]
    pub created_on: OffsetDateTime,
}

impl From<&PlaqueRecord> for SearchDocument {
    fn from(plaque: &PlaqueRecord) -> Self {
        Self {
            doc_id: plaque.id,
            title: plaque.title.clone(),
            description: plaque.description.clone(),
            tags: plaque.tags.clone(),
            location: plaque.location,
            created_on: plaque.created_on,
        }
    }
}

/// Query language understood by the search index: a quoted phrase, or
/// `distance(location, geopoint(LAT, LNG)) < METERS`.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchQuery {
    Phrase(String),
    Within { center: GeoPoint, radius_meters: f64 },
}

impl SearchQuery {
    /// Phrase query for free text. Inner quotes are removed; a term with
    /// nothing left yields `None`.
    pub fn phrase(term: &str) -> Option<Self> {
        let cleaned = term.replace('"', "");
        let cleaned = cleaned.trim();
        (!cleaned.is_empty()).then(|| Self::Phrase(cleaned.to_string()))
    }

    pub fn within(center: GeoPoint, radius_meters: f64) -> Self {
        Self::Within {
            center,
            radius_meters,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, CollaboratorError> {
        let input = raw.trim();
        if input.starts_with("distance(") {
            return parse_distance(input).ok_or_else(|| CollaboratorError::InvalidQuery {
                query: raw.to_string(),
            });
        }

        let unquoted = input
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .unwrap_or(input);
        Self::phrase(unquoted).ok_or_else(|| CollaboratorError::InvalidQuery {
            query: raw.to_string(),
        })
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Phrase(text) => write!(f, "\"{text}\""),
            Self::Within {
                center,
                radius_meters,
            } => write!(
                f,
                "distance(location, geopoint({}, {})) < {}",
                center.lat, center.lng, radius_meters
            ),
        }
    }
}

fn parse_distance(input: &str) -> Option<SearchQuery> {
    let rest = input.strip_prefix("distance(")?.trim_start();
    let rest = rest.strip_prefix("location")?.trim_start();
    let rest = rest.strip_prefix(',')?.trim_start();
    let rest = rest.strip_prefix("geopoint(")?;
    let (coords, rest) = rest.split_once(')')?;
    let (lat, lng) = coords.split_once(',')?;
    let rest = rest.trim_start().strip_prefix(')')?.trim_start();
    let radius = rest.strip_prefix('<')?.trim();

    let center = GeoPoint::new(lat.trim().parse().ok()?, lng.trim().parse().ok()?).ok()?;
    let radius_meters: f64 = radius.parse().ok()?;
    (radius_meters.is_finite() && radius_meters >= 0.0)
        .then_some(SearchQuery::within(center, radius_meters))
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn put(&self, document: SearchDocument) -> Result<(), CollaboratorError>;

    async fn delete(&self, doc_id: Uuid) -> Result<(), CollaboratorError>;

    /// Matching document ids in index order. No visibility filtering happens here.
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Uuid>, CollaboratorError>;

    async fn clear(&self) -> Result<u64, CollaboratorError>;
}

/// A blob written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub path: String,
    pub url: String,
    pub checksum: String,
    pub size_bytes: u64,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn write(
        &self,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<StoredBlob, CollaboratorError>;

    async fn delete(&self, path: &str) -> Result<(), CollaboratorError>;

    async fn list_paths(&self) -> Result<Vec<String>, CollaboratorError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str)
    -> Result<(), CollaboratorError>;
}
