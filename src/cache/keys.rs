//! Cache key definitions.
//!
//! Every derived value is addressed by a [`CacheKey`] whose rendered string
//! carries each parameter that shapes the value, including the viewer role.

use std::fmt;

use url::form_urlencoded::byte_serialize;

use crate::domain::entities::GeoPoint;
use crate::domain::types::{ExportDetail, ViewerRole};

/// Memoized read-path values.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheKey {
    /// One page of the approved listing.
    Page {
        role: ViewerRole,
        per_page: u32,
        cursor: Option<String>,
    },
    /// Number of listing pages for a page size.
    PageCount { role: ViewerRole, per_page: u32 },
    ByTag {
        role: ViewerRole,
        tag: String,
        per_page: u32,
    },
    Search {
        role: ViewerRole,
        term: String,
        limit: u32,
    },
    Geo {
        role: ViewerRole,
        center: GeoPoint,
        radius_meters: f64,
        limit: u32,
    },
    /// Single plaque looked up by id, title url or legacy id.
    Plaque { role: ViewerRole, key: String },
    Featured { role: ViewerRole },
    /// Footer aggregates: pending count, random plaques and tags, latest comments.
    Chrome { role: ViewerRole },
    Rss,
    ExportAll { detail: ExportDetail },
}

impl CacheKey {
    /// Deterministic string form used as the store key.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Page {
                role,
                per_page,
                cursor,
            } => write!(
                f,
                "page:role={}:per_page={per_page}:cursor={}",
                role.as_str(),
                cursor.as_deref().map(escape).unwrap_or_else(|| "-".into())
            ),
            CacheKey::PageCount { role, per_page } => {
                write!(f, "page_count:role={}:per_page={per_page}", role.as_str())
            }
            CacheKey::ByTag {
                role,
                tag,
                per_page,
            } => write!(
                f,
                "tag:role={}:per_page={per_page}:tag={}",
                role.as_str(),
                escape(tag)
            ),
            CacheKey::Search { role, term, limit } => write!(
                f,
                "search:role={}:limit={limit}:term={}",
                role.as_str(),
                escape(term)
            ),
            CacheKey::Geo {
                role,
                center,
                radius_meters,
                limit,
            } => write!(
                f,
                "geo:role={}:limit={limit}:lat={}:lng={}:radius={radius_meters}",
                role.as_str(),
                center.lat,
                center.lng
            ),
            CacheKey::Plaque { role, key } => {
                write!(f, "plaque:role={}:key={}", role.as_str(), escape(key))
            }
            CacheKey::Featured { role } => write!(f, "featured:role={}", role.as_str()),
            CacheKey::Chrome { role } => write!(f, "chrome:role={}", role.as_str()),
            CacheKey::Rss => f.write_str("rss"),
            CacheKey::ExportAll { detail } => write!(f, "export:detail={}", detail.as_str()),
        }
    }
}

// Free-form segments are percent-encoded so they cannot forge a separator.
fn escape(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}
