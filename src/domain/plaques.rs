//! Plaque content rules and JSON representations.

use std::collections::HashSet;

use serde::Serialize;
use time::{
    Duration, OffsetDateTime, PrimitiveDateTime, format_description::well_known::Rfc3339,
    macros::format_description,
};
use uuid::Uuid;

use crate::domain::entities::{GeoPoint, PlaqueRecord};
use crate::domain::error::DomainError;
use crate::domain::types::ExportDetail;

/// Maximum number of characters kept from a submitted title.
pub const TITLE_MAX_CHARS: usize = 1500;

/// Partition every plaque belongs to unless configured otherwise.
pub const DEFAULT_PLAQUESET: &str = "public";

/// Split a comma-separated tag string into normalized tags.
///
/// Each tag is trimmed, lower-cased and has internal whitespace collapsed to a
/// single space. Empty entries and repeats are dropped; first occurrence wins.
pub fn normalize_tags(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split(',')
        .filter_map(normalize_tag)
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

/// Normalize a single tag, returning `None` when nothing remains.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let collapsed = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Bound a title to [`TITLE_MAX_CHARS`] characters.
pub fn truncate_title(title: &str) -> String {
    let trimmed = title.trim();
    match trimmed.char_indices().nth(TITLE_MAX_CHARS) {
        Some((cut, _)) => trimmed[..cut].to_string(),
        None => trimmed.to_string(),
    }
}

/// Parse a legacy site id. Anything that is not an integer is ignored.
pub fn parse_old_site_id(raw: Option<&str>) -> Option<i64> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| value.parse().ok())
}

/// Parse the `updated_on` export cursor.
///
/// Accepts `YYYY-MM-DD HH:MM:SS[.ffffff]` (interpreted as UTC) and RFC 3339.
pub fn parse_export_timestamp(raw: &str) -> Result<OffsetDateTime, DomainError> {
    let input = raw.trim();
    let with_fraction =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]");
    let without_fraction = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

    if let Ok(value) = PrimitiveDateTime::parse(input, with_fraction) {
        return Ok(value.assume_utc());
    }
    if let Ok(value) = PrimitiveDateTime::parse(input, without_fraction) {
        return Ok(value.assume_utc());
    }
    OffsetDateTime::parse(input, &Rfc3339).map_err(|_| DomainError::MalformedTimestamp {
        input: input.to_string(),
    })
}

/// Blob path for an uploaded image: `YYYYMMDD/HHMMSS/<upload>/<name>`.
///
/// The per-upload segment keeps two uploads of the same file name in the same
/// second from sharing a blob.
pub fn image_blob_path(
    now: OffsetDateTime,
    upload: Uuid,
    file_name: &str,
) -> Result<String, DomainError> {
    let name = file_name
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .ok_or(DomainError::MissingImage)?;

    let stamp = format_description!("[year][month][day]/[hour][minute][second]");
    let prefix = now
        .format(stamp)
        .map_err(|err| DomainError::invariant(format!("failed to format blob path: {err}")))?;
    Ok(format!("{prefix}/{}/{name}", upload.simple()))
}

/// Timestamp for a write that must sort strictly after `previous`, at the
/// microsecond precision the store keeps.
pub fn next_write_timestamp(now: OffsetDateTime, previous: Option<OffsetDateTime>) -> OffsetDateTime {
    let now = truncate_to_micros(now);
    match previous {
        Some(previous) if truncate_to_micros(previous) >= now => {
            truncate_to_micros(previous) + Duration::microseconds(1)
        }
        _ => now,
    }
}

fn truncate_to_micros(value: OffsetDateTime) -> OffsetDateTime {
    value
        .replace_nanosecond(value.nanosecond() / 1_000 * 1_000)
        .unwrap_or(value)
}

/// Compact representation used by listings and bulk exports.
#[derive(Debug, Clone, Serialize)]
pub struct PlaqueSummary {
    pub id: Uuid,
    pub title: String,
    pub title_url: Option<String>,
    pub title_page_url: String,
    pub location: GeoPoint,
    pub tags: Vec<String>,
    pub img_url: Option<String>,
    pub img_rot: i32,
    pub approved: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_on: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_on: Option<OffsetDateTime>,
}

/// Full representation, including the description and provenance fields.
#[derive(Debug, Clone, Serialize)]
pub struct PlaqueFull {
    #[serde(flatten)]
    pub summary: PlaqueSummary,
    pub plaqueset: String,
    pub description: String,
    pub old_site_id: Option<i64>,
    pub pic: Option<String>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

impl From<&PlaqueRecord> for PlaqueSummary {
    fn from(plaque: &PlaqueRecord) -> Self {
        Self {
            id: plaque.id,
            title: plaque.title.clone(),
            title_url: plaque.title_url.clone(),
            title_page_url: plaque.title_page_url(),
            location: plaque.location,
            tags: plaque.tags.clone(),
            img_url: plaque.img_url.clone(),
            img_rot: plaque.img_rot,
            approved: plaque.approved,
            created_on: plaque.created_on,
            updated_on: plaque.updated_on,
        }
    }
}

impl From<&PlaqueRecord> for PlaqueFull {
    fn from(plaque: &PlaqueRecord) -> Self {
        Self {
            summary: PlaqueSummary::from(plaque),
            plaqueset: plaque.plaqueset.clone(),
            description: plaque.description.clone(),
            old_site_id: plaque.old_site_id,
            pic: plaque.pic.clone(),
            created_by: plaque.created_by.clone(),
            updated_by: plaque.updated_by.clone(),
        }
    }
}

/// A plaque rendered at the requested level of detail.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PlaqueRepresentation {
    Summary(PlaqueSummary),
    Full(PlaqueFull),
}

impl PlaqueRepresentation {
    pub fn of(plaque: &PlaqueRecord, detail: ExportDetail) -> Self {
        match detail {
            ExportDetail::Summary => Self::Summary(PlaqueSummary::from(plaque)),
            ExportDetail::Full => Self::Full(PlaqueFull::from(plaque)),
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::Summary(summary) => summary.id,
            Self::Full(full) => full.summary.id,
        }
    }
}
