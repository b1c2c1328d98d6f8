use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{GeoPoint, PlaqueRecord};

/// Column list shared by every plaque query; the table is aliased `p`.
pub(crate) const PLAQUE_COLUMNS: &str = "p.id, p.plaqueset, p.title_url, p.old_site_id, \
    p.title, p.description, p.lat, p.lng, p.tags, p.pic, p.img_url, p.img_rot, p.approved, \
    p.created_on, p.updated_on, p.created_by, p.updated_by";

/// Same columns for `RETURNING` clauses, where the alias is not available.
pub(crate) const RETURNING_COLUMNS: &str = "id, plaqueset, title_url, old_site_id, title, \
    description, lat, lng, tags, pic, img_url, img_rot, approved, created_on, updated_on, \
    created_by, updated_by";

#[derive(sqlx::FromRow)]
pub(crate) struct PlaqueRow {
    pub(crate) id: Uuid,
    pub(crate) plaqueset: String,
    pub(crate) title_url: Option<String>,
    pub(crate) old_site_id: Option<i64>,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) lat: f64,
    pub(crate) lng: f64,
    pub(crate) tags: Vec<String>,
    pub(crate) pic: Option<String>,
    pub(crate) img_url: Option<String>,
    pub(crate) img_rot: i32,
    pub(crate) approved: bool,
    pub(crate) created_on: OffsetDateTime,
    pub(crate) updated_on: Option<OffsetDateTime>,
    pub(crate) created_by: Option<String>,
    pub(crate) updated_by: Option<String>,
}

impl From<PlaqueRow> for PlaqueRecord {
    fn from(row: PlaqueRow) -> Self {
        Self {
            id: row.id,
            plaqueset: row.plaqueset,
            title_url: row.title_url,
            old_site_id: row.old_site_id,
            title: row.title,
            description: row.description,
            // The table's range checks already hold for stored rows.
            location: GeoPoint {
                lat: row.lat,
                lng: row.lng,
            },
            tags: row.tags,
            pic: row.pic,
            img_url: row.img_url,
            img_rot: row.img_rot,
            approved: row.approved,
            created_on: row.created_on,
            updated_on: row.updated_on,
            created_by: row.created_by,
            updated_by: row.updated_by,
        }
    }
}

pub(crate) fn into_records(rows: Vec<PlaqueRow>) -> Vec<PlaqueRecord> {
    rows.into_iter().map(PlaqueRecord::from).collect()
}
