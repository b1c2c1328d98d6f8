//! Search index collaborator backed by the `search_documents` table.
//!
//! Phrase queries use Postgres full-text search. Distance queries prefilter
//! on a bounding box and then apply the haversine distance exactly.

use async_trait::async_trait;
use uuid::Uuid;

use crate::application::collaborators::{
    CollaboratorError, SearchDocument, SearchIndex, SearchQuery,
};
use crate::domain::entities::GeoPoint;

use super::PostgresRepositories;

// Under the true degree length, so the box always covers the circle.
const METERS_PER_DEGREE: f64 = 110_000.0;

fn search_error(err: sqlx::Error) -> CollaboratorError {
    CollaboratorError::Search(err.to_string())
}

/// Latitude and longitude half-widths of a box enclosing the circle.
fn bounding_box(center: GeoPoint, radius_meters: f64) -> (f64, f64) {
    let lat_delta = radius_meters / METERS_PER_DEGREE;
    let cos_lat = center.lat.to_radians().cos();
    let lng_delta = if cos_lat <= f64::EPSILON {
        180.0
    } else {
        (radius_meters / (METERS_PER_DEGREE * cos_lat)).min(180.0)
    };
    (lat_delta, lng_delta)
}

impl PostgresRepositories {
    async fn search_phrase(&self, phrase: &str, limit: u32) -> Result<Vec<Uuid>, CollaboratorError> {
        sqlx::query_scalar(
            "SELECT doc_id FROM search_documents
             WHERE plaqueset = $1 AND document @@ phraseto_tsquery('simple', $2)
             ORDER BY ts_rank(document, phraseto_tsquery('simple', $2)) DESC, created_on DESC
             LIMIT $3",
        )
        .bind(self.plaqueset())
        .bind(phrase)
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(search_error)
    }

    async fn search_within(
        &self,
        center: GeoPoint,
        radius_meters: f64,
        limit: u32,
    ) -> Result<Vec<Uuid>, CollaboratorError> {
        let (lat_delta, lng_delta) = bounding_box(center, radius_meters);
        let candidates: Vec<(Uuid, f64, f64)> = sqlx::query_as(
            "SELECT doc_id, lat, lng FROM search_documents
             WHERE plaqueset = $1
               AND lat BETWEEN $2 AND $3
               AND (lng BETWEEN $4 AND $5 OR $6)",
        )
        .bind(self.plaqueset())
        .bind(center.lat - lat_delta)
        .bind(center.lat + lat_delta)
        .bind(center.lng - lng_delta)
        .bind(center.lng + lng_delta)
        // Boxes crossing the antimeridian fall back to the latitude band.
        .bind(center.lng - lng_delta < -180.0 || center.lng + lng_delta > 180.0)
        .fetch_all(self.pool())
        .await
        .map_err(search_error)?;

        let mut hits: Vec<(f64, Uuid)> = candidates
            .into_iter()
            .map(|(doc_id, lat, lng)| (center.distance_meters(&GeoPoint { lat, lng }), doc_id))
            .filter(|(distance, _)| *distance < radius_meters)
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(hits
            .into_iter()
            .take(limit as usize)
            .map(|(_, doc_id)| doc_id)
            .collect())
    }
}

#[async_trait]
impl SearchIndex for PostgresRepositories {
    async fn put(&self, document: SearchDocument) -> Result<(), CollaboratorError> {
        let body = format!("{} {}", document.description, document.tags.join(" "));
        sqlx::query(
            "INSERT INTO search_documents (doc_id, plaqueset, title, body, lat, lng, created_on)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (doc_id) DO UPDATE
             SET title = EXCLUDED.title,
                 body = EXCLUDED.body,
                 lat = EXCLUDED.lat,
                 lng = EXCLUDED.lng,
                 created_on = EXCLUDED.created_on",
        )
        .bind(document.doc_id)
        .bind(self.plaqueset())
        .bind(document.title)
        .bind(body)
        .bind(document.location.lat)
        .bind(document.location.lng)
        .bind(document.created_on)
        .execute(self.pool())
        .await
        .map_err(search_error)?;
        Ok(())
    }

    async fn delete(&self, doc_id: Uuid) -> Result<(), CollaboratorError> {
        sqlx::query("DELETE FROM search_documents WHERE plaqueset = $1 AND doc_id = $2")
            .bind(self.plaqueset())
            .bind(doc_id)
            .execute(self.pool())
            .await
            .map_err(search_error)?;
        Ok(())
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Uuid>, CollaboratorError> {
        match SearchQuery::parse(query)? {
            SearchQuery::Phrase(phrase) => self.search_phrase(&phrase, limit).await,
            SearchQuery::Within {
                center,
                radius_meters,
            } => self.search_within(center, radius_meters, limit).await,
        }
    }

    async fn clear(&self) -> Result<u64, CollaboratorError> {
        let result = sqlx::query("DELETE FROM search_documents WHERE plaqueset = $1")
            .bind(self.plaqueset())
            .execute(self.pool())
            .await
            .map_err(search_error)?;
        Ok(result.rows_affected())
    }
}
