//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::types::{ModerationState, ViewerRole};

/// Latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Result<Self, DomainError> {
        let in_range = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        if !in_range {
            return Err(DomainError::InvalidLocation { lat, lng });
        }
        Ok(Self { lat, lng })
    }

    /// Parse the textual form submitted with a plaque. Both parts must be present.
    pub fn parse(lat: Option<&str>, lng: Option<&str>) -> Result<Self, DomainError> {
        let lat = lat.map(str::trim).filter(|value| !value.is_empty());
        let lng = lng.map(str::trim).filter(|value| !value.is_empty());
        let (Some(lat), Some(lng)) = (lat, lng) else {
            return Err(DomainError::MissingLocation);
        };

        let lat: f64 = lat.parse().map_err(|_| DomainError::MissingLocation)?;
        let lng: f64 = lng.parse().map_err(|_| DomainError::MissingLocation)?;
        Self::new(lat, lng)
    }

    /// Great-circle distance in meters (haversine).
    pub fn distance_meters(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaqueRecord {
    pub id: Uuid,
    pub plaqueset: String,
    pub title_url: Option<String>,
    pub old_site_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub location: GeoPoint,
    pub tags: Vec<String>,
    pub pic: Option<String>,
    pub img_url: Option<String>,
    pub img_rot: i32,
    pub approved: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_on: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_on: Option<OffsetDateTime>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

impl PlaqueRecord {
    pub fn state(&self) -> ModerationState {
        ModerationState::from_approved(self.approved)
    }

    /// Public plaques are the approved ones; admins see everything.
    pub fn is_visible_to(&self, role: ViewerRole) -> bool {
        self.approved || role.is_admin()
    }

    /// Site-relative address of the single-plaque view.
    pub fn title_page_url(&self) -> String {
        match self.title_url.as_deref() {
            Some(title_url) => format!("/plaques/{title_url}"),
            None => format!("/plaques/{}", self.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: Uuid,
    pub plaque_id: Uuid,
    pub text: String,
    pub approved: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_on: OffsetDateTime,
    pub created_by: Option<String>,
}

/// One featuring event. The newest event names the featured plaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturedPlaqueRecord {
    pub id: Uuid,
    pub plaque_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_on: OffsetDateTime,
}
