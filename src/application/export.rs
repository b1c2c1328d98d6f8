//! Bulk JSON export of approved plaques.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::repos::{PlaquesRepo, RepoError};
use crate::cache::{CacheKey, DerivedCache};
use crate::domain::entities::PlaqueRecord;
use crate::domain::error::DomainError;
use crate::domain::plaques::{PlaqueRepresentation, parse_export_timestamp};
use crate::domain::types::ExportDetail;

/// Rows fetched per query while walking the approved set.
pub const EXPORT_BLOCK_SIZE: u32 = 1000;
/// Most plaques a single export returns.
pub const EXPORT_CEILING: u64 = 20_000;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct ExportService {
    plaques: Arc<dyn PlaquesRepo>,
    cache: DerivedCache,
}

impl ExportService {
    pub fn new(plaques: Arc<dyn PlaquesRepo>, cache: DerivedCache) -> Self {
        Self { plaques, cache }
    }

    /// Every approved plaque, newest first, up to [`EXPORT_CEILING`].
    pub async fn all(&self, detail: ExportDetail) -> Result<Vec<PlaqueRepresentation>, ExportError> {
        let key = CacheKey::ExportAll { detail };
        let records: Vec<PlaqueRecord> = self
            .cache
            .get_or_compute(&key, || self.collect_approved())
            .await?;
        Ok(represent(&records, detail))
    }

    /// Approved plaques for the given ids, in request order. Ids that do not
    /// parse or do not resolve are dropped.
    pub async fn by_ids(
        &self,
        raw_ids: &str,
        detail: ExportDetail,
    ) -> Result<Vec<PlaqueRepresentation>, ExportError> {
        let ids = parse_id_list(raw_ids);
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut found: HashMap<Uuid, PlaqueRecord> = self
            .plaques
            .find_many(&ids)
            .await?
            .into_iter()
            .filter(|plaque| plaque.approved)
            .map(|plaque| (plaque.id, plaque))
            .collect();
        let records: Vec<PlaqueRecord> = ids.iter().filter_map(|id| found.remove(id)).collect();

        debug!(
            target: "plaqueboard::export",
            requested = ids.len(),
            returned = records.len(),
            "Exported plaques by id"
        );
        Ok(represent(&records, detail))
    }

    /// Approved plaques with `created_on` after the given timestamp.
    pub async fn created_after(
        &self,
        raw_timestamp: &str,
        detail: ExportDetail,
    ) -> Result<Vec<PlaqueRepresentation>, ExportError> {
        let since = parse_export_timestamp(raw_timestamp)?;
        let limit = u32::try_from(EXPORT_CEILING).unwrap_or(u32::MAX);
        let records = self
            .plaques
            .list_approved_created_after(since, limit)
            .await?;
        Ok(represent(&records, detail))
    }

    async fn collect_approved(&self) -> Result<Vec<PlaqueRecord>, ExportError> {
        let mut records = Vec::new();
        let mut offset = 0u64;

        while offset < EXPORT_CEILING {
            let remaining = EXPORT_CEILING - offset;
            let limit = u32::try_from(remaining.min(u64::from(EXPORT_BLOCK_SIZE)))
                .unwrap_or(EXPORT_BLOCK_SIZE);
            let block = self.plaques.list_approved_block(offset, limit).await?;
            let fetched = block.len() as u64;
            records.extend(block);
            offset += fetched;
            if fetched < u64::from(limit) {
                break;
            }
        }

        info!(
            target: "plaqueboard::export",
            exported = records.len(),
            "Collected approved plaques for export"
        );
        Ok(records)
    }
}

fn represent(records: &[PlaqueRecord], detail: ExportDetail) -> Vec<PlaqueRepresentation> {
    records
        .iter()
        .map(|plaque| PlaqueRepresentation::of(plaque, detail))
        .collect()
}

/// Ids separated by commas or whitespace.
pub fn parse_id_list(raw: &str) -> Vec<Uuid> {
    let mut ids = Vec::new();
    for candidate in raw.split(|c: char| c == ',' || c.is_whitespace()) {
        if let Ok(id) = Uuid::parse_str(candidate.trim())
            && !ids.contains(&id)
        {
            ids.push(id);
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_list_skips_garbage_and_repeats() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let raw = format!("{a}, nonsense ,{b}\n{a},,");

        assert_eq!(parse_id_list(&raw), vec![a, b]);
        assert!(parse_id_list("").is_empty());
    }
}
