//! Random selection by time-range rejection sampling.
//!
//! A pick draws a whole-second instant uniformly between the earliest and
//! latest approval and takes the first approved plaque strictly after it,
//! retrying on a miss. The result is uniform over elapsed time rather than
//! over plaques: a plaque approved after a long quiet spell is picked more
//! often, and the earliest plaque is only reachable through sub-second
//! remainders. Each pick costs one indexed query instead of a count and an
//! offset scan.

use std::collections::HashSet;

use metrics::histogram;
use rand::Rng;
use rand::seq::IndexedRandom;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::application::repos::RepoError;
use crate::domain::entities::PlaqueRecord;

use super::service::SelectionService;
use super::types::{MAX_PER_PAGE, SelectionError};

/// Attempts per pick, and per tag sweep, before giving up.
pub const SAMPLE_ATTEMPTS: u32 = 100;

pub(crate) const METRIC_RANDOM_SAMPLE_ATTEMPTS: &str = "plaqueboard_random_sample_attempts";

type TimeBounds = (OffsetDateTime, OffsetDateTime);

fn draw_instant((earliest, latest): TimeBounds) -> OffsetDateTime {
    let span = (latest - earliest).whole_seconds().max(0);
    let offset = rand::rng().random_range(0..=span);
    earliest + Duration::seconds(offset)
}

impl SelectionService {
    /// Up to `count` approved plaques from independent picks. Duplicates are
    /// possible and picks that exhaust their attempts are dropped.
    ///
    /// Fails with [`SelectionError::NoPlaquesAvailable`] only when nothing is
    /// approved at all.
    pub async fn random_approved(&self, count: u32) -> Result<Vec<PlaqueRecord>, SelectionError> {
        let bounds = self.approved_bounds().await?;
        let count = count.min(MAX_PER_PAGE);

        let mut picks = Vec::with_capacity(count as usize);
        for _ in 0..count {
            if let Some(plaque) = self.pick_one(bounds).await? {
                picks.push(plaque);
            }
        }
        Ok(picks)
    }

    /// Up to `count` distinct tags, one drawn from each randomly picked plaque.
    pub async fn random_tags(&self, count: u32) -> Result<Vec<String>, SelectionError> {
        let bounds = match self.approved_bounds().await {
            Ok(bounds) => bounds,
            Err(SelectionError::NoPlaquesAvailable) => {
                debug!(target: "plaqueboard::selection", "No approved plaques to draw tags from");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };
        let wanted = count.min(MAX_PER_PAGE) as usize;

        let mut seen = HashSet::new();
        let mut tags = Vec::with_capacity(wanted);
        let mut attempts = 0;
        while tags.len() < wanted && attempts < SAMPLE_ATTEMPTS {
            attempts += 1;
            let Some(plaque) = self.pick_one(bounds).await? else {
                continue;
            };
            let tag = plaque.tags.choose(&mut rand::rng()).cloned();
            if let Some(tag) = tag
                && seen.insert(tag.clone())
            {
                tags.push(tag);
            }
        }
        Ok(tags)
    }

    async fn approved_bounds(&self) -> Result<TimeBounds, SelectionError> {
        self.reader
            .approved_time_bounds()
            .await?
            .ok_or(SelectionError::NoPlaquesAvailable)
    }

    async fn pick_one(&self, bounds: TimeBounds) -> Result<Option<PlaqueRecord>, RepoError> {
        for attempt in 1..=SAMPLE_ATTEMPTS {
            let instant = draw_instant(bounds);
            if let Some(plaque) = self.reader.first_approved_after(instant).await? {
                histogram!(METRIC_RANDOM_SAMPLE_ATTEMPTS).record(f64::from(attempt));
                return Ok(Some(plaque));
            }
        }

        histogram!(METRIC_RANDOM_SAMPLE_ATTEMPTS).record(f64::from(SAMPLE_ATTEMPTS));
        debug!(
            target: "plaqueboard::selection",
            attempts = SAMPLE_ATTEMPTS,
            "Random pick exhausted its attempts"
        );
        Ok(None)
    }
}
