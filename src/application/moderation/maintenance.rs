use tracing::{info, warn};
use uuid::Uuid;

use crate::application::collaborators::SearchDocument;

use super::service::ModerationService;
use super::types::{BackfillReport, ModerationError, REINDEX_BATCH_SIZE, ReindexReport};

impl ModerationService {
    /// Rebuild the search index from the entity store.
    pub async fn reindex_all(&self) -> Result<ReindexReport, ModerationError> {
        let cleared = self.search.clear().await?;
        info!(target: "plaqueboard::moderation", cleared, "Cleared search index");

        let mut report = ReindexReport::default();
        let mut offset = 0u64;
        loop {
            let batch = self
                .reader
                .list_all_block(offset, REINDEX_BATCH_SIZE)
                .await?;
            let fetched = batch.len() as u64;
            if fetched == 0 {
                break;
            }

            report.put += 1;
            for plaque in &batch {
                match self.search.put(SearchDocument::from(plaque)).await {
                    Ok(()) => report.good += 1,
                    Err(err) => {
                        report.failed += 1;
                        warn!(
                            target: "plaqueboard::moderation",
                            plaque_id = %plaque.id,
                            error = %err,
                            "Search index rejected document"
                        );
                    }
                }
            }

            offset += fetched;
            if fetched < u64::from(REINDEX_BATCH_SIZE) {
                break;
            }
        }

        info!(
            target: "plaqueboard::moderation",
            good = report.good,
            failed = report.failed,
            put = report.put,
            "Reindexed plaques"
        );
        Ok(report)
    }

    /// Remove a single search document. Unlike the cleanup after a delete,
    /// failures are reported to the caller.
    pub async fn delete_search_doc(&self, doc_id: Uuid) -> Result<(), ModerationError> {
        self.search.delete(doc_id).await?;
        info!(target: "plaqueboard::moderation", doc_id = %doc_id, "Deleted search document");
        Ok(())
    }

    /// Fill missing `updated_on` values and assign missing `title_url`s.
    pub async fn backfill(&self) -> Result<BackfillReport, ModerationError> {
        let mut report = BackfillReport {
            updated_on: self.writer.backfill_updated_on().await?,
            title_urls: 0,
        };

        loop {
            let missing = self
                .reader
                .list_missing_title_url(REINDEX_BATCH_SIZE)
                .await?;
            if missing.is_empty() {
                break;
            }

            let mut assigned = 0u64;
            for plaque in &missing {
                let title_url = self
                    .title_url_or_fallback(&plaque.title, plaque.id, Some(plaque.id))
                    .await?;
                self.writer.set_title_url(plaque.id, &title_url).await?;
                assigned += 1;
            }

            report.title_urls += assigned;
            if assigned == 0 {
                break;
            }
        }

        info!(
            target: "plaqueboard::moderation",
            updated_on = report.updated_on,
            title_urls = report.title_urls,
            "Backfill finished"
        );

        let touched = report.updated_on + report.title_urls;
        if touched > 0 {
            self.cache.backfilled(touched).await;
        }
        Ok(report)
    }

    /// Drop every derived cache entry.
    pub async fn flush_cache(&self) {
        info!(target: "plaqueboard::moderation", "Manual cache flush requested");
        self.cache.manual_flush().await;
    }
}
