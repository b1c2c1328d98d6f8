//! Best-effort follow-ups that run after the primary write has committed.
//! Failures are logged and counted, never returned.

use metrics::counter;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::collaborators::SearchDocument;
use crate::domain::entities::PlaqueRecord;

use super::service::ModerationService;

pub(crate) const METRIC_CLEANUP_FAILURE_TOTAL: &str = "plaqueboard_cleanup_failure_total";

impl ModerationService {
    pub(crate) async fn index_plaque(&self, plaque: &PlaqueRecord) {
        if let Err(err) = self.search.put(SearchDocument::from(plaque)).await {
            counter!(METRIC_CLEANUP_FAILURE_TOTAL, "collaborator" => "search", "op" => "put")
                .increment(1);
            warn!(
                target: "plaqueboard::moderation",
                plaque_id = %plaque.id,
                error = %err,
                "Failed to index plaque"
            );
        }
    }

    pub(crate) async fn unindex_plaque(&self, plaque_id: Uuid) {
        if let Err(err) = self.search.delete(plaque_id).await {
            counter!(METRIC_CLEANUP_FAILURE_TOTAL, "collaborator" => "search", "op" => "delete")
                .increment(1);
            warn!(
                target: "plaqueboard::moderation",
                plaque_id = %plaque_id,
                error = %err,
                "Failed to remove search document"
            );
        }
    }

    pub(crate) async fn discard_blob(&self, path: &str) {
        match self.blobs.delete(path).await {
            Ok(()) => debug!(target: "plaqueboard::moderation", path, "Deleted stored image"),
            Err(err) => {
                counter!(METRIC_CLEANUP_FAILURE_TOTAL, "collaborator" => "blob", "op" => "delete")
                    .increment(1);
                warn!(
                    target: "plaqueboard::moderation",
                    path,
                    error = %err,
                    "Failed to delete stored image"
                );
            }
        }
    }

    pub(crate) async fn notify_admin(&self, subject: &str, body: &str) {
        let Some(recipient) = self.options.admin_recipient.as_deref() else {
            return;
        };
        if let Err(err) = self.notifier.send(recipient, subject, body).await {
            counter!(METRIC_CLEANUP_FAILURE_TOTAL, "collaborator" => "notifier", "op" => "send")
                .increment(1);
            warn!(
                target: "plaqueboard::moderation",
                subject,
                error = %err,
                "Failed to notify admin"
            );
        }
    }

    pub(crate) fn plaque_link(&self, plaque: &PlaqueRecord) -> String {
        format!(
            "{}{}",
            self.options.public_base_url.trim_end_matches('/'),
            plaque.title_page_url()
        )
    }
}
