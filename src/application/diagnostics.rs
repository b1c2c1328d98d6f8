//! Operator counts: comments, plaques, pending and stored images.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::application::collaborators::BlobStore;
use crate::application::repos::{CommentsRepo, PlaqueScope, PlaquesRepo, RepoError};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Counts {
    pub comments: u64,
    pub plaques: u64,
    pub pending: u64,
    /// `None` when the blob store could not be listed.
    pub images: Option<u64>,
    /// Only filled when the orphan scan was requested.
    pub orphaned_images: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct DiagnosticsService {
    plaques: Arc<dyn PlaquesRepo>,
    comments: Arc<dyn CommentsRepo>,
    blobs: Arc<dyn BlobStore>,
}

impl DiagnosticsService {
    pub fn new(
        plaques: Arc<dyn PlaquesRepo>,
        comments: Arc<dyn CommentsRepo>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            plaques,
            comments,
            blobs,
        }
    }

    pub async fn counts(&self, scan_orphans: bool) -> Result<Counts, RepoError> {
        let comments = self.comments.count_comments().await?;
        let plaques = self.plaques.count_plaques(PlaqueScope::Admin).await?;
        let pending = self.plaques.count_pending().await?;

        let stored = match self.blobs.list_paths().await {
            Ok(paths) => Some(paths),
            Err(err) => {
                warn!(
                    target: "plaqueboard::diagnostics",
                    error = %err,
                    "Could not list stored images"
                );
                None
            }
        };
        let images = stored.as_ref().map(|paths| paths.len() as u64);

        let orphaned_images = match (scan_orphans, stored) {
            (true, Some(paths)) => {
                let referenced: HashSet<String> = self.plaques.list_pics().await?.into_iter().collect();
                Some(orphans(paths, &referenced))
            }
            _ => None,
        };

        Ok(Counts {
            comments,
            plaques,
            pending,
            images,
            orphaned_images,
        })
    }
}

fn orphans(stored: Vec<String>, referenced: &HashSet<String>) -> Vec<String> {
    let mut orphaned: Vec<String> = stored
        .into_iter()
        .filter(|path| !referenced.contains(path))
        .collect();
    orphaned.sort();
    orphaned
}
