use std::sync::Arc;

use crate::application::collaborators::{BlobStore, Notifier, SearchIndex};
use crate::application::repos::{CommentsRepo, FeaturedRepo, PlaquesRepo, PlaquesWriteRepo};
use crate::cache::CacheTrigger;

use super::types::ModerationOptions;

/// Write-side operations: submission, editing, moderation and maintenance.
///
/// Each operation commits its entity write first, then invalidates the
/// derived cache, then runs collaborator follow-ups that may fail quietly.
#[derive(Clone)]
pub struct ModerationService {
    pub(crate) reader: Arc<dyn PlaquesRepo>,
    pub(crate) writer: Arc<dyn PlaquesWriteRepo>,
    pub(crate) comments: Arc<dyn CommentsRepo>,
    pub(crate) featured: Arc<dyn FeaturedRepo>,
    pub(crate) search: Arc<dyn SearchIndex>,
    pub(crate) blobs: Arc<dyn BlobStore>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) cache: Arc<CacheTrigger>,
    pub(crate) options: ModerationOptions,
}

pub struct ModerationDeps {
    pub reader: Arc<dyn PlaquesRepo>,
    pub writer: Arc<dyn PlaquesWriteRepo>,
    pub comments: Arc<dyn CommentsRepo>,
    pub featured: Arc<dyn FeaturedRepo>,
    pub search: Arc<dyn SearchIndex>,
    pub blobs: Arc<dyn BlobStore>,
    pub notifier: Arc<dyn Notifier>,
    pub cache: Arc<CacheTrigger>,
}

impl ModerationService {
    pub fn new(deps: ModerationDeps, options: ModerationOptions) -> Self {
        Self {
            reader: deps.reader,
            writer: deps.writer,
            comments: deps.comments,
            featured: deps.featured,
            search: deps.search,
            blobs: deps.blobs,
            notifier: deps.notifier,
            cache: deps.cache,
            options,
        }
    }
}
