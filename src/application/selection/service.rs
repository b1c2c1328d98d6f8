use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::application::collaborators::{CollaboratorError, SearchIndex, SearchQuery};
use crate::application::pagination::{PageRequest, PlaqueCursor};
use crate::application::repos::{
    CommentsRepo, FeaturedRepo, PlaqueQueryFilter, PlaqueScope, PlaquesRepo, RepoError,
};
use crate::cache::{CacheKey, DerivedCache};
use crate::domain::entities::{GeoPoint, PlaqueRecord};
use crate::domain::error::DomainError;
use crate::domain::plaques::normalize_tag;
use crate::domain::types::ViewerRole;

use super::types::{MAX_PER_PAGE, PagesSummary, PlaquePage, SelectionError, SelectionOptions};

/// Why a search computation stopped. `Unavailable` is turned into an empty
/// answer only after the cache has declined to store anything.
enum SearchFailure {
    Unavailable(CollaboratorError),
    Selection(SelectionError),
}

impl From<SelectionError> for SearchFailure {
    fn from(err: SelectionError) -> Self {
        Self::Selection(err)
    }
}

impl From<RepoError> for SearchFailure {
    fn from(err: RepoError) -> Self {
        Self::Selection(SelectionError::from(err))
    }
}

/// Read-side operations: listings, lookups, search hydration and sampling.
#[derive(Clone)]
pub struct SelectionService {
    pub(crate) reader: Arc<dyn PlaquesRepo>,
    pub(crate) comments: Arc<dyn CommentsRepo>,
    pub(crate) featured: Arc<dyn FeaturedRepo>,
    pub(crate) search: Arc<dyn SearchIndex>,
    pub(crate) cache: DerivedCache,
    pub(crate) options: SelectionOptions,
}

impl SelectionService {
    pub fn new(
        reader: Arc<dyn PlaquesRepo>,
        comments: Arc<dyn CommentsRepo>,
        featured: Arc<dyn FeaturedRepo>,
        search: Arc<dyn SearchIndex>,
        cache: DerivedCache,
        options: SelectionOptions,
    ) -> Self {
        Self {
            reader,
            comments,
            featured,
            search,
            cache,
            options,
        }
    }

    pub fn options(&self) -> SelectionOptions {
        self.options
    }

    pub(crate) fn per_page(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.options.default_per_page)
            .clamp(1, MAX_PER_PAGE)
    }

    /// Approved plaques, newest approval first, continuing after `cursor`.
    pub async fn page_approved(
        &self,
        role: ViewerRole,
        per_page: Option<u32>,
        cursor: Option<&str>,
    ) -> Result<PlaquePage, SelectionError> {
        let per_page = self.per_page(per_page);
        let cursor = cursor.map(str::trim).filter(|value| !value.is_empty());
        let decoded = cursor.map(PlaqueCursor::decode).transpose()?;

        let key = CacheKey::Page {
            role,
            per_page,
            cursor: cursor.map(str::to_string),
        };
        self.cache
            .get_or_compute(&key, || async move {
                let page = self
                    .reader
                    .list_plaques(
                        PlaqueScope::Public,
                        &PlaqueQueryFilter::default(),
                        PageRequest::new(per_page, decoded),
                    )
                    .await
                    .map_err(SelectionError::from_repo)?;
                let has_more = page.has_more();
                Ok::<_, SelectionError>(PlaquePage {
                    plaques: page.items,
                    next_cursor: page.next_cursor,
                    has_more,
                })
            })
            .await
    }

    pub async fn pages_summary(
        &self,
        role: ViewerRole,
        per_page: Option<u32>,
    ) -> Result<PagesSummary, SelectionError> {
        let per_page = self.per_page(per_page);
        let key = CacheKey::PageCount { role, per_page };
        self.cache
            .get_or_compute(&key, || async move {
                let total = self.reader.count_plaques(PlaqueScope::Public).await?;
                Ok::<_, SelectionError>(PagesSummary::new(per_page, total))
            })
            .await
    }

    /// Plaques carrying exactly `tag` after normalization. Admins also see
    /// pending plaques.
    pub async fn by_tag(
        &self,
        role: ViewerRole,
        tag: &str,
        per_page: Option<u32>,
    ) -> Result<Vec<PlaqueRecord>, SelectionError> {
        let Some(tag) = normalize_tag(tag) else {
            return Ok(Vec::new());
        };
        let per_page = self.per_page(per_page);

        let key = CacheKey::ByTag {
            role,
            tag: tag.clone(),
            per_page,
        };
        self.cache
            .get_or_compute(&key, || async move {
                let filter = PlaqueQueryFilter { tag: Some(tag) };
                let page = self
                    .reader
                    .list_plaques(
                        PlaqueScope::for_role(role),
                        &filter,
                        PageRequest::new(per_page, None),
                    )
                    .await?;
                Ok::<_, SelectionError>(page.items)
            })
            .await
    }

    /// Free-text phrase search. An empty term matches nothing.
    pub async fn by_search_term(
        &self,
        role: ViewerRole,
        term: &str,
        limit: Option<u32>,
    ) -> Result<Vec<PlaqueRecord>, SelectionError> {
        let Some(query) = SearchQuery::phrase(term) else {
            return Ok(Vec::new());
        };
        let limit = self.per_page(limit);

        let key = CacheKey::Search {
            role,
            term: query.to_string(),
            limit,
        };
        let result = self
            .cache
            .get_or_compute(&key, || async {
                let plaques = self.search_and_hydrate(&query, limit).await?;
                Ok::<Vec<PlaqueRecord>, SearchFailure>(
                    plaques
                        .into_iter()
                        .filter(|plaque| plaque.is_visible_to(role))
                        .collect(),
                )
            })
            .await;
        degrade_unavailable(&query, result)
    }

    /// Approved plaques within `radius_meters` of a point, as ranked by the index.
    pub async fn by_geo(
        &self,
        role: ViewerRole,
        lat: f64,
        lng: f64,
        radius_meters: f64,
        limit: Option<u32>,
    ) -> Result<Vec<PlaqueRecord>, SelectionError> {
        let center = GeoPoint::new(lat, lng)?;
        if !radius_meters.is_finite() || radius_meters <= 0.0 {
            return Err(DomainError::validation("search radius must be a positive number").into());
        }
        let limit = self.per_page(limit);

        let key = CacheKey::Geo {
            role,
            center,
            radius_meters,
            limit,
        };
        let query = SearchQuery::within(center, radius_meters);
        let result = self
            .cache
            .get_or_compute(&key, || async {
                let plaques = self.search_and_hydrate(&query, limit).await?;
                // The index knows nothing about moderation.
                Ok::<Vec<PlaqueRecord>, SearchFailure>(
                    plaques.into_iter().filter(|plaque| plaque.approved).collect(),
                )
            })
            .await;
        degrade_unavailable(&query, result)
    }

    /// Run a search and load the hits in index order. Ids that no longer
    /// resolve are dropped.
    async fn search_and_hydrate(
        &self,
        query: &SearchQuery,
        limit: u32,
    ) -> Result<Vec<PlaqueRecord>, SearchFailure> {
        let ids = self
            .search
            .search(&query.to_string(), limit)
            .await
            .map_err(SearchFailure::Unavailable)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut found: HashMap<Uuid, PlaqueRecord> = self
            .reader
            .find_many(&ids)
            .await?
            .into_iter()
            .map(|plaque| (plaque.id, plaque))
            .collect();

        Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
    }

    /// Oldest pending plaques, `limit` defaulting to the preview size.
    pub async fn pending(&self, limit: Option<u32>) -> Result<Vec<PlaqueRecord>, SelectionError> {
        let limit = limit
            .unwrap_or(self.options.pending_preview)
            .clamp(1, MAX_PER_PAGE);
        Ok(self.reader.list_pending(limit).await?)
    }

    pub async fn next_pending(&self) -> Result<Option<PlaqueRecord>, SelectionError> {
        Ok(self.reader.list_pending(1).await?.into_iter().next())
    }
}

/// An unreachable index answers with no hits. The empty answer is not cached,
/// so the next read asks the index again.
fn degrade_unavailable(
    query: &SearchQuery,
    result: Result<Vec<PlaqueRecord>, SearchFailure>,
) -> Result<Vec<PlaqueRecord>, SelectionError> {
    match result {
        Ok(plaques) => Ok(plaques),
        Err(SearchFailure::Selection(err)) => Err(err),
        Err(SearchFailure::Unavailable(err)) => {
            warn!(
                target: "plaqueboard::selection",
                query = %query,
                error = %err,
                "Search index unavailable; returning no results"
            );
            Ok(Vec::new())
        }
    }
}
