use tracing::debug;
use uuid::Uuid;

use crate::cache::CacheKey;
use crate::domain::entities::PlaqueRecord;
use crate::domain::types::ViewerRole;

use super::service::SelectionService;
use super::types::{Resolved, SelectionError};

impl SelectionService {
    /// Look a plaque up by legacy id, title url or id, in that order.
    ///
    /// An integer key is only tried as a legacy id, and only approved
    /// plaques match it. Admins may reach pending plaques through the other
    /// two forms. When nothing matches the earliest approved plaque is
    /// returned as [`Resolved::Fallback`], so a bad link always lands
    /// somewhere stable.
    pub async fn resolve(&self, key: &str, role: ViewerRole) -> Result<Resolved, SelectionError> {
        let key = key.trim().to_string();
        let cache_key = CacheKey::Plaque {
            role,
            key: key.clone(),
        };
        self.cache
            .get_or_compute(&cache_key, || async move {
                match self.find_for_key(&key, role).await? {
                    Some(plaque) => Ok(Resolved::Found(plaque)),
                    None => {
                        debug!(target: "plaqueboard::selection", key = %key, "Unknown plaque key; serving fallback");
                        self.fallback().await
                    }
                }
            })
            .await
    }

    /// The approved plaque owning `comment_id`, or the fallback.
    pub async fn resolve_comment(&self, comment_id: Uuid) -> Result<Resolved, SelectionError> {
        match self.reader.find_by_comment(comment_id).await? {
            Some(plaque) if plaque.approved => Ok(Resolved::Found(plaque)),
            _ => self.fallback().await,
        }
    }

    /// The plaque named by the most recent featuring event, if the viewer may see it.
    pub async fn featured(&self, role: ViewerRole) -> Result<Option<PlaqueRecord>, SelectionError> {
        let key = CacheKey::Featured { role };
        self.cache
            .get_or_compute(&key, || async move {
                let Some(event) = self.featured.latest_featured().await? else {
                    return Ok::<_, SelectionError>(None);
                };
                let plaque = self.reader.find_by_id(event.plaque_id).await?;
                Ok(plaque.filter(|plaque| plaque.is_visible_to(role)))
            })
            .await
    }

    async fn find_for_key(
        &self,
        key: &str,
        role: ViewerRole,
    ) -> Result<Option<PlaqueRecord>, SelectionError> {
        if key.is_empty() {
            return Ok(None);
        }

        if let Ok(old_site_id) = key.parse::<i64>() {
            let plaque = self.reader.find_by_old_site_id(old_site_id).await?;
            return Ok(plaque.filter(|plaque| plaque.approved));
        }

        if let Some(plaque) = self.reader.find_by_title_url(key).await?
            && plaque.is_visible_to(role)
        {
            return Ok(Some(plaque));
        }

        let Ok(id) = Uuid::parse_str(key) else {
            return Ok(None);
        };
        let plaque = self.reader.find_by_id(id).await?;
        Ok(plaque.filter(|plaque| plaque.is_visible_to(role)))
    }

    async fn fallback(&self) -> Result<Resolved, SelectionError> {
        self.reader
            .earliest_approved()
            .await?
            .map(Resolved::Fallback)
            .ok_or(SelectionError::NoPlaquesAvailable)
    }
}
