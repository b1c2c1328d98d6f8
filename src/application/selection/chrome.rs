use crate::cache::CacheKey;
use crate::domain::types::ViewerRole;

use super::service::SelectionService;
use super::types::{CHROME_ITEMS, ChromeValues, SelectionError};

impl SelectionService {
    /// Footer aggregates, memoized per role. Random picks are frozen until the
    /// next flush, like every other cached value.
    pub async fn chrome(&self, role: ViewerRole) -> Result<ChromeValues, SelectionError> {
        let key = CacheKey::Chrome { role };
        self.cache
            .get_or_compute(&key, || async move {
                let pending_count = if role.is_admin() {
                    Some(self.reader.count_pending().await?)
                } else {
                    None
                };

                let random_plaques = match self.random_approved(CHROME_ITEMS).await {
                    Ok(plaques) => plaques,
                    Err(SelectionError::NoPlaquesAvailable) => Vec::new(),
                    Err(err) => return Err(err),
                };
                let random_tags = self.random_tags(CHROME_ITEMS).await?;
                let latest_comments = self.comments.latest_approved(CHROME_ITEMS).await?;

                Ok(ChromeValues {
                    pending_count,
                    random_plaques,
                    random_tags,
                    latest_comments,
                })
            })
            .await
    }
}
