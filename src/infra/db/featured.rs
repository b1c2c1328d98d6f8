use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{FeaturedRepo, RepoError};
use crate::domain::entities::FeaturedPlaqueRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct FeaturedRow {
    id: Uuid,
    plaque_id: Uuid,
    created_on: OffsetDateTime,
}

impl From<FeaturedRow> for FeaturedPlaqueRecord {
    fn from(row: FeaturedRow) -> Self {
        Self {
            id: row.id,
            plaque_id: row.plaque_id,
            created_on: row.created_on,
        }
    }
}

#[async_trait]
impl FeaturedRepo for PostgresRepositories {
    async fn append_featured(
        &self,
        plaque_id: Uuid,
        at: OffsetDateTime,
    ) -> Result<FeaturedPlaqueRecord, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        self.lock_plaqueset(&mut tx).await?;

        let row = sqlx::query_as::<_, FeaturedRow>(
            "INSERT INTO featured_plaques (id, plaqueset, plaque_id, created_on)
             SELECT $1, p.plaqueset, p.id, $4 FROM plaques p
             WHERE p.plaqueset = $2 AND p.id = $3
             RETURNING id, plaque_id, created_on",
        )
        .bind(Uuid::new_v4())
        .bind(self.plaqueset())
        .bind(plaque_id)
        .bind(at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(FeaturedPlaqueRecord::from(row))
    }

    async fn latest_featured(&self) -> Result<Option<FeaturedPlaqueRecord>, RepoError> {
        let row = sqlx::query_as::<_, FeaturedRow>(
            "SELECT id, plaque_id, created_on FROM featured_plaques
             WHERE plaqueset = $1
             ORDER BY created_on DESC, id DESC
             LIMIT 1",
        )
        .bind(self.plaqueset())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(FeaturedPlaqueRecord::from))
    }
}
