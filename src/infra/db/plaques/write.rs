use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CreatePlaqueParams, DeletedPlaque, PlaquesWriteRepo, RepoError, UpdatePlaqueParams,
};
use crate::domain::entities::PlaqueRecord;
use crate::domain::plaques::next_write_timestamp;

use super::PostgresRepositories;
use super::types::{PLAQUE_COLUMNS, PlaqueRow, RETURNING_COLUMNS, into_records};
use crate::infra::db::map_sqlx_error;

impl PostgresRepositories {
    /// `created_on` for an approval. Call with the plaqueset lock held so
    /// concurrent approvals observe each other.
    async fn approval_timestamp(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        now: OffsetDateTime,
    ) -> Result<OffsetDateTime, RepoError> {
        let latest: Option<OffsetDateTime> = sqlx::query_scalar(
            "SELECT MAX(created_on) FROM plaques WHERE plaqueset = $1 AND approved",
        )
        .bind(self.plaqueset())
        .fetch_one(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(next_write_timestamp(now, latest))
    }
}

#[async_trait]
impl PlaquesWriteRepo for PostgresRepositories {
    async fn create_plaque(&self, params: CreatePlaqueParams) -> Result<PlaqueRecord, RepoError> {
        let CreatePlaqueParams {
            id,
            title_url,
            old_site_id,
            title,
            description,
            location,
            tags,
            pic,
            img_url,
            approved,
            created_on,
            created_by,
        } = params;

        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        let created_on = if approved {
            self.lock_plaqueset(&mut tx).await?;
            self.approval_timestamp(&mut tx, created_on).await?
        } else {
            created_on
        };

        let sql = format!(
            "INSERT INTO plaques (
                id, plaqueset, title_url, old_site_id, title, description, lat, lng, tags,
                pic, img_url, img_rot, approved, created_on, updated_on, created_by, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 0, $12, $13, $13, $14, $14)
            RETURNING {RETURNING_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PlaqueRow>(&sql)
            .bind(id)
            .bind(self.plaqueset())
            .bind(title_url)
            .bind(old_site_id)
            .bind(title)
            .bind(description)
            .bind(location.lat)
            .bind(location.lng)
            .bind(tags)
            .bind(pic)
            .bind(img_url)
            .bind(approved)
            .bind(created_on)
            .bind(created_by)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(PlaqueRecord::from(row))
    }

    async fn update_plaque(&self, params: UpdatePlaqueParams) -> Result<PlaqueRecord, RepoError> {
        let UpdatePlaqueParams {
            id,
            title_url,
            title,
            description,
            location,
            tags,
            image,
            img_rot,
            old_site_id,
            updated_on,
            updated_by,
        } = params;

        let (pic, img_url) = match image {
            Some(image) => (Some(image.pic), Some(image.img_url)),
            None => (None, None),
        };

        let sql = format!(
            "UPDATE plaques
             SET title = $3,
                 description = $4,
                 lat = $5,
                 lng = $6,
                 tags = $7,
                 pic = COALESCE($8, pic),
                 img_url = COALESCE($9, img_url),
                 img_rot = COALESCE($10, img_rot),
                 old_site_id = $11,
                 updated_on = $12,
                 updated_by = $13,
                 title_url = COALESCE($14, title_url)
             WHERE plaqueset = $1 AND id = $2
             RETURNING {RETURNING_COLUMNS}"
        );
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        let row = sqlx::query_as::<_, PlaqueRow>(&sql)
            .bind(self.plaqueset())
            .bind(id)
            .bind(title)
            .bind(description)
            .bind(location.lat)
            .bind(location.lng)
            .bind(tags)
            .bind(pic)
            .bind(img_url)
            .bind(img_rot)
            .bind(old_site_id)
            .bind(updated_on)
            .bind(updated_by)
            .bind(title_url)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(PlaqueRecord::from(row))
    }

    async fn set_approval(
        &self,
        id: Uuid,
        approved: bool,
        now: OffsetDateTime,
    ) -> Result<PlaqueRecord, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        self.lock_plaqueset(&mut tx).await?;
        let at = self.approval_timestamp(&mut tx, now).await?;

        let sql = format!(
            "UPDATE plaques
             SET approved = $3,
                 created_on = CASE WHEN $3 THEN $4 ELSE created_on END
             WHERE plaqueset = $1 AND id = $2
             RETURNING {RETURNING_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PlaqueRow>(&sql)
            .bind(self.plaqueset())
            .bind(id)
            .bind(approved)
            .bind(at)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(PlaqueRecord::from(row))
    }

    async fn approve_pending(
        &self,
        limit: u32,
        now: OffsetDateTime,
    ) -> Result<Vec<PlaqueRecord>, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        self.lock_plaqueset(&mut tx).await?;
        let at = self.approval_timestamp(&mut tx, now).await?;

        let sql = format!(
            "UPDATE plaques p
             SET approved = TRUE, created_on = $2
             WHERE p.id IN (
                 SELECT id FROM plaques
                 WHERE plaqueset = $1 AND NOT approved
                 ORDER BY created_on ASC, id ASC
                 LIMIT $3
             )
             RETURNING {PLAQUE_COLUMNS}"
        );
        let rows = sqlx::query_as::<_, PlaqueRow>(&sql)
            .bind(self.plaqueset())
            .bind(at)
            .bind(i64::from(limit))
            .fetch_all(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(into_records(rows))
    }

    async fn delete_plaque(&self, id: Uuid) -> Result<DeletedPlaque, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let comments_removed = sqlx::query(
            "DELETE FROM comments c USING plaques p \
             WHERE c.plaque_id = p.id AND p.plaqueset = $1 AND p.id = $2",
        )
        .bind(self.plaqueset())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();

        let sql =
            format!("DELETE FROM plaques WHERE plaqueset = $1 AND id = $2 RETURNING {RETURNING_COLUMNS}");
        let row = sqlx::query_as::<_, PlaqueRow>(&sql)
            .bind(self.plaqueset())
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(DeletedPlaque {
            plaque: PlaqueRecord::from(row),
            comments_removed,
        })
    }

    async fn backfill_updated_on(&self) -> Result<u64, RepoError> {
        let result = sqlx::query(
            "UPDATE plaques SET updated_on = created_on \
             WHERE plaqueset = $1 AND updated_on IS NULL",
        )
        .bind(self.plaqueset())
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn set_title_url(&self, id: Uuid, title_url: &str) -> Result<(), RepoError> {
        let result = sqlx::query("UPDATE plaques SET title_url = $3 WHERE plaqueset = $1 AND id = $2")
            .bind(self.plaqueset())
            .bind(id)
            .bind(title_url)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
