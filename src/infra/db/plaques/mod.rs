mod types;
mod write;

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{CursorPage, PageRequest, PlaqueCursor};
use crate::application::repos::{PlaqueQueryFilter, PlaqueScope, PlaquesRepo, RepoError};
use crate::domain::entities::PlaqueRecord;

use super::PostgresRepositories;
use crate::infra::db::map_sqlx_error;
use types::{PLAQUE_COLUMNS, PlaqueRow, into_records};

impl PostgresRepositories {
    /// Plaques of this plaqueset matching `condition`, in `order`.
    async fn fetch_plaques(
        &self,
        condition: &str,
        order: &str,
        limit: u32,
    ) -> Result<Vec<PlaqueRecord>, RepoError> {
        let sql = format!(
            "SELECT {PLAQUE_COLUMNS} FROM plaques p \
             WHERE p.plaqueset = $1 AND {condition} ORDER BY {order} LIMIT $2"
        );
        let rows = sqlx::query_as::<_, PlaqueRow>(&sql)
            .bind(self.plaqueset())
            .bind(i64::from(limit))
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(into_records(rows))
    }

    async fn fetch_one_plaque(
        &self,
        condition: &str,
        bind: impl for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send + 'static,
    ) -> Result<Option<PlaqueRecord>, RepoError> {
        let sql = format!(
            "SELECT {PLAQUE_COLUMNS} FROM plaques p WHERE p.plaqueset = $1 AND {condition}"
        );
        let row = sqlx::query_as::<_, PlaqueRow>(&sql)
            .bind(self.plaqueset())
            .bind(bind)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(PlaqueRecord::from))
    }
}

#[async_trait]
impl PlaquesRepo for PostgresRepositories {
    async fn list_plaques(
        &self,
        scope: PlaqueScope,
        filter: &PlaqueQueryFilter,
        page: PageRequest<PlaqueCursor>,
    ) -> Result<CursorPage<PlaqueRecord>, RepoError> {
        let limit = page.limit.clamp(1, 100) as i64;

        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(PLAQUE_COLUMNS);
        qb.push(" FROM plaques p WHERE p.plaqueset = ");
        qb.push_bind(self.plaqueset());

        Self::apply_scope_conditions(&mut qb, scope);
        Self::apply_filter(&mut qb, filter);

        if let Some(cursor) = page.cursor {
            qb.push(" AND (p.created_on, p.id) < (");
            qb.push_bind(cursor.created_on());
            qb.push(", ");
            qb.push_bind(cursor.id());
            qb.push(")");
        }

        qb.push(" ORDER BY p.created_on DESC, p.id DESC LIMIT ");
        qb.push_bind(limit + 1);

        let mut rows = qb
            .build_query_as::<PlaqueRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let has_more = (rows.len() as i64) > limit;
        if has_more {
            rows.pop();
        }

        let next_cursor = match rows.last() {
            Some(last) if has_more => Some(PlaqueCursor::new(last.created_on, last.id).encode()),
            _ => None,
        };

        Ok(CursorPage::new(into_records(rows), next_cursor))
    }

    async fn count_plaques(&self, scope: PlaqueScope) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM plaques p WHERE p.plaqueset = ");
        qb.push_bind(self.plaqueset());
        Self::apply_scope_conditions(&mut qb, scope);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn count_pending(&self) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM plaques WHERE plaqueset = $1 AND NOT approved",
        )
        .bind(self.plaqueset())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PlaqueRecord>, RepoError> {
        self.fetch_one_plaque("p.id = $2", id).await
    }

    async fn find_by_title_url(&self, title_url: &str) -> Result<Option<PlaqueRecord>, RepoError> {
        self.fetch_one_plaque("p.title_url = $2", title_url.to_string())
            .await
    }

    async fn find_by_old_site_id(
        &self,
        old_site_id: i64,
    ) -> Result<Option<PlaqueRecord>, RepoError> {
        self.fetch_one_plaque("p.old_site_id = $2", old_site_id)
            .await
    }

    async fn find_by_comment(&self, comment_id: Uuid) -> Result<Option<PlaqueRecord>, RepoError> {
        self.fetch_one_plaque(
            "p.id = (SELECT c.plaque_id FROM comments c WHERE c.id = $2)",
            comment_id,
        )
        .await
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<PlaqueRecord>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {PLAQUE_COLUMNS} FROM plaques p WHERE p.plaqueset = $1 AND p.id = ANY($2)"
        );
        let rows = sqlx::query_as::<_, PlaqueRow>(&sql)
            .bind(self.plaqueset())
            .bind(ids)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(into_records(rows))
    }

    async fn approved_time_bounds(
        &self,
    ) -> Result<Option<(OffsetDateTime, OffsetDateTime)>, RepoError> {
        let (earliest, latest): (Option<OffsetDateTime>, Option<OffsetDateTime>) = sqlx::query_as(
            "SELECT MIN(created_on), MAX(created_on) FROM plaques \
             WHERE plaqueset = $1 AND approved",
        )
        .bind(self.plaqueset())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(earliest.zip(latest))
    }

    async fn first_approved_after(
        &self,
        instant: OffsetDateTime,
    ) -> Result<Option<PlaqueRecord>, RepoError> {
        let sql = format!(
            "SELECT {PLAQUE_COLUMNS} FROM plaques p \
             WHERE p.plaqueset = $1 AND p.approved AND p.created_on > $2 \
             ORDER BY p.created_on ASC, p.id ASC LIMIT 1"
        );
        let row = sqlx::query_as::<_, PlaqueRow>(&sql)
            .bind(self.plaqueset())
            .bind(instant)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(PlaqueRecord::from))
    }

    async fn earliest_approved(&self) -> Result<Option<PlaqueRecord>, RepoError> {
        let mut plaques = self
            .fetch_plaques("p.approved", "p.created_on ASC, p.id ASC", 1)
            .await?;
        Ok(plaques.pop())
    }

    async fn list_pending(&self, limit: u32) -> Result<Vec<PlaqueRecord>, RepoError> {
        self.fetch_plaques("NOT p.approved", "p.created_on ASC, p.id ASC", limit)
            .await
    }

    async fn list_approved_block(
        &self,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<PlaqueRecord>, RepoError> {
        let sql = format!(
            "SELECT {PLAQUE_COLUMNS} FROM plaques p \
             WHERE p.plaqueset = $1 AND p.approved \
             ORDER BY p.created_on DESC, p.id DESC OFFSET $2 LIMIT $3"
        );
        let rows = sqlx::query_as::<_, PlaqueRow>(&sql)
            .bind(self.plaqueset())
            .bind(Self::convert_offset(offset)?)
            .bind(i64::from(limit))
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(into_records(rows))
    }

    async fn list_approved_created_after(
        &self,
        since: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<PlaqueRecord>, RepoError> {
        let sql = format!(
            "SELECT {PLAQUE_COLUMNS} FROM plaques p \
             WHERE p.plaqueset = $1 AND p.approved AND p.created_on > $2 \
             ORDER BY p.created_on DESC, p.id DESC LIMIT $3"
        );
        let rows = sqlx::query_as::<_, PlaqueRow>(&sql)
            .bind(self.plaqueset())
            .bind(since)
            .bind(i64::from(limit))
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(into_records(rows))
    }

    async fn list_all_block(
        &self,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<PlaqueRecord>, RepoError> {
        let sql = format!(
            "SELECT {PLAQUE_COLUMNS} FROM plaques p WHERE p.plaqueset = $1 \
             ORDER BY p.created_on ASC, p.id ASC OFFSET $2 LIMIT $3"
        );
        let rows = sqlx::query_as::<_, PlaqueRow>(&sql)
            .bind(self.plaqueset())
            .bind(Self::convert_offset(offset)?)
            .bind(i64::from(limit))
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(into_records(rows))
    }

    async fn list_missing_title_url(&self, limit: u32) -> Result<Vec<PlaqueRecord>, RepoError> {
        self.fetch_plaques("p.title_url IS NULL", "p.created_on ASC, p.id ASC", limit)
            .await
    }

    async fn list_pics(&self) -> Result<Vec<String>, RepoError> {
        sqlx::query_scalar("SELECT pic FROM plaques WHERE plaqueset = $1 AND pic IS NOT NULL")
            .bind(self.plaqueset())
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn title_url_taken(
        &self,
        title_url: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, RepoError> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM plaques WHERE plaqueset = $1 AND title_url = $2 \
             AND ($3::uuid IS NULL OR id <> $3))",
        )
        .bind(self.plaqueset())
        .bind(title_url)
        .bind(exclude)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
