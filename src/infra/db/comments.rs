use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{CommentsRepo, CreateCommentParams, RepoError};
use crate::domain::entities::CommentRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    plaque_id: Uuid,
    text: String,
    approved: bool,
    created_on: OffsetDateTime,
    created_by: Option<String>,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            plaque_id: row.plaque_id,
            text: row.text,
            approved: row.approved,
            created_on: row.created_on,
            created_by: row.created_by,
        }
    }
}

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn add_comment(&self, params: CreateCommentParams) -> Result<CommentRecord, RepoError> {
        let CreateCommentParams {
            plaque_id,
            text,
            approved,
            created_on,
            created_by,
        } = params;

        // The plaqueset check turns a foreign plaque id into a missing row.
        let row = sqlx::query_as::<_, CommentRow>(
            "INSERT INTO comments (id, plaque_id, text, approved, created_on, created_by)
             SELECT $1, p.id, $4, $5, $6, $7 FROM plaques p
             WHERE p.plaqueset = $2 AND p.id = $3
             RETURNING id, plaque_id, text, approved, created_on, created_by",
        )
        .bind(Uuid::new_v4())
        .bind(self.plaqueset())
        .bind(plaque_id)
        .bind(text)
        .bind(approved)
        .bind(created_on)
        .bind(created_by)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(CommentRecord::from(row))
    }

    async fn list_for_plaque(&self, plaque_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        let rows = sqlx::query_as::<_, CommentRow>(
            "SELECT c.id, c.plaque_id, c.text, c.approved, c.created_on, c.created_by
             FROM comments c INNER JOIN plaques p ON p.id = c.plaque_id
             WHERE p.plaqueset = $1 AND c.plaque_id = $2
             ORDER BY c.created_on ASC, c.id ASC",
        )
        .bind(self.plaqueset())
        .bind(plaque_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }

    async fn latest_approved(&self, limit: u32) -> Result<Vec<CommentRecord>, RepoError> {
        let rows = sqlx::query_as::<_, CommentRow>(
            "SELECT c.id, c.plaque_id, c.text, c.approved, c.created_on, c.created_by
             FROM comments c INNER JOIN plaques p ON p.id = c.plaque_id
             WHERE p.plaqueset = $1 AND p.approved AND c.approved
             ORDER BY c.created_on DESC, c.id DESC
             LIMIT $2",
        )
        .bind(self.plaqueset())
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }

    async fn count_comments(&self) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM comments c INNER JOIN plaques p ON p.id = c.plaque_id \
             WHERE p.plaqueset = $1",
        )
        .bind(self.plaqueset())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }
}
