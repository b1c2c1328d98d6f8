//! Postgres-backed repository implementations.
//!
//! Every query is scoped to the configured plaqueset. Writes that must be
//! serialized per partition take a transaction-level advisory lock keyed on
//! the plaqueset name.

mod comments;
mod featured;
mod plaques;
mod search;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use sqlx::{
    Postgres, QueryBuilder, Transaction,
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::application::repos::{PlaqueQueryFilter, PlaqueScope, RepoError};

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
    plaqueset: Arc<str>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool, plaqueset: impl Into<Arc<str>>) -> Self {
        Self {
            pool: Arc::new(pool),
            plaqueset: plaqueset.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn plaqueset(&self) -> &str {
        &self.plaqueset
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    /// Serialize writers of this plaqueset until the transaction ends.
    async fn lock_plaqueset(&self, tx: &mut Transaction<'_, Postgres>) -> Result<(), RepoError> {
        query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(self.plaqueset())
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    fn apply_scope_conditions<'q>(qb: &mut QueryBuilder<'q, Postgres>, scope: PlaqueScope) {
        if !scope.includes_pending() {
            qb.push(" AND p.approved ");
        }
    }

    fn apply_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q PlaqueQueryFilter) {
        if let Some(tag) = filter.tag.as_ref() {
            qb.push(" AND ");
            qb.push_bind(tag);
            qb.push(" = ANY(p.tags) ");
        }
    }

    fn convert_count(value: i64) -> Result<u64, RepoError> {
        value
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }

    fn convert_offset(value: u64) -> Result<i64, RepoError> {
        value.try_into().map_err(|_| RepoError::InvalidInput {
            message: format!("offset {value} exceeds supported range"),
        })
    }
}
