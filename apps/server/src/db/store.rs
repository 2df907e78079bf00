//! PostgreSQL annotation store
//!
//! Expected tables (created by the host's migrations, not by this crate):
//!
//! ```sql
//! CREATE TABLE collection (
//!     key      BIGSERIAL PRIMARY KEY,
//!     slug     TEXT NOT NULL UNIQUE,
//!     data     JSONB NOT NULL,
//!     created  TIMESTAMPTZ NOT NULL,
//!     modified TIMESTAMPTZ,
//!     deleted  BOOLEAN NOT NULL DEFAULT false
//! );
//!
//! CREATE TABLE annotation (
//!     key            BIGSERIAL PRIMARY KEY,
//!     slug           TEXT NOT NULL,
//!     data           JSONB NOT NULL,
//!     collection_key BIGINT NOT NULL REFERENCES collection (key),
//!     created        TIMESTAMPTZ NOT NULL,
//!     modified       TIMESTAMPTZ,
//!     deleted        BOOLEAN NOT NULL DEFAULT false,
//!     UNIQUE (collection_key, slug)
//! );
//! ```

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgConnection, PgPool, Postgres, Row, Transaction};

use crate::config::DatabaseConfig;
use crate::db::search::query_builder::{BindValue, QueryBuilder};
use crate::db::search::Predicate;
use crate::db::traits::{AnnotationStore, Window};
use crate::models::{AnnotationRecord, CollectionRecord};
use crate::Result;

/// Annotation store backed by a `sqlx` Postgres pool.
#[derive(Debug, Clone)]
pub struct PostgresAnnotationStore {
    pool: PgPool,
}

impl PostgresAnnotationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool from configuration.
    ///
    /// Every connection gets `statement_timeout` so runaway text scans fail
    /// with `StorageUnavailable` instead of hanging the caller.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let timeout_ms = config.statement_timeout_seconds.saturating_mul(1000);
        let pool = PgPoolOptions::new()
            .min_connections(config.pool_min_size)
            .max_connections(config.pool_max_size)
            .acquire_timeout(config.pool_timeout())
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    if timeout_ms > 0 {
                        sqlx::query(&format!("SET statement_timeout = {timeout_ms}"))
                            .execute(&mut *conn)
                            .await?;
                    }
                    Ok(())
                })
            })
            .connect(&config.url)
            .await?;

        tracing::info!(
            max_connections = config.pool_max_size,
            statement_timeout_seconds = config.statement_timeout_seconds,
            "Connected annotation store"
        );
        Ok(Self::new(pool))
    }

    /// Read-only transaction in which every statement sees one snapshot.
    async fn begin_snapshot(pool: &PgPool) -> Result<Transaction<'static, Postgres>> {
        let mut tx = pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    async fn find_collection_on(
        conn: &mut PgConnection,
        slug: &str,
    ) -> Result<Option<CollectionRecord>> {
        let row = sqlx::query(
            "SELECT key, slug, data, created, modified, deleted FROM collection WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.as_ref().map(collection_from_row).transpose()?)
    }

    async fn count_on(conn: &mut PgConnection, predicate: &Predicate) -> Result<u64> {
        let (sql, bind_values) = QueryBuilder::new(predicate).build_count_sql();

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for value in bind_values {
            query = match value {
                BindValue::Text(v) => query.bind(v),
                BindValue::TextArray(vs) => query.bind(vs),
            };
        }

        let total = query.fetch_one(&mut *conn).await?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn fetch_on(
        conn: &mut PgConnection,
        predicate: &Predicate,
        window: Window,
    ) -> Result<Vec<AnnotationRecord>> {
        let (sql, bind_values) = QueryBuilder::new(predicate).build_sql(window);

        let mut query = sqlx::query(&sql);
        for value in bind_values {
            query = match value {
                BindValue::Text(v) => query.bind(v),
                BindValue::TextArray(vs) => query.bind(vs),
            };
        }

        let rows = query.fetch_all(&mut *conn).await?;
        rows.iter()
            .map(annotation_from_row)
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(Into::into)
    }
}

#[async_trait]
impl AnnotationStore for PostgresAnnotationStore {
    async fn count(&self, predicate: &Predicate) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        Self::count_on(&mut conn, predicate).await
    }

    async fn fetch(&self, predicate: &Predicate, window: Window) -> Result<Vec<AnnotationRecord>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_on(&mut conn, predicate, window).await
    }

    async fn count_and_fetch(
        &self,
        predicate: &Predicate,
        window: Window,
    ) -> Result<(u64, Vec<AnnotationRecord>)> {
        let mut tx = Self::begin_snapshot(&self.pool).await?;
        let total = Self::count_on(&mut tx, predicate).await?;
        let items = Self::fetch_on(&mut tx, predicate, window).await?;
        tx.commit().await?;

        Ok((total, items))
    }

    async fn collection_members(
        &self,
        slug: &str,
        predicate: &Predicate,
        window: Window,
    ) -> Result<(Option<CollectionRecord>, u64, Vec<AnnotationRecord>)> {
        let mut tx = Self::begin_snapshot(&self.pool).await?;
        let collection = Self::find_collection_on(&mut tx, slug).await?;
        let total = Self::count_on(&mut tx, predicate).await?;
        let items = Self::fetch_on(&mut tx, predicate, window).await?;
        tx.commit().await?;

        Ok((collection, total, items))
    }

    async fn find_collection(&self, slug: &str) -> Result<Option<CollectionRecord>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_collection_on(&mut conn, slug).await
    }
}

fn annotation_from_row(row: &PgRow) -> std::result::Result<AnnotationRecord, sqlx::Error> {
    Ok(AnnotationRecord {
        key: row.try_get("key")?,
        slug: row.try_get("slug")?,
        collection_key: row.try_get("collection_key")?,
        collection_slug: row.try_get("collection_slug")?,
        data: row.try_get("data")?,
        created: row.try_get("created")?,
        modified: row.try_get("modified")?,
        deleted: row.try_get("deleted")?,
    })
}

fn collection_from_row(row: &PgRow) -> std::result::Result<CollectionRecord, sqlx::Error> {
    Ok(CollectionRecord {
        key: row.try_get("key")?,
        slug: row.try_get("slug")?,
        data: row.try_get("data")?,
        created: row.try_get("created")?,
        modified: row.try_get("modified")?,
        deleted: row.try_get("deleted")?,
    })
}
