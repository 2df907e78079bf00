//! Search and container behavior against a real Postgres.
//!
//! Set `EXPLICATES_TEST_DATABASE_URL` to run these; every test works in its
//! own throwaway schema. Without the variable the tests pass trivially.

#[path = "../support/mod.rs"]
mod support;

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use explicates::db::{PostgresAnnotationStore, SearchEngine};
use explicates::services::{CollectionService, ContainerPreference};
use explicates::Error;
use serde_json::{json, Value};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

use support::shared::{frozen_time, init_tracing};
use support::*;

const DATABASE_URL_VAR: &str = "EXPLICATES_TEST_DATABASE_URL";

const TABLES: &[&str] = &[
    "CREATE TABLE collection (
        key      BIGSERIAL PRIMARY KEY,
        slug     TEXT NOT NULL UNIQUE,
        data     JSONB NOT NULL,
        created  TIMESTAMPTZ NOT NULL,
        modified TIMESTAMPTZ,
        deleted  BOOLEAN NOT NULL DEFAULT false
    )",
    "CREATE TABLE annotation (
        key            BIGSERIAL PRIMARY KEY,
        slug           TEXT NOT NULL,
        data           JSONB NOT NULL,
        collection_key BIGINT NOT NULL REFERENCES collection (key),
        created        TIMESTAMPTZ NOT NULL,
        modified       TIMESTAMPTZ,
        deleted        BOOLEAN NOT NULL DEFAULT false,
        UNIQUE (collection_key, slug)
    )",
];

struct PgHarness {
    admin: PgPool,
    pool: PgPool,
    schema: String,
}

impl PgHarness {
    /// `None` when no test database is configured.
    async fn start() -> anyhow::Result<Option<Self>> {
        let Ok(url) = std::env::var(DATABASE_URL_VAR) else {
            return Ok(None);
        };
        init_tracing();

        let admin = PgPoolOptions::new().max_connections(1).connect(&url).await?;
        let schema = format!("test_{}", uuid::Uuid::new_v4().simple());
        sqlx::query(&format!("CREATE SCHEMA {schema}"))
            .execute(&admin)
            .await?;

        let options = PgConnectOptions::from_str(&url)?.options([("search_path", schema.as_str())]);
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        for ddl in TABLES {
            sqlx::query(ddl).execute(&pool).await?;
        }

        Ok(Some(Self {
            admin,
            pool,
            schema,
        }))
    }

    fn engine(&self) -> SearchEngine<PostgresAnnotationStore> {
        SearchEngine::new(Arc::new(PostgresAnnotationStore::new(self.pool.clone())))
    }

    async fn collection(&self, slug: &str) -> anyhow::Result<i64> {
        let key = sqlx::query_scalar(
            "INSERT INTO collection (slug, data, created) VALUES ($1, $2, $3) RETURNING key",
        )
        .bind(slug)
        .bind(collection_data(slug))
        .bind(frozen_time())
        .fetch_one(&self.pool)
        .await?;
        Ok(key)
    }

    async fn annotate_at(
        &self,
        collection_key: i64,
        slug: &str,
        data: Value,
        created: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO annotation (slug, data, collection_key, created) VALUES ($1, $2, $3, $4)",
        )
        .bind(slug)
        .bind(data)
        .bind(collection_key)
        .bind(created)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn annotate(&self, collection_key: i64, slug: &str, data: Value) -> anyhow::Result<()> {
        self.annotate_at(collection_key, slug, data, frozen_time())
            .await
    }

    async fn body(&self, collection_key: i64, slug: &str, body: Value) -> anyhow::Result<()> {
        self.annotate(collection_key, slug, AnnotationBuilder::new().body(body).build())
            .await
    }

    async fn execute(&self, sql: &str, slug: &str) -> anyhow::Result<()> {
        sqlx::query(sql).bind(slug).execute(&self.pool).await?;
        Ok(())
    }

    async fn finish(self) -> anyhow::Result<()> {
        self.pool.close().await;
        sqlx::query(&format!("DROP SCHEMA {} CASCADE", self.schema))
            .execute(&self.admin)
            .await?;
        Ok(())
    }
}

#[tokio::test]
async fn structural_filters() -> anyhow::Result<()> {
    let Some(pg) = PgHarness::start().await? else {
        return Ok(());
    };
    let foo = pg.collection("foo").await?;
    let foobar = pg.collection("foobar").await?;
    pg.annotate(
        foo,
        "tagged",
        AnnotationBuilder::new()
            .body(json!([{"purpose": "tagging", "value": "red"}]))
            .field("label", json!("banana"))
            .build(),
    )
    .await?;
    pg.body(foo, "forty-three", json!(43)).await?;
    pg.body(foobar, "elsewhere", json!(42)).await?;
    pg.body(foo, "removed", json!(44)).await?;
    pg.execute("UPDATE annotation SET deleted = true WHERE slug = $1", "removed")
        .await?;
    let engine = pg.engine();

    let in_foo = engine.search_items(&items(&[("collection", "foo")])).await?;
    assert_slugs(&in_foo, &["tagged", "forty-three"]);

    let deleted = engine.search_items(&items(&[("deleted", "only")])).await?;
    assert_slugs(&deleted, &["removed"]);

    let contains = engine
        .search_items(&items(&[("contains", r#"{"body": [{"value": "red"}]}"#)]))
        .await?;
    assert_slugs(&contains, &["tagged"]);

    let numeric = engine
        .search_items(&items(&[("range", r#"{"body": {"gte": 43}}"#)]))
        .await?;
    assert_slugs(&numeric, &["forty-three"]);

    let lexical = engine
        .search_items(&items(&[("range", r#"{"label": {"gt": "apple", "lt": "cherry"}}"#)]))
        .await?;
    assert_slugs(&lexical, &["tagged"]);

    let windowed = engine
        .search_items(&items(&[("offset", "1"), ("limit", "1")]))
        .await?;
    assert_slugs(&windowed, &["forty-three"]);
    assert_eq!(windowed.total, 3);

    pg.finish().await
}

#[tokio::test]
async fn timestamp_ranges() -> anyhow::Result<()> {
    let Some(pg) = PgHarness::start().await? else {
        return Ok(());
    };
    let foo = pg.collection("foo").await?;
    for (slug, days) in [("day0", 0), ("day5", 5), ("day10", 10)] {
        pg.annotate_at(
            foo,
            slug,
            AnnotationBuilder::new().build(),
            frozen_time() + Duration::days(days),
        )
        .await?;
    }
    pg.execute(
        "UPDATE annotation SET modified = created + interval '1 day' WHERE slug = $1",
        "day5",
    )
    .await?;
    let engine = pg.engine();

    let created = engine
        .search_items(&items(&[(
            "range",
            r#"{"created": {"gt": "1984-11-19T00:00:00Z", "lte": "1984-11-29T00:00:00Z"}}"#,
        )]))
        .await?;
    assert_slugs(&created, &["day5", "day10"]);

    let modified = engine
        .search_items(&items(&[("range", r#"{"modified": {"gte": "1984-01-01T00:00:00Z"}}"#)]))
        .await?;
    assert_slugs(&modified, &["day5"]);

    pg.finish().await
}

#[tokio::test]
async fn full_text_and_phrases() -> anyhow::Result<()> {
    let Some(pg) = PgHarness::start().await? else {
        return Ok(());
    };
    let foo = pg.collection("foo").await?;
    pg.body(foo, "upper", json!("FOO")).await?;
    pg.body(foo, "quxx", json!("quxx")).await?;
    pg.body(foo, "keyed", json!({"qux": "bar"})).await?;
    pg.body(foo, "gap-two", json!("foo bar baz qux")).await?;
    pg.body(foo, "gap-four", json!("foo a b c d qux")).await?;
    pg.body(foo, "gap-one", json!("foo bar qux")).await?;
    pg.body(foo, "adjacent", json!("foo qux")).await?;
    pg.body(foo, "split", json!(["alpha foo", "bar omega"])).await?;
    let engine = pg.engine();

    let prefix = engine
        .search_items(&items(&[("fts", r#"{"body": {"query": "fo"}}"#)]))
        .await?;
    assert_slugs(
        &prefix,
        &["upper", "gap-two", "gap-four", "gap-one", "adjacent", "split"],
    );

    let exact = engine
        .search_items(&items(&[("fts", r#"{"body": {"query": "qux", "prefix": false}}"#)]))
        .await?;
    assert_slugs(&exact, &["gap-two", "gap-four", "gap-one", "adjacent"]);

    let either = engine
        .search_items(&items(&[(
            "fts",
            r#"{"body": {"query": "quxx omega", "operator": "or"}}"#,
        )]))
        .await?;
    assert_slugs(&either, &["quxx", "split"]);

    let contiguous = engine
        .search_items(&items(&[("fts_phrase", r#"{"body": {"query": "foo bar"}}"#)]))
        .await?;
    assert_slugs(&contiguous, &["gap-two", "gap-one"]);

    let three = engine
        .search_items(&items(&[(
            "fts_phrase",
            r#"{"body": {"query": "foo qux", "distance": 3}}"#,
        )]))
        .await?;
    assert_slugs(&three, &["gap-two"]);

    let four = engine
        .search_items(&items(&[(
            "fts_phrase",
            r#"{"body": {"query": "foo qux", "distance": 4}}"#,
        )]))
        .await?;
    assert!(four.items.is_empty());

    let five = engine
        .search_items(&items(&[(
            "fts_phrase",
            r#"{"body": {"query": "foo qux", "distance": 5}}"#,
        )]))
        .await?;
    assert_slugs(&five, &["gap-four"]);

    pg.finish().await
}

#[tokio::test]
async fn container_pages() -> anyhow::Result<()> {
    let Some(pg) = PgHarness::start().await? else {
        return Ok(());
    };
    let foo = pg.collection("foo").await?;
    for i in 0..5 {
        pg.annotate(foo, &format!("anno-{i:03}"), AnnotationBuilder::new().build())
            .await?;
    }
    pg.collection("gone").await?;
    pg.execute("UPDATE collection SET deleted = true WHERE slug = $1", "gone")
        .await?;

    let service = CollectionService::new(pg.engine(), 2)?;
    let ctx = render_context();

    let container = service
        .container(&ctx, "foo", ContainerPreference::default())
        .await?;
    assert_eq!(container["total"], 5);
    assert_eq!(container["last"], "https://example.org/annotations/foo/?page=2");
    assert_eq!(
        container["first"]["items"][0]["id"],
        "https://example.org/annotations/foo/anno-000"
    );

    let last = service
        .page(&ctx, "foo", 2, ContainerPreference::ContainedIris)
        .await?;
    assert_eq!(
        last["items"],
        json!(["https://example.org/annotations/foo/anno-004"])
    );
    assert_eq!(last["startIndex"], 4);

    assert_not_found(
        service
            .page(&ctx, "foo", 3, ContainerPreference::default())
            .await,
    );
    let gone = service
        .container(&ctx, "gone", ContainerPreference::default())
        .await;
    assert!(matches!(gone, Err(Error::CollectionDeleted { .. })));

    pg.finish().await
}
