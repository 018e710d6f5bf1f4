//! PostgreSQL article store.
//!
//! Articles land in the `noticias` table. The embedded migration creates the
//! table when missing and always adds a unique index on `hash_id`, so older
//! databases created without the constraint get it too.

use super::{ArticleStore, StoreError};
use crate::models::{Article, ContentHash};
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info, instrument};

pub struct PgArticleStore {
    pool: PgPool,
}

impl PgArticleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with room for every worker plus the existence checks.
    #[instrument(level = "info", skip_all, fields(max_connections = max_connections))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!("Connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    /// Unconditional insert. The unique index on `hash_id` rejects a second
    /// row for the same hash, which is reported as `Ok(false)`.
    async fn insert_row(&self, article: &Article) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO noticias (title, content, date, url, hash_id, ticker)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(article.title())
        .bind(article.content())
        .bind(article.published_at())
        .bind(article.url())
        .bind(article.content_hash().as_str())
        .bind(article.ticker())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                debug!("Lost insert race to a concurrent writer");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Schema is up to date");
        Ok(())
    }
}

#[async_trait]
impl ArticleStore for PgArticleStore {
    async fn exists(&self, hash: &ContentHash) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM noticias WHERE hash_id = $1)",
        )
        .bind(hash.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    #[instrument(level = "debug", skip_all, fields(hash = %article.content_hash()))]
    async fn insert_if_absent(&self, article: &Article) -> Result<bool, StoreError> {
        if self.exists(article.content_hash()).await? {
            return Ok(false);
        }
        self.insert_row(article).await
    }
}
