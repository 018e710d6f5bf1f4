//! Article persistence with hash-keyed deduplication.
//!
//! Stores expose a two-step gate: a cheap [`ArticleStore::exists`] point read
//! that lets workers skip already-stored URLs before opening a page, and
//! [`ArticleStore::insert_if_absent`], which re-checks and then writes.
//!
//! The re-check is not atomic against other workers. Uniqueness is
//! guaranteed by the store itself: the PostgreSQL schema carries a unique
//! index on the hash, and a lost race surfaces as a constraint violation
//! that is reported as "not inserted".

pub mod memory;
pub mod postgres;

use crate::models::{Article, ContentHash};
use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryArticleStore;
pub use postgres::PgArticleStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("schema migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn exists(&self, hash: &ContentHash) -> Result<bool, StoreError>;

    /// Persist `article` unless its hash is already stored.
    ///
    /// Returns `Ok(true)` when a row was written and `Ok(false)` when the
    /// article was already present, including when a concurrent writer won
    /// the race between the re-check and the insert.
    async fn insert_if_absent(&self, article: &Article) -> Result<bool, StoreError>;
}
