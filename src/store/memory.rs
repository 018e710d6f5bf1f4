//! In-process article store used for dry runs and tests.

use super::{ArticleStore, StoreError};
use crate::models::{Article, ContentHash};
use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Keeps articles in a hash map keyed by [`ContentHash`].
///
/// The map's entry API plays the role of the database's unique index: the
/// existence check inside `insert_if_absent` and the write happen under one
/// lock, so concurrent inserts of the same hash store exactly one article.
#[derive(Debug, Default)]
pub struct MemoryArticleStore {
    articles: Mutex<HashMap<ContentHash, Article>>,
}

impl MemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A worker that panicked mid-insert cannot leave the map half-written,
    /// so a poisoned lock is recovered rather than treated as empty.
    fn articles(&self) -> MutexGuard<'_, HashMap<ContentHash, Article>> {
        self.articles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.articles().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, hash: &ContentHash) -> Option<Article> {
        self.articles().get(hash).cloned()
    }
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn exists(&self, hash: &ContentHash) -> Result<bool, StoreError> {
        Ok(self.articles().contains_key(hash))
    }

    async fn insert_if_absent(&self, article: &Article) -> Result<bool, StoreError> {
        let mut articles = self.articles();
        match articles.entry(article.content_hash().clone()) {
            Entry::Occupied(_) => {
                debug!(hash = %article.content_hash(), "Article already stored");
                Ok(false)
            }
            Entry::Vacant(slot) => {
                slot.insert(article.clone());
                Ok(true)
            }
        }
    }
}
