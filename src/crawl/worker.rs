//! Per-link article processing.

use super::CrawlError;
use super::pool::{LinkHandler, Outcome};
use crate::dates::{DateNormalizer, MonthTable};
use crate::extract::{ArticleExtractor, RawArticle};
use crate::models::{Article, ContentHash, PendingLink};
use crate::page::{PageError, PageFactory, RemotePage};
use crate::sites::SiteProfile;
use crate::store::ArticleStore;
use crate::utils::truncate_for_log;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Turns one discovered link into at most one stored article.
///
/// Each link gets a fresh page, which is closed again whatever the outcome.
pub struct ArticleWorker<F: PageFactory> {
    pages: Arc<F>,
    store: Arc<dyn ArticleStore>,
    profile: Arc<SiteProfile>,
    extractor: ArticleExtractor,
    normalizer: DateNormalizer,
}

impl<F: PageFactory> ArticleWorker<F> {
    pub fn new(pages: Arc<F>, store: Arc<dyn ArticleStore>, profile: Arc<SiteProfile>) -> Self {
        let extractor = ArticleExtractor::new(profile.selectors.clone());
        let normalizer = DateNormalizer::new(MonthTable::portuguese()).with_offset(profile.utc_offset);
        Self {
            pages,
            store,
            profile,
            extractor,
            normalizer,
        }
    }

    /// Store-or-skip for one URL, without a deadline.
    async fn process(&self, url: &str, ticker: &str) -> Result<Outcome, CrawlError> {
        let hash = ContentHash::of_url(url);
        if self.store.exists(&hash).await? {
            debug!(%hash, "Already stored, skipping");
            return Ok(Outcome::Duplicate);
        }

        let raw = self.fetch(url).await?;
        let published_at = self.normalize_date(raw.raw_date.as_deref());
        debug!(
            title = %raw.title,
            body = %truncate_for_log(&raw.body, 120),
            "Article extracted"
        );

        let article = Article::new(raw.title, published_at, raw.body, url, ticker);
        if self.store.insert_if_absent(&article).await? {
            info!(%hash, title = %article.title(), "Stored article");
            Ok(Outcome::Stored)
        } else {
            debug!(%hash, "Lost insert race, already stored");
            Ok(Outcome::Duplicate)
        }
    }

    async fn fetch(&self, url: &str) -> Result<RawArticle, CrawlError> {
        let extraction = |source: PageError| CrawlError::Extraction {
            url: url.to_string(),
            source,
        };
        let page = self.pages.open().await.map_err(extraction)?;
        let result = async {
            self.profile.article_filter.install(&page).await?;
            page.navigate(url).await?;
            if !self.profile.article_settle.is_zero() {
                tokio::time::sleep(self.profile.article_settle).await;
            }
            self.extractor.extract(&page).await
        }
        .await;

        if let Err(e) = page.close().await {
            warn!(error = %e, "Failed to close article page");
        }
        result.map_err(extraction)
    }

    fn normalize_date(&self, raw: Option<&str>) -> Option<DateTime<FixedOffset>> {
        let raw = raw?;
        match self.normalizer.parse(raw, self.profile.date_format) {
            Ok(date) => Some(date),
            Err(e) => {
                warn!(raw, error = %e, "Unparseable publication date, storing without one");
                None
            }
        }
    }
}

#[async_trait]
impl<F> LinkHandler for ArticleWorker<F>
where
    F: PageFactory + 'static,
{
    #[instrument(level = "info", skip_all, fields(url = %link.url))]
    async fn handle(&self, link: PendingLink, cancel: &CancellationToken) -> Outcome {
        // Holding the ticket until return keeps the link counted as outstanding.
        let PendingLink {
            url,
            ticker,
            ticket: _ticket,
        } = link;

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Cancelled mid-article");
                Outcome::Cancelled
            }
            result = tokio::time::timeout(self.profile.article_timeout, self.process(&url, &ticker)) => {
                match result {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(e)) => {
                        warn!(error = %e, "Article failed");
                        Outcome::Failed
                    }
                    Err(_) => {
                        warn!(timeout = ?self.profile.article_timeout, "Article timed out");
                        Outcome::TimedOut
                    }
                }
            }
        }
    }
}
