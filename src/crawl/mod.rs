//! The crawl pipeline for one site.
//!
//! A run wires three pieces together:
//!
//! 1. a [`LinkProducer`] that walks the site's listing on a single page and
//!    pushes every article link into an unbounded channel,
//! 2. an [`ArticleWorkerPool`] whose workers pull links, skip the ones
//!    already stored, and extract and store the rest,
//! 3. a [`WorkTracker`] that counts links from emission to their terminal
//!    outcome.
//!
//! The run is over when discovery has finished (or failed) and the tracker
//! reports no outstanding links, or when the run is cancelled.

pub mod pool;
pub mod producer;
pub mod tracker;
pub mod worker;

use crate::models::CrawlSummary;
use crate::page::{PageError, PageFactory, RemotePage};
use crate::sites::{CrawlJob, SiteProfile};
use crate::store::{ArticleStore, StoreError};
use pool::ArticleWorkerPool;
use producer::{DiscoveryReport, LinkProducer, LinkSink};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracker::WorkTracker;
use tracing::{debug, error, info, instrument, warn};
use worker::ArticleWorker;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("listing discovery failed at step {step}: {source}")]
    Discovery {
        step: usize,
        #[source]
        source: PageError,
    },
    #[error("extraction failed for {url}: {source}")]
    Extraction {
        url: String,
        #[source]
        source: PageError,
    },
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("crawl cancelled")]
    Cancelled,
}

/// One site, one ticker, one run.
pub struct SiteCrawler<F: PageFactory> {
    profile: Arc<SiteProfile>,
    job: CrawlJob,
    pages: Arc<F>,
    store: Arc<dyn ArticleStore>,
}

impl<F> SiteCrawler<F>
where
    F: PageFactory + 'static,
{
    pub fn new(
        profile: SiteProfile,
        job: CrawlJob,
        pages: Arc<F>,
        store: Arc<dyn ArticleStore>,
    ) -> Self {
        Self {
            profile: Arc::new(profile),
            job,
            pages,
            store,
        }
    }

    /// Discover and process the site's articles.
    ///
    /// Discovery failures do not abort the run: links found before the
    /// failure are still processed, and the error is reported in the summary.
    #[instrument(level = "info", skip_all, fields(site = %self.profile.site, ticker = %self.job.ticker))]
    pub async fn run(&self, cancel: &CancellationToken) -> CrawlSummary {
        let (tx, rx) = mpsc::unbounded_channel();
        let tracker = WorkTracker::new();
        let worker = Arc::new(ArticleWorker::new(
            Arc::clone(&self.pages),
            Arc::clone(&self.store),
            Arc::clone(&self.profile),
        ));
        let pool = ArticleWorkerPool::spawn(self.profile.workers, rx, worker, cancel.clone());

        let sink = LinkSink::new(tx, tracker.clone(), &self.job.ticker);
        let discovery = self.discover(sink, cancel).await;
        match &discovery {
            Ok(report) => info!(
                steps = report.steps,
                emitted = report.emitted,
                outstanding = tracker.outstanding(),
                "Discovery finished"
            ),
            Err(e) => error!(error = %e, "Discovery stopped early"),
        }

        tokio::select! {
            _ = tracker.wait_idle() => debug!("All discovered links processed"),
            _ = cancel.cancelled() => warn!("Run cancelled, abandoning queued links"),
        }
        let tally = pool.join().await;

        let summary = CrawlSummary {
            site: Some(self.profile.site),
            discovered: tracker.issued(),
            stored: tally.stored,
            duplicates: tally.duplicates,
            failed: tally.failed,
            timed_out: tally.timed_out,
            cancelled: tally.cancelled,
            discovery_error: discovery.err().map(|e| e.to_string()),
        };
        info!(
            discovered = summary.discovered,
            stored = summary.stored,
            duplicates = summary.duplicates,
            failed = summary.failed,
            timed_out = summary.timed_out,
            processed = summary.processed(),
            "Crawl finished"
        );
        summary
    }

    /// Run discovery on its own page. The sink is dropped on return, which
    /// closes the channel once the workers have drained it.
    async fn discover(
        &self,
        sink: LinkSink,
        cancel: &CancellationToken,
    ) -> Result<DiscoveryReport, CrawlError> {
        let at_start = |source| CrawlError::Discovery { step: 0, source };
        let page = self.pages.open().await.map_err(at_start)?;
        let result = async {
            self.profile
                .listing_filter
                .install(&page)
                .await
                .map_err(at_start)?;
            LinkProducer::new(&self.profile.listing, self.profile.page_budget)
                .discover(&page, &sink, cancel)
                .await
        }
        .await;

        if let Err(e) = page.close().await {
            warn!(error = %e, "Failed to close listing page");
        }
        result
    }
}
