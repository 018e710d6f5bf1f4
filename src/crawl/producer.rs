//! Link discovery over a paginated listing.
//!
//! The producer walks a fixed number of listing pages, the page budget,
//! regardless of how many pages of results really exist. When the listing
//! runs out early, later steps re-scan its last page and emit the same links
//! again; the deduplication gate downstream absorbs the repeats.

use super::CrawlError;
use super::tracker::WorkTracker;
use crate::models::PendingLink;
use crate::page::{PageError, RemotePage};
use crate::sites::{ListingAction, ListingPlan, Pagination};
use crate::utils::resolve_link;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Producer side of the link channel.
///
/// Emitting a link issues its work ticket first, so a consumer can never
/// hold a link the tracker does not know about.
#[derive(Debug)]
pub struct LinkSink {
    tx: UnboundedSender<PendingLink>,
    tracker: WorkTracker,
    ticker: Arc<str>,
}

impl LinkSink {
    pub fn new(tx: UnboundedSender<PendingLink>, tracker: WorkTracker, ticker: &str) -> Self {
        Self {
            tx,
            tracker,
            ticker: Arc::from(ticker),
        }
    }

    /// Queue `url` for the workers. Returns `false` once every worker is gone.
    pub fn emit(&self, url: String) -> bool {
        let ticket = self.tracker.issue();
        self.tx
            .send(PendingLink {
                url,
                ticker: Arc::clone(&self.ticker),
                ticket,
            })
            .is_ok()
    }

    pub fn outstanding(&self) -> usize {
        self.tracker.outstanding()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub steps: usize,
    pub emitted: usize,
}

pub struct LinkProducer<'a> {
    plan: &'a ListingPlan,
    budget: usize,
}

impl<'a> LinkProducer<'a> {
    pub fn new(plan: &'a ListingPlan, budget: usize) -> Self {
        Self { plan, budget }
    }

    /// Walk the listing for `budget` steps, emitting every link found.
    ///
    /// # Errors
    ///
    /// The first navigation or query failure stops discovery with
    /// [`CrawlError::Discovery`]; cancellation stops it with
    /// [`CrawlError::Cancelled`]. Links emitted before the failure stay queued.
    #[instrument(level = "info", skip_all, fields(budget = self.budget))]
    pub async fn discover<P>(
        &self,
        page: &P,
        sink: &LinkSink,
        cancel: &CancellationToken,
    ) -> Result<DiscoveryReport, CrawlError>
    where
        P: RemotePage + ?Sized,
    {
        let mut report = DiscoveryReport::default();
        let entry = match &self.plan.pagination {
            Pagination::ClickNext { .. } => self.open_entry(page).await.map_err(at_step(0))?,
            Pagination::PageNumber { .. } => None,
        };

        for step in 0..self.budget {
            if cancel.is_cancelled() {
                info!(step, "Discovery cancelled");
                return Err(CrawlError::Cancelled);
            }

            let base = match &self.plan.pagination {
                Pagination::PageNumber {
                    template,
                    first_page,
                    settle,
                } => {
                    let url = template.replace("{page}", &(*first_page as usize + step).to_string());
                    page.navigate(&url).await.map_err(at_step(step))?;
                    pause(*settle, cancel).await?;
                    Url::parse(&url).ok()
                }
                Pagination::ClickNext { .. } => page
                    .current_url()
                    .await
                    .map_err(at_step(step))?
                    .and_then(|url| Url::parse(&url).ok())
                    .or_else(|| entry.clone()),
            };

            let hrefs = page
                .query_attribute_all(&self.plan.link, &self.plan.link_attribute)
                .await
                .map_err(at_step(step))?;
            let found = hrefs.len();
            for href in hrefs.into_iter().flatten() {
                let Some(url) = resolve_link(base.as_ref(), &href) else {
                    warn!(step, %href, "Skipping unusable link");
                    continue;
                };
                if !sink.emit(url) {
                    warn!(step, "No workers left to take links");
                    return Err(CrawlError::Cancelled);
                }
                report.emitted += 1;
            }
            report.steps = step + 1;
            info!(
                step,
                found,
                outstanding = sink.outstanding(),
                "Listing page scanned"
            );

            if let Pagination::ClickNext {
                script,
                ready,
                settle,
            } = &self.plan.pagination
            {
                if let Some(ready) = ready {
                    page.wait_ready(ready).await.map_err(at_step(step))?;
                }
                page.evaluate(script).await.map_err(at_step(step))?;
                pause(*settle, cancel).await?;
            }
        }

        Ok(report)
    }

    async fn open_entry<P>(&self, page: &P) -> Result<Option<Url>, PageError>
    where
        P: RemotePage + ?Sized,
    {
        let Some(entry) = &self.plan.entry_url else {
            return Ok(None);
        };
        page.navigate(entry).await?;
        if let Some(ready) = &self.plan.ready {
            page.wait_ready(ready).await?;
        }
        for action in &self.plan.prepare {
            match action {
                ListingAction::SetValue { locator, value } => {
                    page.set_value(locator, value).await?;
                    debug!(%locator, %value, "Listing control set");
                }
            }
        }
        Ok(Url::parse(entry).ok())
    }
}

fn at_step(step: usize) -> impl Fn(PageError) -> CrawlError {
    move |source| CrawlError::Discovery { step, source }
}

async fn pause(delay: Duration, cancel: &CancellationToken) -> Result<(), CrawlError> {
    if delay.is_zero() {
        return Ok(());
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(CrawlError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}
