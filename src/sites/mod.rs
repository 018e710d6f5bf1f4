//! Site profiles: everything a crawl needs to know about one news site.
//!
//! The pipeline is shared; a site contributes only data: where its listing
//! lives, how to page through it, which elements hold links, title, date,
//! and body, and which boilerplate ends an article.
//!
//! # Supported Sites
//!
//! | Site | Module | Listing | Pagination | Body |
//! |------|--------|---------|------------|------|
//! | Bloomberg Línea | [`bloomberg`] | search page | click `a.next_btn` | paragraphs |
//! | Investing.com (BR) | [`investing`] | per-ticker news feed | `/{page}` URL segment | markup blob |
//! | InvestNews | [`investnews`] | search page | click `a.next` | paragraphs |

pub mod bloomberg;
pub mod investing;
pub mod investnews;

use crate::config::{ConfigError, SiteOverrides};
use crate::dates::DateFormat;
use crate::extract::ArticleSelectors;
use crate::filter::ResourceFilter;
use crate::page::Locator;
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default number of listing pages walked per run.
pub const DEFAULT_PAGE_BUDGET: usize = 250;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    Bloomberg,
    Investing,
    #[value(name = "investnews")]
    InvestNews,
}

impl Site {
    pub const ALL: [Site; 3] = [Site::Bloomberg, Site::Investing, Site::InvestNews];

    /// Built-in profile for this site.
    ///
    /// # Errors
    ///
    /// Investing.com has no search page; its listing is a per-ticker feed,
    /// and a job without one cannot be crawled.
    pub fn profile(&self, job: &CrawlJob) -> Result<SiteProfile, ConfigError> {
        match self {
            Site::Bloomberg => Ok(bloomberg::profile(job)),
            Site::Investing => investing::profile(job),
            Site::InvestNews => Ok(investnews::profile(job)),
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Site::Bloomberg => "bloomberg",
            Site::Investing => "investing",
            Site::InvestNews => "investnews",
        })
    }
}

/// What to crawl: a ticker and how to find its news.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlJob {
    pub ticker: String,
    pub search_term: String,
    /// Investing.com news feed for the ticker, without the page segment.
    pub listing_url: Option<String>,
}

/// How the listing advances from one page of results to the next.
#[derive(Debug, Clone)]
pub enum Pagination {
    /// Evaluate a script that clicks the "next" control, then wait.
    ClickNext {
        script: String,
        ready: Option<Locator>,
        settle: Duration,
    },
    /// Navigate to `template` with `{page}` replaced by the page number.
    PageNumber {
        template: String,
        first_page: u32,
        settle: Duration,
    },
}

impl Pagination {
    fn set_settle(&mut self, value: Duration) {
        match self {
            Pagination::ClickNext { settle, .. } | Pagination::PageNumber { settle, .. } => {
                *settle = value
            }
        }
    }
}

/// One-off adjustment made to the listing after it first loads.
#[derive(Debug, Clone)]
pub enum ListingAction {
    SetValue { locator: Locator, value: String },
}

#[derive(Debug, Clone)]
pub struct ListingPlan {
    /// Page loaded before the first step. Unused with page-number pagination.
    pub entry_url: Option<String>,
    pub ready: Option<Locator>,
    pub prepare: Vec<ListingAction>,
    pub link: Locator,
    pub link_attribute: String,
    pub pagination: Pagination,
}

#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub site: Site,
    pub listing: ListingPlan,
    pub page_budget: usize,
    pub listing_filter: ResourceFilter,
    pub article_filter: ResourceFilter,
    /// Pause after an article navigation before reading the DOM.
    pub article_settle: Duration,
    pub selectors: ArticleSelectors,
    pub date_format: DateFormat,
    /// Offset used for dates printed without one.
    pub utc_offset: FixedOffset,
    pub workers: usize,
    pub article_timeout: Duration,
}

impl SiteProfile {
    /// Layer configured overrides over the built-in values.
    pub fn apply(&mut self, overrides: &SiteOverrides) -> Result<(), ConfigError> {
        if let Some(workers) = overrides.workers {
            self.workers = workers.max(1);
        }
        if let Some(budget) = overrides.page_budget {
            self.page_budget = budget;
        }
        if let Some(secs) = overrides.article_timeout_secs {
            self.article_timeout = Duration::from_secs(secs);
        }
        if let Some(millis) = overrides.settle_millis {
            self.listing.pagination.set_settle(Duration::from_millis(millis));
        }
        if let (Some(page), Pagination::PageNumber { first_page, .. }) =
            (overrides.first_page, &mut self.listing.pagination)
        {
            *first_page = page;
        }
        if let Some(preset) = overrides.resource_filter {
            let kinds = ResourceFilter::from(preset);
            self.article_filter = self.article_filter.clone().with_kinds_from(&kinds);
        }
        if let Some(offset) = &overrides.utc_offset {
            self.utc_offset = offset
                .parse()
                .map_err(|_| ConfigError::InvalidOffset(offset.clone()))?;
        }
        Ok(())
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}
