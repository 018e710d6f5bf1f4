//! Investing.com Brasil (br.investing.com).
//!
//! Each ticker has its own news feed, paged by appending `/{page}` to the
//! feed URL. The site is heavy, so both the listing and the article tabs run
//! behind a text-only resource filter, and the quote-streaming host is
//! blocked outright. Article bodies are read as one markup blob.

use super::{CrawlJob, DEFAULT_PAGE_BUDGET, ListingPlan, Pagination, Site, SiteProfile, utc};
use crate::config::ConfigError;
use crate::dates::DateFormat;
use crate::extract::{ArticleSelectors, BodySource, DateSource};
use crate::filter::ResourceFilter;
use crate::page::Locator;
use std::time::Duration;

const STREAMING_HOST: &str = "*streaming.forexpros.com*";

fn filter() -> ResourceFilter {
    ResourceFilter::text_only().block_url_pattern(STREAMING_HOST)
}

/// Page-number template for a ticker's feed.
pub fn page_template(feed: &str) -> String {
    format!("{}/{{page}}", feed.trim_end_matches('/'))
}

pub fn profile(job: &CrawlJob) -> Result<SiteProfile, ConfigError> {
    let feed = job
        .listing_url
        .as_deref()
        .ok_or_else(|| ConfigError::MissingFeed(job.ticker.clone()))?;

    Ok(SiteProfile {
        site: Site::Investing,
        listing: ListingPlan {
            entry_url: None,
            ready: None,
            prepare: Vec::new(),
            link: Locator::css(r#"article [data-test="article-title-link"]"#),
            link_attribute: "href".into(),
            pagination: Pagination::PageNumber {
                template: page_template(feed),
                first_page: 1,
                settle: Duration::from_secs(1),
            },
        },
        page_budget: DEFAULT_PAGE_BUDGET,
        listing_filter: filter(),
        article_filter: filter(),
        article_settle: Duration::from_secs(1),
        selectors: ArticleSelectors {
            title: Locator::css("#articleTitle"),
            date: DateSource::Text {
                locator: Locator::xpath(r#"//span[starts-with(normalize-space(.), "Publicado")]"#),
                strip_prefix: Some("Publicado".into()),
            },
            body: BodySource::Markup {
                container: Locator::css("#article"),
                paragraph: "p".into(),
            },
            stop_markers: Vec::new(),
        },
        date_format: DateFormat::ShortNumeric,
        utc_offset: utc(),
        workers: 5,
        article_timeout: Duration::from_secs(10),
    })
}
