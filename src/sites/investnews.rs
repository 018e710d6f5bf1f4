//! InvestNews (investnews.com.br).
//!
//! WordPress search results paged with the `a.next` control. Dates come
//! from the machine-readable `time[datetime]` attribute; translated wire
//! stories end with a "Traduzido do inglês por" credit line.

use super::{CrawlJob, DEFAULT_PAGE_BUDGET, ListingPlan, Pagination, Site, SiteProfile, utc};
use crate::dates::DateFormat;
use crate::extract::{ArticleSelectors, BodySource, DateSource};
use crate::filter::ResourceFilter;
use crate::page::Locator;
use std::time::Duration;

pub fn search_url(term: &str) -> String {
    format!("https://investnews.com.br/?s={}", urlencoding::encode(term))
}

pub fn profile(job: &CrawlJob) -> SiteProfile {
    SiteProfile {
        site: Site::InvestNews,
        listing: ListingPlan {
            entry_url: Some(search_url(&job.search_term)),
            ready: Some(Locator::css("body")),
            prepare: Vec::new(),
            link: Locator::css("a.tag-post"),
            link_attribute: "href".into(),
            pagination: Pagination::ClickNext {
                script: "document.querySelector('a.next').click()".into(),
                ready: Some(Locator::css("body")),
                settle: Duration::from_secs(3),
            },
        },
        page_budget: DEFAULT_PAGE_BUDGET,
        listing_filter: ResourceFilter::allow_all(),
        article_filter: ResourceFilter::allow_all(),
        article_settle: Duration::ZERO,
        selectors: ArticleSelectors {
            title: Locator::css("h1.title"),
            date: DateSource::Attribute {
                locator: Locator::css("time"),
                name: "datetime".into(),
            },
            body: BodySource::Paragraphs(Locator::css("div.post-content p")),
            stop_markers: vec!["Traduzido do inglês por".into()],
        },
        date_format: DateFormat::Iso8601,
        utc_offset: utc(),
        workers: 6,
        article_timeout: Duration::from_secs(30),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url() {
        assert_eq!(search_url("vale"), "https://investnews.com.br/?s=vale");
    }
}
