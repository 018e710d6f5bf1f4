//! Bloomberg Línea (bloomberglinea.com.br).
//!
//! Results come from the Queryly advanced-search page, sorted by date, and
//! are paged by clicking `a.next_btn`. Article dates are printed as
//! `16 de Outubro, 2025 | 02:04 PM` and bodies end with a "Leia também"
//! cross-link that is not part of the story.

use super::{
    CrawlJob, DEFAULT_PAGE_BUDGET, ListingAction, ListingPlan, Pagination, Site, SiteProfile, utc,
};
use crate::dates::DateFormat;
use crate::extract::{ArticleSelectors, BodySource, DateSource};
use crate::filter::ResourceFilter;
use crate::page::Locator;
use std::time::Duration;

const SEARCH_URL: &str = "https://www.bloomberglinea.com.br/queryly-advanced-search/?query=";

pub fn search_url(term: &str) -> String {
    format!("{SEARCH_URL}{}", urlencoding::encode(term))
}

pub fn profile(job: &CrawlJob) -> SiteProfile {
    SiteProfile {
        site: Site::Bloomberg,
        listing: ListingPlan {
            entry_url: Some(search_url(&job.search_term)),
            ready: Some(Locator::css("body")),
            prepare: vec![ListingAction::SetValue {
                locator: Locator::css("select#sortby"),
                value: "date".into(),
            }],
            link: Locator::css(".queryly_item_row a"),
            link_attribute: "href".into(),
            pagination: Pagination::ClickNext {
                script: "document.querySelector('a.next_btn').click()".into(),
                ready: None,
                settle: Duration::from_secs(3),
            },
        },
        page_budget: DEFAULT_PAGE_BUDGET,
        listing_filter: ResourceFilter::allow_all(),
        article_filter: ResourceFilter::allow_all(),
        article_settle: Duration::ZERO,
        selectors: ArticleSelectors {
            title: Locator::css("h1"),
            date: DateSource::Text {
                locator: Locator::css("small"),
                strip_prefix: None,
            },
            body: BodySource::Paragraphs(Locator::css("article p.body-paragraph")),
            stop_markers: vec!["Leia também".into()],
        },
        date_format: DateFormat::LocalizedLong,
        utc_offset: utc(),
        workers: 4,
        article_timeout: Duration::from_secs(30),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_encodes_term() {
        assert_eq!(
            search_url("vale s.a."),
            "https://www.bloomberglinea.com.br/queryly-advanced-search/?query=vale%20s.a."
        );
    }
}
