//! Data models shared by the crawl pipeline.
//!
//! This module defines the records that flow between pipeline stages:
//! - [`ContentHash`]: storage identity derived from an article URL
//! - [`Article`]: a fully extracted, normalized article ready to persist
//! - [`PendingLink`]: a discovered URL waiting on the hand-off channel
//! - [`CrawlSummary`]: per-site counters reported at the end of a run

use crate::crawl::tracker::WorkTicket;
use crate::sites::Site;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Lowercase hex MD5 digest of an article URL.
///
/// The digest covers the URL only, never the body, so re-crawling an edited
/// article still maps onto the row that is already stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash an article URL.
    pub fn of_url(url: &str) -> Self {
        Self(format!("{:x}", md5::compute(url.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An article extracted from a rendered page.
///
/// Built once by a worker after extraction and date normalization; the
/// content hash is computed from `url` at construction and cannot drift.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    title: String,
    published_at: Option<DateTime<FixedOffset>>,
    content: String,
    url: String,
    content_hash: ContentHash,
    ticker: String,
}

impl Article {
    pub fn new(
        title: impl Into<String>,
        published_at: Option<DateTime<FixedOffset>>,
        content: impl Into<String>,
        url: impl Into<String>,
        ticker: impl Into<String>,
    ) -> Self {
        let url = url.into();
        Self {
            title: title.into(),
            published_at,
            content: content.into(),
            content_hash: ContentHash::of_url(&url),
            url,
            ticker: ticker.into(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Publication timestamp, `None` when the page date could not be parsed.
    pub fn published_at(&self) -> Option<DateTime<FixedOffset>> {
        self.published_at
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn content_hash(&self) -> &ContentHash {
        &self.content_hash
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }
}

/// A discovered article URL in flight between the producer and a worker.
///
/// The embedded ticket keeps the run's outstanding-work count raised until
/// the link is dropped, whether it was stored, skipped, or abandoned.
#[derive(Debug)]
pub struct PendingLink {
    pub url: String,
    pub ticker: Arc<str>,
    pub ticket: WorkTicket,
}

/// Counters reported for one site crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub site: Option<Site>,
    /// Links emitted by discovery, duplicates included.
    pub discovered: usize,
    pub stored: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub cancelled: usize,
    pub discovery_error: Option<String>,
}

impl CrawlSummary {
    /// Links that reached a terminal outcome.
    pub fn processed(&self) -> usize {
        self.stored + self.duplicates + self.failed + self.timed_out + self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_content_hash_is_md5_hex_of_url() {
        let hash = ContentHash::of_url("https://example.com");
        assert_eq!(hash.as_str(), "c984d06aafbecf6bc55569f964148ea3");
        assert_eq!(hash.as_str().len(), 32);
    }

    #[test]
    fn test_content_hash_is_stable() {
        let url = "https://investnews.com.br/economia/vale-lucro-trimestre/";
        assert_eq!(ContentHash::of_url(url), ContentHash::of_url(url));
        assert_ne!(
            ContentHash::of_url(url),
            ContentHash::of_url("https://investnews.com.br/economia/outra/")
        );
    }

    #[test]
    fn test_article_hash_depends_on_url_only() {
        let first = Article::new("A", None, "body one", "https://site/x", "vale3");
        let offset = FixedOffset::west_opt(3 * 3600).unwrap();
        let second = Article::new(
            "B",
            Some(offset.with_ymd_and_hms(2025, 10, 16, 14, 12, 42).unwrap()),
            "body two",
            "https://site/x",
            "csna3",
        );
        assert_eq!(first.content_hash(), second.content_hash());
    }

    #[test]
    fn test_summary_serializes_for_run_report() {
        let summary = CrawlSummary {
            site: Some(Site::InvestNews),
            stored: 2,
            discovery_error: Some("crawl cancelled".into()),
            ..Default::default()
        };
        let json: serde_json::Value = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["site"], "investnews");
        assert_eq!(json["stored"], 2);
        assert_eq!(json["discovery_error"], "crawl cancelled");
    }

    #[test]
    fn test_summary_processed_counts_terminal_outcomes() {
        let summary = CrawlSummary {
            discovered: 9,
            stored: 3,
            duplicates: 4,
            failed: 1,
            timed_out: 1,
            ..Default::default()
        };
        assert_eq!(summary.processed(), 9);
    }
}
