//! Network-request filtering for rendered pages.
//!
//! Article pages only need their document text, so most sub-resources are
//! wasted bandwidth and render time. A [`ResourceFilter`] classifies each
//! outgoing request by [`ResourceKind`] and answers allow or block; the page
//! adapter applies the verdict at interception time.
//!
//! Blocking scripts and XHR breaks sites that load their body asynchronously,
//! which is why the policy is chosen per site rather than globally.

use crate::page::{PageError, RemotePage};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::{debug, instrument};

/// Coarse classification of a network sub-request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    Document,
    Stylesheet,
    Image,
    Media,
    Font,
    Script,
    Xhr,
    Fetch,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Block,
}

/// Named policies selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterPreset {
    AllowAll,
    TextOnly,
}

impl From<FilterPreset> for ResourceFilter {
    fn from(preset: FilterPreset) -> Self {
        match preset {
            FilterPreset::AllowAll => ResourceFilter::allow_all(),
            FilterPreset::TextOnly => ResourceFilter::text_only(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceFilter {
    blocked: BTreeSet<ResourceKind>,
    blocked_urls: Vec<String>,
}

impl ResourceFilter {
    /// Let every request through.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Block everything but the document itself, fonts, and uncategorized requests.
    pub fn text_only() -> Self {
        [
            ResourceKind::Image,
            ResourceKind::Stylesheet,
            ResourceKind::Media,
            ResourceKind::Script,
            ResourceKind::Fetch,
            ResourceKind::Xhr,
        ]
        .into_iter()
        .fold(Self::default(), Self::block)
    }

    pub fn block(mut self, kind: ResourceKind) -> Self {
        if kind != ResourceKind::Document {
            self.blocked.insert(kind);
        }
        self
    }

    /// Block any request whose URL matches a browser wildcard pattern such as
    /// `*streaming.forexpros.com*`.
    pub fn block_url_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.blocked_urls.push(pattern.into());
        self
    }

    pub fn classify(&self, kind: ResourceKind) -> Verdict {
        if self.blocked.contains(&kind) {
            Verdict::Block
        } else {
            Verdict::Allow
        }
    }

    pub fn blocks_any_kind(&self) -> bool {
        !self.blocked.is_empty()
    }

    pub fn blocked_urls(&self) -> &[String] {
        &self.blocked_urls
    }

    /// Replace the per-kind policy while keeping the URL patterns.
    pub fn with_kinds_from(mut self, other: &ResourceFilter) -> Self {
        self.blocked = other.blocked.clone();
        self
    }

    /// Attach this policy to a page. A pass-through policy installs nothing.
    #[instrument(level = "debug", skip_all, fields(kinds = self.blocked.len(), urls = self.blocked_urls.len()))]
    pub async fn install<P>(&self, page: &P) -> Result<(), PageError>
    where
        P: RemotePage + ?Sized,
    {
        if !self.blocks_any_kind() && self.blocked_urls.is_empty() {
            debug!("No resource filter to install");
            return Ok(());
        }
        page.intercept(self).await
    }
}
