//! Remote rendered pages.
//!
//! The crawl pipeline never talks to a browser directly. It drives a
//! [`RemotePage`], one rendered tab owned by exactly one task, and asks a
//! [`PageFactory`] for fresh pages. The production adapter lives in
//! [`chromium`]; tests use an in-memory fixture that serves static HTML.

pub mod chromium;
#[cfg(test)]
pub(crate) mod fixture;

use crate::filter::ResourceFilter;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// How an element is addressed on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(query: impl Into<String>) -> Self {
        Self::Css(query.into())
    }

    pub fn xpath(query: impl Into<String>) -> Self {
        Self::XPath(query.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(q) => write!(f, "css `{q}`"),
            Locator::XPath(q) => write!(f, "xpath `{q}`"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PageError {
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("no element matches {0}")]
    NotFound(Locator),
    #[error("query {locator} failed: {reason}")]
    Query { locator: Locator, reason: String },
    #[error("script evaluation failed: {0}")]
    Script(String),
    #[error("timed out waiting for {0}")]
    Timeout(Locator),
    #[error("browser error: {0}")]
    Browser(String),
}

/// One rendered browser tab.
///
/// Reads resolve against the document as currently rendered; nothing is
/// cached between calls.
#[async_trait]
pub trait RemotePage: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), PageError>;

    /// URL of the document currently loaded, after any in-page navigation.
    async fn current_url(&self) -> Result<Option<String>, PageError>;

    /// Wait until `locator` matches at least one element.
    async fn wait_ready(&self, locator: &Locator) -> Result<(), PageError>;

    /// Read attribute `name` from every element matching `locator`, in
    /// document order. Elements without the attribute yield `None`.
    async fn query_attribute_all(
        &self,
        locator: &Locator,
        name: &str,
    ) -> Result<Vec<Option<String>>, PageError>;

    /// Text content of the first element matching `locator`.
    async fn read_text(&self, locator: &Locator) -> Result<String, PageError>;

    /// Text content of every element matching `locator`, in document order.
    async fn read_text_all(&self, locator: &Locator) -> Result<Vec<String>, PageError>;

    async fn read_attribute(
        &self,
        locator: &Locator,
        name: &str,
    ) -> Result<Option<String>, PageError>;

    async fn read_inner_markup(&self, locator: &Locator) -> Result<String, PageError>;

    async fn evaluate(&self, script: &str) -> Result<(), PageError>;

    async fn click(&self, locator: &Locator) -> Result<(), PageError>;

    /// Set a form control's value and fire its `change` event.
    async fn set_value(&self, locator: &Locator, value: &str) -> Result<(), PageError>;

    /// Route every sub-resource request of this page through `filter`.
    async fn intercept(&self, filter: &ResourceFilter) -> Result<(), PageError>;

    async fn close(&self) -> Result<(), PageError>;
}

/// Opens fresh, unshared pages.
#[async_trait]
pub trait PageFactory: Send + Sync {
    type Page: RemotePage + 'static;

    async fn open(&self) -> Result<Self::Page, PageError>;
}
