//! Static-HTML pages for exercising the pipeline without a browser.
//!
//! A [`FixtureWeb`] maps URLs to HTML documents. Listing pages can be chained
//! so that any script evaluation or click on one of them moves the tab to the
//! next page in the chain; the last page repeats forever, like a search
//! result list whose "next" control stops working.

use super::{Locator, PageError, PageFactory, RemotePage};
use crate::filter::ResourceFilter;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
pub(crate) struct FixtureWeb {
    pages: HashMap<String, String>,
    chain: Vec<String>,
    broken: HashSet<String>,
    slow: HashMap<String, Duration>,
    pub(crate) opened: AtomicUsize,
    pub(crate) closed: AtomicUsize,
    pub(crate) navigations: AtomicUsize,
    pub(crate) advances: AtomicUsize,
    pub(crate) intercepts: AtomicUsize,
}

impl FixtureWeb {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), html.into());
        self
    }

    /// Register a listing page that script/click advances from, in order.
    pub(crate) fn listing(mut self, url: &str, html: impl Into<String>) -> Self {
        self.chain.push(url.to_string());
        self.page(url, html)
    }

    pub(crate) fn broken(mut self, url: &str) -> Self {
        self.broken.insert(url.to_string());
        self
    }

    /// Make navigation to `url` take `delay` before it completes.
    pub(crate) fn slow(mut self, url: &str, delay: Duration) -> Self {
        self.slow.insert(url.to_string(), delay);
        self
    }

    pub(crate) fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

/// Opens [`FixturePage`]s over a shared [`FixtureWeb`].
#[derive(Debug, Clone)]
pub(crate) struct FixtureBrowser {
    pub(crate) web: Arc<FixtureWeb>,
}

#[async_trait]
impl PageFactory for FixtureBrowser {
    type Page = FixturePage;

    async fn open(&self) -> Result<FixturePage, PageError> {
        self.web.opened.fetch_add(1, Ordering::SeqCst);
        Ok(FixturePage::new(Arc::clone(&self.web)))
    }
}

#[derive(Debug)]
pub(crate) struct FixturePage {
    web: Arc<FixtureWeb>,
    current: Mutex<Option<String>>,
}

#[derive(Debug, Clone)]
struct Snapshot {
    text: String,
    inner_html: String,
    attrs: HashMap<String, String>,
}

impl FixturePage {
    pub(crate) fn new(web: Arc<FixtureWeb>) -> Self {
        Self {
            web,
            current: Mutex::new(None),
        }
    }

    pub(crate) fn at(web: Arc<FixtureWeb>, url: &str) -> Self {
        let page = Self::new(web);
        *page.current.lock().unwrap() = Some(url.to_string());
        page
    }

    fn select(&self, locator: &Locator) -> Result<Vec<Snapshot>, PageError> {
        let query = match locator {
            Locator::Css(q) => q,
            Locator::XPath(_) => {
                return Err(PageError::Query {
                    locator: locator.clone(),
                    reason: "xpath is not supported by fixture pages".into(),
                });
            }
        };
        let selector = Selector::parse(query).map_err(|e| PageError::Query {
            locator: locator.clone(),
            reason: e.to_string(),
        })?;
        let current = self.current.lock().unwrap().clone();
        let html = current
            .as_ref()
            .and_then(|url| self.web.pages.get(url))
            .ok_or_else(|| PageError::Browser("no document loaded".into()))?;

        let document = Html::parse_document(html);
        Ok(document
            .select(&selector)
            .map(|el| Snapshot {
                text: el.text().collect(),
                inner_html: el.inner_html(),
                attrs: el
                    .value()
                    .attrs()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            })
            .collect())
    }

    fn first(&self, locator: &Locator) -> Result<Snapshot, PageError> {
        self.select(locator)?
            .into_iter()
            .next()
            .ok_or_else(|| PageError::NotFound(locator.clone()))
    }

    fn advance(&self) {
        let mut current = self.current.lock().unwrap();
        let chain = &self.web.chain;
        if let Some(pos) = current.as_ref().and_then(|c| chain.iter().position(|u| u == c)) {
            let next = (pos + 1).min(chain.len() - 1);
            *current = Some(chain[next].clone());
            self.web.advances.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl RemotePage for FixturePage {
    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        self.web.navigations.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.web.slow.get(url) {
            tokio::time::sleep(*delay).await;
        }
        if self.web.broken.contains(url) || !self.web.pages.contains_key(url) {
            return Err(PageError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_NAME_NOT_RESOLVED".into(),
            });
        }
        *self.current.lock().unwrap() = Some(url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> Result<Option<String>, PageError> {
        Ok(self.current.lock().unwrap().clone())
    }

    async fn wait_ready(&self, locator: &Locator) -> Result<(), PageError> {
        self.first(locator).map(|_| ())
    }

    async fn query_attribute_all(
        &self,
        locator: &Locator,
        name: &str,
    ) -> Result<Vec<Option<String>>, PageError> {
        Ok(self
            .select(locator)?
            .into_iter()
            .map(|s| s.attrs.get(name).cloned())
            .collect())
    }

    async fn read_text(&self, locator: &Locator) -> Result<String, PageError> {
        Ok(self.first(locator)?.text)
    }

    async fn read_text_all(&self, locator: &Locator) -> Result<Vec<String>, PageError> {
        Ok(self.select(locator)?.into_iter().map(|s| s.text).collect())
    }

    async fn read_attribute(
        &self,
        locator: &Locator,
        name: &str,
    ) -> Result<Option<String>, PageError> {
        Ok(self.first(locator)?.attrs.get(name).cloned())
    }

    async fn read_inner_markup(&self, locator: &Locator) -> Result<String, PageError> {
        Ok(self.first(locator)?.inner_html)
    }

    async fn evaluate(&self, _script: &str) -> Result<(), PageError> {
        self.advance();
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> Result<(), PageError> {
        self.first(locator)?;
        self.advance();
        Ok(())
    }

    async fn set_value(&self, locator: &Locator, _value: &str) -> Result<(), PageError> {
        self.first(locator).map(|_| ())
    }

    async fn intercept(&self, _filter: &ResourceFilter) -> Result<(), PageError> {
        self.web.intercepts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), PageError> {
        self.web.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
