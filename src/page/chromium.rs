//! Chromium adapter for [`RemotePage`] built on `chromiumoxide`.
//!
//! A [`ChromiumSession`] owns one browser process and its CDP handler task.
//! Every [`ChromiumPage`] it opens is a separate tab; tabs are closed
//! explicitly when a worker is done with them, and closed in the background
//! if they are dropped early (for example when an article deadline fires).

use super::{Locator, PageError, PageFactory, RemotePage};
use crate::filter::{ResourceFilter, ResourceKind, Verdict};
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams as FetchEnableParams, EventRequestPaused,
    FailRequestParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, ErrorReason, ResourceType, SetBlockedUrLsParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use futures::StreamExt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

const READY_POLL: Duration = Duration::from_millis(100);
const READY_TIMEOUT: Duration = Duration::from_secs(15);

/// Browser launch settings.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Show the browser window instead of running headless.
    pub headed: bool,
    /// Upper bound for a single CDP request.
    pub request_timeout: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headed: false,
            request_timeout: Duration::from_secs(30),
        }
    }
}

pub struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromiumSession {
    /// Launch a browser and start draining its CDP event stream.
    #[instrument(level = "info", skip_all, fields(headed = options.headed))]
    pub async fn launch(options: &BrowserOptions) -> Result<Self, PageError> {
        let mut builder = BrowserConfig::builder().request_timeout(options.request_timeout);
        if options.headed {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(PageError::Browser)?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(browser_error)?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!(error = %e, "chromium handler event error");
                }
            }
        });

        info!("Browser launched");
        Ok(Self { browser, handler })
    }

    /// Close the browser and wait for its process to exit.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "Failed to close browser");
        }
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "Failed waiting for browser exit");
        }
        self.handler.abort();
        info!("Browser shut down");
    }
}

#[async_trait]
impl PageFactory for ChromiumSession {
    type Page = ChromiumPage;

    async fn open(&self) -> Result<ChromiumPage, PageError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(browser_error)?;
        Ok(ChromiumPage::new(page))
    }
}

/// One Chromium tab.
pub struct ChromiumPage {
    page: Page,
    interceptor: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl ChromiumPage {
    fn new(page: Page) -> Self {
        Self {
            page,
            interceptor: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    async fn find_one(&self, locator: &Locator) -> Result<Element, PageError> {
        let found = match locator {
            Locator::Css(q) => self.page.find_element(q.as_str()).await,
            Locator::XPath(q) => self.page.find_xpath(q.as_str()).await,
        };
        found.map_err(|e| query_error(locator, e))
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<Element>, PageError> {
        let found = match locator {
            Locator::Css(q) => self.page.find_elements(q.as_str()).await,
            Locator::XPath(q) => self.page.find_xpaths(q.as_str()).await,
        };
        found.map_err(|e| query_error(locator, e))
    }

    fn stop_interceptor(&self) {
        if let Ok(mut slot) = self.interceptor.lock()
            && let Some(task) = slot.take()
        {
            task.abort();
        }
    }
}

#[async_trait]
impl RemotePage for ChromiumPage {
    #[instrument(level = "debug", skip(self))]
    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| PageError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn current_url(&self) -> Result<Option<String>, PageError> {
        self.page.url().await.map_err(browser_error)
    }

    async fn wait_ready(&self, locator: &Locator) -> Result<(), PageError> {
        let deadline = tokio::time::Instant::now() + READY_TIMEOUT;
        loop {
            if self.find_one(locator).await.is_ok() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(PageError::Timeout(locator.clone()));
            }
            tokio::time::sleep(READY_POLL).await;
        }
    }

    async fn query_attribute_all(
        &self,
        locator: &Locator,
        name: &str,
    ) -> Result<Vec<Option<String>>, PageError> {
        let mut values = Vec::new();
        for element in self.find_all(locator).await? {
            values.push(
                element
                    .attribute(name)
                    .await
                    .map_err(|e| query_error(locator, e))?,
            );
        }
        Ok(values)
    }

    async fn read_text(&self, locator: &Locator) -> Result<String, PageError> {
        let element = self.find_one(locator).await?;
        let text = element
            .inner_text()
            .await
            .map_err(|e| query_error(locator, e))?;
        Ok(text.unwrap_or_default())
    }

    async fn read_text_all(&self, locator: &Locator) -> Result<Vec<String>, PageError> {
        let mut texts = Vec::new();
        for element in self.find_all(locator).await? {
            let text = element
                .inner_text()
                .await
                .map_err(|e| query_error(locator, e))?;
            texts.push(text.unwrap_or_default());
        }
        Ok(texts)
    }

    async fn read_attribute(
        &self,
        locator: &Locator,
        name: &str,
    ) -> Result<Option<String>, PageError> {
        let element = self.find_one(locator).await?;
        element
            .attribute(name)
            .await
            .map_err(|e| query_error(locator, e))
    }

    async fn read_inner_markup(&self, locator: &Locator) -> Result<String, PageError> {
        let element = self.find_one(locator).await?;
        let html = element
            .inner_html()
            .await
            .map_err(|e| query_error(locator, e))?;
        Ok(html.unwrap_or_default())
    }

    async fn evaluate(&self, script: &str) -> Result<(), PageError> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| PageError::Script(e.to_string()))?;
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> Result<(), PageError> {
        let element = self.find_one(locator).await?;
        element.click().await.map_err(|e| query_error(locator, e))?;
        Ok(())
    }

    async fn set_value(&self, locator: &Locator, value: &str) -> Result<(), PageError> {
        let script = set_value_script(locator, value);
        let found = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| PageError::Script(e.to_string()))?
            .into_value::<bool>()
            .map_err(|e| PageError::Script(e.to_string()))?;
        if found {
            Ok(())
        } else {
            Err(PageError::NotFound(locator.clone()))
        }
    }

    #[instrument(level = "debug", skip_all)]
    async fn intercept(&self, filter: &ResourceFilter) -> Result<(), PageError> {
        if !filter.blocked_urls().is_empty() {
            self.page
                .execute(NetworkEnableParams::default())
                .await
                .map_err(browser_error)?;
            self.page
                .execute(SetBlockedUrLsParams::new(filter.blocked_urls().to_vec()))
                .await
                .map_err(browser_error)?;
            debug!(patterns = ?filter.blocked_urls(), "Blocked URL patterns installed");
        }

        if !filter.blocks_any_kind() {
            return Ok(());
        }

        let mut paused = self
            .page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(browser_error)?;
        self.page
            .execute(FetchEnableParams::default())
            .await
            .map_err(browser_error)?;

        let page = self.page.clone();
        let filter = filter.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let kind = resource_kind(&event.resource_type);
                let outcome = match filter.classify(kind) {
                    Verdict::Block => page
                        .execute(FailRequestParams::new(
                            event.request_id.clone(),
                            ErrorReason::BlockedByClient,
                        ))
                        .await
                        .map(|_| ()),
                    Verdict::Allow => page
                        .execute(ContinueRequestParams::new(event.request_id.clone()))
                        .await
                        .map(|_| ()),
                };
                if let Err(e) = outcome {
                    // The tab may already be navigating away or closing.
                    trace!(error = %e, ?kind, "Paused request could not be resolved");
                }
            }
        });

        self.stop_interceptor();
        if let Ok(mut slot) = self.interceptor.lock() {
            *slot = Some(task);
        }
        debug!("Request interception enabled");
        Ok(())
    }

    async fn close(&self) -> Result<(), PageError> {
        self.stop_interceptor();
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.page.clone().close().await.map_err(browser_error)
    }
}

impl Drop for ChromiumPage {
    fn drop(&mut self) {
        self.stop_interceptor();
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let page = self.page.clone();
            handle.spawn(async move {
                if let Err(e) = page.close().await {
                    trace!(error = %e, "Background tab close failed");
                }
            });
        }
    }
}

fn browser_error(e: CdpError) -> PageError {
    PageError::Browser(e.to_string())
}

fn query_error(locator: &Locator, e: CdpError) -> PageError {
    PageError::Query {
        locator: locator.clone(),
        reason: e.to_string(),
    }
}

fn resource_kind(resource_type: &ResourceType) -> ResourceKind {
    match resource_type {
        ResourceType::Document => ResourceKind::Document,
        ResourceType::Stylesheet => ResourceKind::Stylesheet,
        ResourceType::Image => ResourceKind::Image,
        ResourceType::Media => ResourceKind::Media,
        ResourceType::Font => ResourceKind::Font,
        ResourceType::Script => ResourceKind::Script,
        ResourceType::Xhr => ResourceKind::Xhr,
        ResourceType::Fetch => ResourceKind::Fetch,
        _ => ResourceKind::Other,
    }
}

/// JavaScript expression resolving `locator` to its first node, or `null`.
fn js_lookup(locator: &Locator) -> String {
    match locator {
        Locator::Css(q) => format!("document.querySelector({})", js_string(q)),
        Locator::XPath(q) => format!(
            "document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
            js_string(q)
        ),
    }
}

fn set_value_script(locator: &Locator, value: &str) -> String {
    format!(
        "(() => {{ const el = {}; if (!el) return false; el.value = {}; \
         el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }})()",
        js_lookup(locator),
        js_string(value)
    )
}

fn js_string(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}
