//! Article extraction from rendered pages.
//!
//! An [`ArticleExtractor`] reads three things from a loaded article page:
//! the headline, the raw publication date, and the body text. Body text is
//! assembled paragraph by paragraph, either straight from the rendered DOM
//! or, for sites that hand back one markup blob, by parsing the container's
//! inner HTML locally with `scraper`.
//!
//! # Stop markers
//!
//! The supported sites append boilerplate ("Leia também …", "Traduzido do
//! inglês por …") as ordinary sibling paragraphs. The first paragraph that
//! contains a stop marker ends the body; it and everything after it are
//! discarded.

use crate::page::{Locator, PageError, RemotePage};
use itertools::Itertools;
use scraper::{Html, Selector};
use tracing::{debug, instrument};

/// Where the publication date lives on an article page.
#[derive(Debug, Clone)]
pub enum DateSource {
    /// Visible text, with an optional literal prefix removed first.
    Text {
        locator: Locator,
        strip_prefix: Option<String>,
    },
    /// An attribute such as `datetime` on a `<time>` element.
    Attribute { locator: Locator, name: String },
}

/// How the body paragraphs are found.
#[derive(Debug, Clone)]
pub enum BodySource {
    /// Every element matching the locator is one paragraph.
    Paragraphs(Locator),
    /// Read `container`'s inner HTML and split it on the CSS `paragraph` selector.
    Markup { container: Locator, paragraph: String },
}

#[derive(Debug, Clone)]
pub struct ArticleSelectors {
    pub title: Locator,
    pub date: DateSource,
    pub body: BodySource,
    pub stop_markers: Vec<String>,
}

/// Extracted but not yet normalized article fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawArticle {
    pub title: String,
    pub raw_date: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct ArticleExtractor {
    selectors: ArticleSelectors,
}

impl ArticleExtractor {
    pub fn new(selectors: ArticleSelectors) -> Self {
        Self { selectors }
    }

    /// Extract title, raw date, and body from the page currently loaded.
    ///
    /// # Errors
    ///
    /// Fails when the title is missing or empty, or when the body cannot be
    /// read. A missing date is not an error; it yields `raw_date: None`.
    #[instrument(level = "debug", skip_all)]
    pub async fn extract<P>(&self, page: &P) -> Result<RawArticle, PageError>
    where
        P: RemotePage + ?Sized,
    {
        let title = page.read_text(&self.selectors.title).await?.trim().to_string();
        if title.is_empty() {
            return Err(PageError::NotFound(self.selectors.title.clone()));
        }

        let raw_date = match self.read_date(page).await {
            Ok(date) => date,
            Err(e) => {
                debug!(error = %e, "Publication date not found");
                None
            }
        };

        let paragraphs = match &self.selectors.body {
            BodySource::Paragraphs(locator) => page.read_text_all(locator).await?,
            BodySource::Markup {
                container,
                paragraph,
            } => {
                let markup = page.read_inner_markup(container).await?;
                paragraphs_from_markup(&markup, paragraph)
                    .map_err(|reason| PageError::Query {
                        locator: Locator::css(paragraph.clone()),
                        reason,
                    })?
            }
        };
        let body = join_paragraphs(paragraphs, &self.selectors.stop_markers);
        debug!(title = %title, bytes = body.len(), "Extracted article");

        Ok(RawArticle {
            title,
            raw_date,
            body,
        })
    }

    async fn read_date<P>(&self, page: &P) -> Result<Option<String>, PageError>
    where
        P: RemotePage + ?Sized,
    {
        let raw = match &self.selectors.date {
            DateSource::Text {
                locator,
                strip_prefix,
            } => {
                let text = page.read_text(locator).await?;
                let text = text.trim();
                let text = strip_prefix
                    .as_deref()
                    .and_then(|p| text.strip_prefix(p))
                    .unwrap_or(text);
                Some(text.trim().to_string())
            }
            DateSource::Attribute { locator, name } => page.read_attribute(locator, name).await?,
        };
        Ok(raw.filter(|d| !d.is_empty()))
    }
}

/// Trim paragraphs and join them with single spaces, stopping at the first
/// paragraph that contains any stop marker. Empty paragraphs are skipped.
pub fn join_paragraphs<I, S>(paragraphs: I, stop_markers: &[String]) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    paragraphs
        .into_iter()
        .take_while(|p| !stop_markers.iter().any(|m| p.as_ref().contains(m.as_str())))
        .filter_map(|p| {
            let trimmed = p.as_ref().trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .join(" ")
}

/// Split an HTML fragment into the text of each element matching `paragraph`.
pub fn paragraphs_from_markup(markup: &str, paragraph: &str) -> Result<Vec<String>, String> {
    let selector = Selector::parse(paragraph).map_err(|e| e.to_string())?;
    let fragment = Html::parse_fragment(markup);
    Ok(fragment
        .select(&selector)
        .map(|p| p.text().collect::<String>())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::fixture::{FixturePage, FixtureWeb};
    use pretty_assertions::assert_eq;

    const URL: &str = "https://www.bloomberglinea.com.br/mercados/vale-anuncia/";

    fn markers() -> Vec<String> {
        vec!["Leia também".to_string()]
    }

    fn bloomberg_selectors() -> ArticleSelectors {
        ArticleSelectors {
            title: Locator::css("h1"),
            date: DateSource::Text {
                locator: Locator::css("small"),
                strip_prefix: None,
            },
            body: BodySource::Paragraphs(Locator::css("article p.body-paragraph")),
            stop_markers: markers(),
        }
    }

    const BLOOMBERG_HTML: &str = r#"<html><body>
        <h1> Vale anuncia dividendos </h1>
        <small>16 de Outubro, 2025 | 02:04 PM</small>
        <article>
          <p class="body-paragraph">  Primeiro parágrafo. </p>
          <p class="body-paragraph">Segundo parágrafo.</p>
          <p class="ad">Publicidade</p>
          <p class="body-paragraph">Leia também: Petrobras sobe</p>
          <p class="body-paragraph">Terceiro parágrafo.</p>
        </article>
    </body></html>"#;

    #[test]
    fn test_stop_marker_truncates_body() {
        let body = join_paragraphs(["P1", "P2", "Leia também X", "P3"], &markers());
        assert_eq!(body, "P1 P2");
    }

    #[test]
    fn test_join_skips_empty_paragraphs() {
        let body = join_paragraphs([" a ", "", "   ", "b"], &[]);
        assert_eq!(body, "a b");
    }

    #[test]
    fn test_paragraphs_from_markup_in_document_order() {
        let markup = r#"<div><p>Um</p><div class="ad">x</div><p>Dois <b>negrito</b></p></div>"#;
        let paragraphs = paragraphs_from_markup(markup, "p").unwrap();
        assert_eq!(paragraphs, vec!["Um".to_string(), "Dois negrito".to_string()]);
    }

    #[test]
    fn test_paragraphs_from_markup_rejects_bad_selector() {
        assert!(paragraphs_from_markup("<p>x</p>", "p[").is_err());
    }

    #[tokio::test]
    async fn test_extract_paragraph_body_with_stop_marker() {
        let web = FixtureWeb::new().page(URL, BLOOMBERG_HTML).shared();
        let page = FixturePage::at(web, URL);
        let raw = ArticleExtractor::new(bloomberg_selectors())
            .extract(&page)
            .await
            .unwrap();

        assert_eq!(raw.title, "Vale anuncia dividendos");
        assert_eq!(raw.raw_date.as_deref(), Some("16 de Outubro, 2025 | 02:04 PM"));
        assert_eq!(raw.body, "Primeiro parágrafo. Segundo parágrafo.");
    }

    #[tokio::test]
    async fn test_extract_is_deterministic() {
        let web = FixtureWeb::new().page(URL, BLOOMBERG_HTML).shared();
        let page = FixturePage::at(web, URL);
        let extractor = ArticleExtractor::new(bloomberg_selectors());

        let first = extractor.extract(&page).await.unwrap();
        let second = extractor.extract(&page).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_extract_markup_body_and_prefixed_date() {
        let url = "https://br.investing.com/news/stock-market-news/vale-123";
        let html = r#"<html><body>
            <h1 id="articleTitle">Vale sobe</h1>
            <div class="byline"><span class="published">Publicado 16.10.2025, 14:04</span></div>
            <div id="article"><p>Alta de 2%.</p><p>Volume forte.</p></div>
        </body></html>"#;
        let web = FixtureWeb::new().page(url, html).shared();
        let page = FixturePage::at(web, url);
        let extractor = ArticleExtractor::new(ArticleSelectors {
            title: Locator::css("#articleTitle"),
            date: DateSource::Text {
                locator: Locator::css("span.published"),
                strip_prefix: Some("Publicado ".to_string()),
            },
            body: BodySource::Markup {
                container: Locator::css("#article"),
                paragraph: "p".to_string(),
            },
            stop_markers: vec![],
        });

        let raw = extractor.extract(&page).await.unwrap();
        assert_eq!(raw.raw_date.as_deref(), Some("16.10.2025, 14:04"));
        assert_eq!(raw.body, "Alta de 2%. Volume forte.");
    }

    #[tokio::test]
    async fn test_missing_date_is_not_an_error() {
        let url = "https://investnews.com.br/economia/sem-data/";
        let html = r#"<html><body><h1 class="title">Sem data</h1>
            <div class="post-content"><p>Texto.</p></div></body></html>"#;
        let web = FixtureWeb::new().page(url, html).shared();
        let page = FixturePage::at(web, url);
        let extractor = ArticleExtractor::new(ArticleSelectors {
            title: Locator::css("h1.title"),
            date: DateSource::Attribute {
                locator: Locator::css("time"),
                name: "datetime".to_string(),
            },
            body: BodySource::Paragraphs(Locator::css("div.post-content p")),
            stop_markers: vec![],
        });

        let raw = extractor.extract(&page).await.unwrap();
        assert_eq!(raw.raw_date, None);
        assert_eq!(raw.body, "Texto.");
    }

    #[tokio::test]
    async fn test_missing_title_fails_extraction() {
        let url = "https://example.com/empty";
        let web = FixtureWeb::new()
            .page(url, "<html><body><article></article></body></html>")
            .shared();
        let page = FixturePage::at(web, url);
        let err = ArticleExtractor::new(bloomberg_selectors())
            .extract(&page)
            .await
            .unwrap_err();
        assert!(matches!(err, PageError::NotFound(_)));
    }
}
