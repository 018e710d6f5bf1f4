//! Small helpers for link handling and log formatting.

use url::Url;

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes, on a character boundary,
/// with an ellipsis and the number of dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}

/// Turn a scraped `href` into an absolute URL.
///
/// Absolute links are returned byte-for-byte as written; the stored hash
/// covers the raw href. Relative ones are joined onto `base`.
/// Empty links, fragments, and `javascript:` pseudo-links yield `None`.
pub fn resolve_link(base: Option<&Url>, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    match Url::parse(href) {
        Ok(_) => Some(href.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            base.and_then(|b| b.join(href).ok()).map(|u| u.to_string())
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        let result = truncate_for_log("ação", 2);
        assert_eq!(result, "a…(+5 bytes)");
    }

    #[test]
    fn test_resolve_absolute_link() {
        assert_eq!(
            resolve_link(None, " https://investnews.com.br/economia/vale/ "),
            Some("https://investnews.com.br/economia/vale/".to_string())
        );
    }

    #[test]
    fn test_resolve_keeps_absolute_href_unnormalized() {
        let href = "https://www.bloomberglinea.com.br/mercados/ação-da-vale-sobe/";
        assert_eq!(resolve_link(None, href), Some(href.to_string()));
        assert_eq!(
            resolve_link(None, "HTTPS://Investnews.com.br"),
            Some("HTTPS://Investnews.com.br".to_string())
        );
    }

    #[test]
    fn test_resolve_relative_link() {
        let base = Url::parse("https://br.investing.com/equities/vale-on-n1-news/3").unwrap();
        assert_eq!(
            resolve_link(Some(&base), "/news/stock-market-news/vale-123"),
            Some("https://br.investing.com/news/stock-market-news/vale-123".to_string())
        );
        assert_eq!(resolve_link(None, "/news/vale-123"), None);
    }

    #[test]
    fn test_resolve_skips_non_links() {
        assert_eq!(resolve_link(None, ""), None);
        assert_eq!(resolve_link(None, "#top"), None);
        assert_eq!(resolve_link(None, "javascript:void(0)"), None);
    }
}
