//! HTML parser for extracting links and page text
//!
//! This module handles parsing fetched HTML to extract:
//! - Links to follow (from `<a>` tags and canonical links)
//! - The page's visible text, cleaned for the corpus

use scraper::{Html, Node, Selector};
use url::Url;

/// Elements whose text content is never part of the rendered page
const NON_TEXT_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// Cleaned visible text (may be empty)
    pub text: String,

    /// All links found on the page (absolute URLs)
    pub links: Vec<String>,
}

/// Parses HTML content and extracts text and links
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links
///
/// # Example
///
/// ```
/// use corpus_harvester::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><body><p> Сайн байна уу </p><a href="/page">Дараах</a></body></html>"#;
/// let base_url = Url::parse("https://example.mn/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.text, "Сайн байна уу Дараах");
/// assert_eq!(parsed.links, vec!["https://example.mn/page".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        text: extract_text(&document),
        links: extract_links(&document, base_url),
    }
}

/// Collects the visible text of the document body
///
/// Every text leaf under `<body>` is trimmed; blank and single-character
/// fragments are dropped; the rest are joined with single spaces and any
/// remaining runs of whitespace are collapsed.
pub fn extract_text(document: &Html) -> String {
    let Ok(body_selector) = Selector::parse("body") else {
        return String::new();
    };

    let mut fragments: Vec<&str> = Vec::new();

    for body in document.select(&body_selector) {
        for node in body.descendants() {
            let Node::Text(text) = node.value() else {
                continue;
            };

            let hidden = node
                .parent()
                .and_then(|parent| parent.value().as_element().map(|e| e.name()))
                .map(|name| NON_TEXT_ELEMENTS.contains(&name))
                .unwrap_or(false);
            if hidden {
                continue;
            }

            let fragment = text.trim();
            if fragment.chars().count() > 1 {
                fragments.push(fragment);
            }
        }
    }

    fragments
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => {
            Some(absolute_url.to_string())
        }
        _ => None,
    }
}
