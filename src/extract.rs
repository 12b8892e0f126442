//! Page-text extraction.
//!
//! Turns raw HTML into the plain text the chunker and chat grounding work
//! from. Script, style, and template contents are dropped; everything else
//! is flattened into newline-separated text segments.

use scraper::{ElementRef, Html, Selector};

/// Tags whose text content is never page prose.
const SKIP_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// The plain-text view of one page.
#[derive(Clone, Debug, PartialEq)]
pub struct PageExtract {
    /// The document title, when the page declares one.
    pub title: Option<String>,
    /// Flattened body text, one segment per line.
    pub text: String,
}

/// Extract the readable text of an HTML document.
///
/// Extraction is infallible: malformed markup is parsed leniently and a
/// document without a body falls back to the whole tree.
#[must_use]
pub fn extract_text(html: &str) -> PageExtract {
    let document = Html::parse_document(html);

    let title = Selector::parse("title")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty());

    let root = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut segments: Vec<String> = Vec::new();
    for node in root.descendants() {
        let scraper::Node::Text(text) = node.value() else {
            continue;
        };
        let skipped = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|element| SKIP_TAGS.contains(&element.value().name()));
        if skipped {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            segments.push(trimmed.to_string());
        }
    }

    PageExtract {
        title,
        text: segments.join("\n"),
    }
}
