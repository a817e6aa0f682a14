//! Container discovery — find the repeating elements that hold one row each.
//!
//! No knowledge of the page structure is assumed. Strategies, first match
//! wins:
//!
//! 1. **Marker selectors** -- a fixed, ordered list of common item/card/row
//!    markers. The first selector matching more than one element is used, so
//!    a singleton wrapper is never mistaken for a repeated row.
//! 2. **Text-bearing elements** -- every element with at least one child
//!    element and more than [`MIN_TEXT_CHARS`] characters of trimmed text.
//! 3. **Body** -- the whole page as a single row.

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::debug;

/// Marker selectors tried in order.
pub const CONTAINER_SELECTORS: &[&str] = &[
    "[data-item]",
    ".item",
    ".card",
    ".product",
    ".listing",
    "article",
    "tr",
    ".row",
    ".result",
    "[class*=\"item\"]",
    "[class*=\"post\"]",
    "[class*=\"entry\"]",
    "[id*=\"item\"]",
    "[data-testid*=\"item\"]",
];

/// Trimmed text length an element must exceed to count as structured content.
pub const MIN_TEXT_CHARS: usize = 20;

static COMPILED_SELECTORS: LazyLock<Vec<(&'static str, Selector)>> = LazyLock::new(|| {
    CONTAINER_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok().map(|sel| (*s, sel)))
        .collect()
});

static ANY_ELEMENT: LazyLock<Option<Selector>> = LazyLock::new(|| Selector::parse("*").ok());
static BODY: LazyLock<Option<Selector>> = LazyLock::new(|| Selector::parse("body").ok());

/// Which strategy produced the candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// A marker selector from [`CONTAINER_SELECTORS`].
    Marker(&'static str),
    TextHeuristic,
    Body,
    /// Not even a body element; nothing to extract from.
    Empty,
}

/// Row candidates in document order, with the strategy that found them.
pub struct Containers<'a> {
    pub strategy: Strategy,
    pub elements: Vec<ElementRef<'a>>,
}

/// Locate row candidates in a parsed document.
pub fn discover(document: &Html) -> Containers<'_> {
    for (raw, selector) in COMPILED_SELECTORS.iter() {
        let matches: Vec<ElementRef<'_>> = document.select(selector).collect();
        if matches.len() > 1 {
            debug!(selector = raw, count = matches.len(), "containers from marker selector");
            return Containers {
                strategy: Strategy::Marker(raw),
                elements: matches,
            };
        }
    }

    if let Some(any) = ANY_ELEMENT.as_ref() {
        let structured: Vec<ElementRef<'_>> =
            document.select(any).filter(|el| is_structured(*el)).collect();
        if !structured.is_empty() {
            debug!(count = structured.len(), "containers from text heuristic");
            return Containers {
                strategy: Strategy::TextHeuristic,
                elements: structured,
            };
        }
    }

    match BODY.as_ref().and_then(|sel| document.select(sel).next()) {
        Some(body) => {
            debug!("no repeating containers, using body");
            Containers {
                strategy: Strategy::Body,
                elements: vec![body],
            }
        }
        None => Containers {
            strategy: Strategy::Empty,
            elements: Vec::new(),
        },
    }
}

/// Has a child element and enough text to be a record.
fn is_structured(el: ElementRef<'_>) -> bool {
    let has_child_element = el.children().any(|child| child.value().is_element());
    has_child_element && text_content(el).trim().chars().count() > MIN_TEXT_CHARS
}

/// Concatenated descendant text, like DOM `textContent`.
pub fn text_content(el: ElementRef<'_>) -> String {
    el.text().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_selector_needs_more_than_one_match() {
        let html = r#"<html><body>
            <div class="card"><h2>Only card</h2></div>
            <article><p>First article body</p></article>
            <article><p>Second article body</p></article>
        </body></html>"#;
        let doc = Html::parse_document(html);
        let found = discover(&doc);
        assert_eq!(found.strategy, Strategy::Marker("article"));
        assert_eq!(found.elements.len(), 2);
    }

    #[test]
    fn test_marker_order_wins() {
        let html = r#"<html><body>
            <div class="item">a</div><div class="item">b</div>
            <div class="card">c</div><div class="card">d</div><div class="card">e</div>
        </body></html>"#;
        let doc = Html::parse_document(html);
        let found = discover(&doc);
        assert_eq!(found.strategy, Strategy::Marker(".item"));
        assert_eq!(found.elements.len(), 2);
    }

    #[test]
    fn test_partial_class_match() {
        let html = r#"<html><body>
            <div class="blog-post-wrapper">one</div>
            <div class="blog-post-wrapper">two</div>
        </body></html>"#;
        let doc = Html::parse_document(html);
        let found = discover(&doc);
        assert_eq!(found.strategy, Strategy::Marker("[class*=\"post\"]"));
    }

    #[test]
    fn test_text_heuristic_fallback() {
        let html = r#"<html><body>
            <section><span>This section has plenty of readable text</span></section>
            <div>short</div>
        </body></html>"#;
        let doc = Html::parse_document(html);
        let found = discover(&doc);
        assert_eq!(found.strategy, Strategy::TextHeuristic);
        // html, body and section all qualify; the bare div has no child element.
        let names: Vec<&str> = found.elements.iter().map(|e| e.value().name()).collect();
        assert_eq!(names, vec!["html", "body", "section"]);
    }

    #[test]
    fn test_body_fallback() {
        let doc = Html::parse_document("<html><body>tiny</body></html>");
        let found = discover(&doc);
        assert_eq!(found.strategy, Strategy::Body);
        assert_eq!(found.elements.len(), 1);
        assert_eq!(found.elements[0].value().name(), "body");
    }
}
