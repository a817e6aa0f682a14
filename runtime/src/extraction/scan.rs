//! Whole-page scan for e-mail addresses, phone numbers and images.

use crate::extraction::fields::resolve_url;
use crate::types::PageScan;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap()
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{10,15}\b").unwrap());

static IMG: LazyLock<Option<Selector>> = LazyLock::new(|| Selector::parse("img[src]").ok());
static BODY: LazyLock<Option<Selector>> = LazyLock::new(|| Selector::parse("body").ok());

/// E-mail addresses in `text`, first-seen order, no repeats.
pub fn find_emails(text: &str) -> Vec<String> {
    unique(EMAIL_RE.find_iter(text).map(|m| m.as_str().to_string()))
}

/// Runs of 10 to 15 digits in `text`.
pub fn find_phone_numbers(text: &str) -> Vec<String> {
    unique(PHONE_RE.find_iter(text).map(|m| m.as_str().to_string()))
}

/// Scan a serialized document.
pub fn scan_document(html: &str, page_url: &str) -> PageScan {
    let document = Html::parse_document(html);

    // Visible text only: script and style bodies would produce noise.
    let text = BODY
        .as_ref()
        .and_then(|sel| document.select(sel).next())
        .map(|body| {
            body.descendants()
                .filter_map(|node| {
                    let parent = node.parent()?.value().as_element()?.name();
                    if matches!(parent, "script" | "style" | "noscript") {
                        return None;
                    }
                    node.value().as_text().map(|t| t.to_string())
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();

    let base = Url::parse(page_url).ok();
    let images = IMG
        .as_ref()
        .map(|sel| {
            document
                .select(sel)
                .filter_map(|img| {
                    let src = img.value().attr("src")?.trim();
                    if src.is_empty() {
                        return None;
                    }
                    match &base {
                        Some(base) => resolve_url(src, base),
                        None => Some(src.to_string()),
                    }
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    PageScan {
        emails: find_emails(&text),
        phones: find_phone_numbers(&text),
        images: unique(images),
    }
}

fn unique(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
