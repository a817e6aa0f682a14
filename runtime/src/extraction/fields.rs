//! Field extractor — read one configured field out of one row container.

use crate::extraction::discovery::text_content;
use crate::types::{FieldDescriptor, FieldKind};
use scraper::{ElementRef, Selector};
use tracing::warn;
use url::Url;

/// Separator between values when a selector matches several elements.
pub const VALUE_SEPARATOR: &str = " | ";

/// Why a field produced no value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// No alternative in the selector list parses.
    #[error("invalid selector: {0}")]
    InvalidSelector(String),
    #[error("attribute field has no attribute name")]
    MissingAttributeName,
}

/// Extract a field from a container, logging and swallowing field errors.
///
/// Never fails: a broken field yields an empty string and the rest of the
/// row is unaffected.
pub fn extract_field(container: ElementRef<'_>, field: &FieldDescriptor, base: &Url) -> String {
    match try_extract_field(container, field, base) {
        Ok(value) => value,
        Err(e) => {
            warn!(field = %field.name, selector = %field.selector, "field extraction failed: {e}");
            String::new()
        }
    }
}

/// Extract a field, surfacing configuration and selector errors.
pub fn try_extract_field(
    container: ElementRef<'_>,
    field: &FieldDescriptor,
    base: &Url,
) -> Result<String, FieldError> {
    let selector = field.selector.trim();
    if selector.is_empty() {
        return Ok(String::new());
    }

    let attribute = match field.kind {
        FieldKind::Attribute => match field.attribute.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Some(name),
            _ => return Err(FieldError::MissingAttributeName),
        },
        _ => None,
    };

    let matches = resolve_matches(container, selector)?;

    let values = matches.into_iter().filter_map(|el| {
        let value = match (field.kind, attribute) {
            (kind, _) if kind.is_url() => element_url(el, base),
            (FieldKind::Attribute, Some(name)) => el.value().attr(name).map(str::to_string),
            _ => Some(text_content(el).trim().to_string()),
        };
        value.filter(|v| !v.is_empty())
    });

    Ok(values.collect::<Vec<_>>().join(VALUE_SEPARATOR))
}

/// Elements under `container` matching `selector`, with comma fallback.
///
/// The full selector list is tried first. When it matches nothing (or does
/// not parse) and contains commas, each alternative is tried on its own and
/// the first one with a match wins.
fn resolve_matches<'a>(
    container: ElementRef<'a>,
    selector: &str,
) -> Result<Vec<ElementRef<'a>>, FieldError> {
    let whole = Selector::parse(selector).ok();
    if let Some(sel) = &whole {
        let found = select_descendants(container, sel);
        if !found.is_empty() || !selector.contains(',') {
            return Ok(found);
        }
    } else if !selector.contains(',') {
        return Err(FieldError::InvalidSelector(selector.to_string()));
    }

    let mut any_parsed = whole.is_some();
    for alternative in selector.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let Ok(sel) = Selector::parse(alternative) else {
            warn!(selector = alternative, "skipping unparseable selector alternative");
            continue;
        };
        any_parsed = true;
        let found = select_descendants(container, &sel);
        if !found.is_empty() {
            return Ok(found);
        }
    }

    if any_parsed {
        Ok(Vec::new())
    } else {
        Err(FieldError::InvalidSelector(selector.to_string()))
    }
}

/// `querySelectorAll` semantics: descendants only, never the container itself.
fn select_descendants<'a>(container: ElementRef<'a>, selector: &Selector) -> Vec<ElementRef<'a>> {
    container
        .select(selector)
        .filter(|el| el.id() != container.id())
        .collect()
}

/// Absolute URL carried by an element.
///
/// Anchors use `href`, images use `src`, anything else takes `href` then
/// `src`. Relative references resolve against the page origin.
fn element_url(el: ElementRef<'_>, base: &Url) -> Option<String> {
    let node = el.value();
    let raw = match node.name() {
        "a" => node.attr("href"),
        "img" => node.attr("src"),
        _ => node
            .attr("href")
            .filter(|v| !v.is_empty())
            .or_else(|| node.attr("src")),
    }?;

    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    resolve_url(raw, base)
}

/// Resolve a reference against the origin of `page`.
pub fn resolve_url(reference: &str, page: &Url) -> Option<String> {
    let origin = page.origin();
    let base = if origin.is_tuple() {
        Url::parse(&origin.ascii_serialization()).ok()
    } else {
        None
    };
    base.as_ref()
        .unwrap_or(page)
        .join(reference)
        .ok()
        .map(String::from)
}
