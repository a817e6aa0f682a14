//! Page extraction pass — discovery plus field extraction over one snapshot.

use crate::extraction::discovery;
use crate::extraction::fields::extract_field;
use crate::types::{FieldDescriptor, RowMeta, RowRecord};
use chrono::Utc;
use indexmap::IndexMap;
use scraper::Html;
use std::num::NonZeroUsize;
use tracing::{debug, warn};
use url::Url;

/// Extract rows from a serialized document.
///
/// `row_index` is the container's position in discovery order, so indices
/// can skip over containers that produced no data. Rows with every field
/// empty are dropped. Stops once `max_rows` rows are collected.
pub fn extract_rows(
    html: &str,
    source_url: &str,
    fields: &[FieldDescriptor],
    max_rows: Option<NonZeroUsize>,
) -> Vec<RowRecord> {
    let Ok(base) = Url::parse(source_url) else {
        warn!(url = source_url, "page URL does not parse, skipping extraction");
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let containers = discovery::discover(&document);
    let cap = max_rows.map_or(usize::MAX, NonZeroUsize::get);

    let mut rows = Vec::new();
    for (row_index, container) in containers.elements.iter().enumerate() {
        if rows.len() >= cap {
            break;
        }

        let mut values = IndexMap::with_capacity(fields.len());
        for field in fields.iter().filter(|f| !f.name.is_empty()) {
            values.insert(field.name.clone(), extract_field(*container, field, &base));
        }

        let row = RowRecord {
            values,
            meta: RowMeta {
                source_url: source_url.to_string(),
                page_index: 0,
                row_index,
                extracted_at: Utc::now(),
            },
        };
        if row.has_data() {
            rows.push(row);
        }
    }

    debug!(
        strategy = ?containers.strategy,
        containers = containers.elements.len(),
        rows = rows.len(),
        "extraction pass complete"
    );
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARDS: &str = r#"<html><body>
        <div class="card"><h2 class="title">Alpha</h2><a class="link" href="/a">go</a></div>
        <div class="card"><h2 class="title">Beta</h2><a class="link" href="/b">go</a></div>
        <div class="card"><h2 class="title">Gamma</h2><a class="link" href="https://other.test/g">go</a></div>
    </body></html>"#;

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::text("t", "h2.title"),
            FieldDescriptor::url("u", "a.link"),
        ]
    }

    #[test]
    fn test_cards_end_to_end() {
        let rows = extract_rows(CARDS, "https://shop.test/list", &fields(), NonZeroUsize::new(10));
        assert_eq!(rows.len(), 3);
        let titles: Vec<&str> = rows.iter().filter_map(|r| r.get("t")).collect();
        assert_eq!(titles, vec!["Alpha", "Beta", "Gamma"]);
        for row in &rows {
            assert!(row.get("u").unwrap().starts_with("https://"));
            assert_eq!(row.meta.page_index, 0);
            assert_eq!(row.meta.source_url, "https://shop.test/list");
        }
        assert_eq!(rows[0].get("u"), Some("https://shop.test/a"));
        let indices: Vec<usize> = rows.iter().map(|r| r.meta.row_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_max_rows_caps_pass() {
        let rows = extract_rows(CARDS, "https://shop.test/list", &fields(), NonZeroUsize::new(2));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("t"), Some("Beta"));
    }

    #[test]
    fn test_empty_rows_dropped_indices_kept() {
        let html = r#"<html><body>
            <div class="card"><h2 class="title">Alpha</h2></div>
            <div class="card"><p>no title here</p></div>
            <div class="card"><h2 class="title">Gamma</h2></div>
        </body></html>"#;
        let rows = extract_rows(html, "https://shop.test/", &fields(), None);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(RowRecord::has_data));
        assert_eq!(rows[1].meta.row_index, 2);
        assert_eq!(rows[1].get("u"), Some(""));
    }

    #[test]
    fn test_values_follow_field_order() {
        let f = vec![
            FieldDescriptor::text("title", "h2.title"),
            FieldDescriptor::url("link", "a.link"),
            FieldDescriptor::text("blurb", "p"),
        ];
        let rows = extract_rows(CARDS, "https://shop.test/", &f, None);
        let keys: Vec<&str> = rows[0].values.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["title", "link", "blurb"]);

        let json = serde_json::to_string(&rows[0]).unwrap();
        assert!(json.find("\"title\"") < json.find("\"link\""), "{json}");
    }

    #[test]
    fn test_nameless_field_is_skipped() {
        let mut f = fields();
        f.push(FieldDescriptor::text("", "h2"));
        let rows = extract_rows(CARDS, "https://shop.test/", &f, None);
        assert_eq!(rows[0].values.len(), 2);
    }

    #[test]
    fn test_bad_selector_does_not_abort_row() {
        let mut f = fields();
        f.push(FieldDescriptor::text("broken", "h2[["));
        let rows = extract_rows(CARDS, "https://shop.test/", &f, None);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].get("broken"), Some(""));
        assert_eq!(rows[0].get("t"), Some("Alpha"));
    }

    #[test]
    fn test_unparseable_source_url_yields_nothing() {
        let rows = extract_rows(CARDS, "not a url", &fields(), None);
        assert!(rows.is_empty());
    }
}
