//! Order-preserving row deduplication by a key field.

use crate::types::RowRecord;
use std::collections::HashSet;

/// Normalized key of a row: trimmed, lowercased, `None` when absent or blank.
fn normalized_key(row: &RowRecord, key: &str) -> Option<String> {
    row.get(key)
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty())
}

/// Drop rows whose key was already seen. First occurrence wins; rows
/// without a key value are always kept.
///
/// Returns the surviving rows and how many were removed.
pub fn dedupe(rows: Vec<RowRecord>, key: Option<&str>) -> (Vec<RowRecord>, usize) {
    let Some(key) = key.filter(|k| !k.is_empty()) else {
        return (rows, 0);
    };
    if rows.is_empty() {
        return (rows, 0);
    }

    let before = rows.len();
    let mut seen = HashSet::new();
    let kept: Vec<RowRecord> = rows
        .into_iter()
        .filter(|row| match normalized_key(row, key) {
            Some(k) => seen.insert(k),
            None => true,
        })
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RowMeta;
    use chrono::Utc;

    fn row(index: usize, title: Option<&str>) -> RowRecord {
        let mut values = indexmap::IndexMap::new();
        values.insert("price".to_string(), format!("{index}.00"));
        if let Some(title) = title {
            values.insert("title".to_string(), title.to_string());
        }
        RowRecord {
            values,
            meta: RowMeta {
                source_url: "https://shop.test/list".to_string(),
                page_index: 0,
                row_index: index,
                extracted_at: Utc::now(),
            },
        }
    }

    fn indices(rows: &[RowRecord]) -> Vec<usize> {
        rows.iter().map(|r| r.meta.row_index).collect()
    }

    #[test]
    fn test_no_key_is_passthrough() {
        let rows = vec![row(0, Some("a")), row(1, Some("a"))];
        let (kept, removed) = dedupe(rows, None);
        assert_eq!(kept.len(), 2);
        assert_eq!(removed, 0);
    }

    #[test]
    fn test_normalized_first_wins() {
        let rows = vec![
            row(0, Some("Blue Mug")),
            row(1, Some("  blue mug ")),
            row(2, Some("Red Mug")),
            row(3, Some("BLUE MUG")),
        ];
        let (kept, removed) = dedupe(rows, Some("title"));
        assert_eq!(indices(&kept), vec![0, 2]);
        assert_eq!(removed, 2);
    }

    #[test]
    fn test_missing_and_blank_keys_kept() {
        let rows = vec![
            row(0, None),
            row(1, None),
            row(2, Some("   ")),
            row(3, Some("")),
            row(4, Some("x")),
        ];
        let (kept, removed) = dedupe(rows, Some("title"));
        assert_eq!(indices(&kept), vec![0, 1, 2, 3, 4]);
        assert_eq!(removed, 0);
    }

    #[test]
    fn test_idempotent_and_counts_add_up() {
        let rows: Vec<RowRecord> = (0..12)
            .map(|i| row(i, Some(["a", "b", "A ", "c"][i % 4])))
            .collect();
        let before = rows.len();

        let (once, removed) = dedupe(rows, Some("title"));
        assert_eq!(once.len() + removed, before);

        let (twice, removed_again) = dedupe(once.clone(), Some("title"));
        assert_eq!(removed_again, 0);
        assert_eq!(indices(&twice), indices(&once));
        assert_eq!(indices(&once), vec![0, 1, 3]);
    }
}
