//! Extraction configuration, row records and run results.
//!
//! Field names on the wire follow the UI's JSON contract (`type`,
//! `maxRows`, `dedupeKey`, `_meta`, ...), so configs saved by the UI load
//! unchanged and results can be handed straight back to it.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::num::NonZeroUsize;

/// Default page budget for click-through pagination.
pub const DEFAULT_MAX_PAGES: u32 = 10;
/// Default scroll budget for infinite scroll.
pub const DEFAULT_MAX_SCROLLS: u32 = 10;
/// Default idle wait after each scroll, in milliseconds.
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 5_000;

/// How a field's value is read from its matched elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Trimmed text content.
    Text,
    /// Absolute URL from `href` / `src`.
    Url,
    /// Same resolution as [`FieldKind::Url`]; kept distinct for the UI.
    Image,
    /// A named attribute (see [`FieldDescriptor::attribute`]).
    Attribute,
}

impl FieldKind {
    /// Whether values of this kind are URLs resolved against the page origin.
    pub fn is_url(self) -> bool {
        matches!(self, Self::Url | Self::Image)
    }
}

/// One named column to extract from every row container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Column name, unique within a configuration.
    pub name: String,
    /// CSS selector, possibly a comma-separated list of alternatives.
    #[serde(default)]
    pub selector: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    /// Attribute to read when `kind` is [`FieldKind::Attribute`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl FieldDescriptor {
    pub fn text(name: &str, selector: &str) -> Self {
        Self {
            name: name.to_string(),
            selector: selector.to_string(),
            kind: FieldKind::Text,
            attribute: None,
        }
    }

    pub fn url(name: &str, selector: &str) -> Self {
        Self {
            kind: FieldKind::Url,
            ..Self::text(name, selector)
        }
    }

    pub fn attribute(name: &str, selector: &str, attribute: &str) -> Self {
        Self {
            kind: FieldKind::Attribute,
            attribute: Some(attribute.to_string()),
            ..Self::text(name, selector)
        }
    }
}

/// Pagination strategy for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type")]
pub enum PaginationConfig {
    /// Single pass over the current page.
    #[default]
    #[serde(rename = "no_pagination", alias = "none")]
    None,
    /// Extract, click "next", wait, repeat.
    #[serde(rename = "click_pagination", rename_all = "camelCase")]
    ClickThrough {
        #[serde(default = "default_max_pages", deserialize_with = "max_pages_or_default")]
        max_pages: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        next_selector: Option<String>,
    },
    /// Scroll until the document stops growing, then extract once.
    #[serde(rename = "infinite_scroll", rename_all = "camelCase")]
    InfiniteScroll {
        #[serde(default = "default_max_scrolls", deserialize_with = "max_scrolls_or_default")]
        max_scrolls: u32,
        #[serde(
            default = "default_idle_timeout",
            deserialize_with = "idle_timeout_or_default",
            alias = "idleTimeoutMs"
        )]
        idle_timeout: u64,
    },
}

impl PaginationConfig {
    /// Wire name of the strategy, as used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "no_pagination",
            Self::ClickThrough { .. } => "click_pagination",
            Self::InfiniteScroll { .. } => "infinite_scroll",
        }
    }

    /// Zero budgets and timeouts replaced by their defaults.
    pub fn normalized(&self) -> Self {
        match self {
            Self::None => Self::None,
            Self::ClickThrough {
                max_pages,
                next_selector,
            } => Self::ClickThrough {
                max_pages: nonzero_or(*max_pages, DEFAULT_MAX_PAGES),
                next_selector: next_selector.clone(),
            },
            Self::InfiniteScroll {
                max_scrolls,
                idle_timeout,
            } => Self::InfiniteScroll {
                max_scrolls: nonzero_or(*max_scrolls, DEFAULT_MAX_SCROLLS),
                idle_timeout: nonzero_or(*idle_timeout, DEFAULT_IDLE_TIMEOUT_MS),
            },
        }
    }
}

fn nonzero_or<T: Default + PartialEq>(value: T, fallback: T) -> T {
    if value == T::default() {
        fallback
    } else {
        value
    }
}

// An explicit 0 on the wire means "use the default".
fn max_pages_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(nonzero_or(u32::deserialize(deserializer)?, DEFAULT_MAX_PAGES))
}

fn max_scrolls_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(nonzero_or(u32::deserialize(deserializer)?, DEFAULT_MAX_SCROLLS))
}

fn idle_timeout_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(nonzero_or(u64::deserialize(deserializer)?, DEFAULT_IDLE_TIMEOUT_MS))
}

fn default_max_pages() -> u32 {
    DEFAULT_MAX_PAGES
}

fn default_max_scrolls() -> u32 {
    DEFAULT_MAX_SCROLLS
}

fn default_idle_timeout() -> u64 {
    DEFAULT_IDLE_TIMEOUT_MS
}

/// A complete extraction request from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionConfig {
    pub fields: Vec<FieldDescriptor>,
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Row cap per extraction pass; `None` is unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rows: Option<NonZeroUsize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedupe_key: Option<String>,
}

/// Provenance of one extracted row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowMeta {
    pub source_url: String,
    pub page_index: usize,
    pub row_index: usize,
    pub extracted_at: DateTime<Utc>,
}

/// Field values for one container, in field order, plus where they came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRecord {
    #[serde(flatten)]
    pub values: IndexMap<String, String>,
    #[serde(rename = "_meta")]
    pub meta: RowMeta,
}

impl RowRecord {
    /// Value of a field, if the field was part of the configuration.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// True when at least one field produced a non-empty value.
    pub fn has_data(&self) -> bool {
        self.values.values().any(|v| !v.is_empty())
    }
}

/// Counters reported with every result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionStats {
    pub total_pages: usize,
    pub total_rows: usize,
    pub duplicates_removed: usize,
    #[serde(rename = "errors")]
    pub error_count: usize,
}

/// Wall-clock timing of a run, in Unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    pub start_time: i64,
    pub end_time: i64,
    #[serde(rename = "duration")]
    pub duration_ms: i64,
}

/// Outcome of one orchestrator call.
///
/// `stats.total_rows + stats.duplicates_removed` always equals the number
/// of rows produced before deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub success: bool,
    #[serde(rename = "data")]
    pub rows: Vec<RowRecord>,
    pub stats: ExtractionStats,
    pub errors: Vec<String>,
    pub performance: Performance,
}

/// Basic facts about the page in the active tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub url: String,
    pub title: String,
    pub domain: String,
    #[serde(default)]
    pub accessible: bool,
    #[serde(default)]
    pub ready_state: String,
}

/// Contact details and images found anywhere on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PageScan {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub images: Vec<String>,
}
