//! Extraction orchestrator — the caller-facing entry points.
//!
//! Picks the pagination strategy, drives the execution bridge page by page,
//! accumulates rows, deduplicates them and reports stats. Failures are
//! caught here: the result then has `success: false`, the message in
//! `errors`, and every row gathered before the failure.

pub mod dedupe;

use crate::bridge::{BridgeError, ExecutionBridge, RetryPolicy};
use crate::page::access;
use crate::page::LivePage;
use crate::settings::{HarvestSettings, PaginationSettings};
use crate::types::{
    ExtractionConfig, ExtractionResult, ExtractionStats, PageInfo, PageScan, PaginationConfig,
    Performance, RowRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, warn, Instrument};

pub use dedupe::dedupe;

/// Source of the tab the orchestrator works on.
#[async_trait]
pub trait TabProvider: Send + Sync {
    type Page: LivePage + 'static;

    /// The currently active tab, if any.
    async fn active_tab(&self) -> Option<Arc<Self::Page>>;
}

/// Accumulator for one orchestrator call.
struct RunLog {
    started: DateTime<Utc>,
    rows: Vec<RowRecord>,
    errors: Vec<String>,
    pages: usize,
}

impl RunLog {
    fn start() -> Self {
        Self {
            started: Utc::now(),
            rows: Vec::new(),
            errors: Vec::new(),
            pages: 0,
        }
    }

    fn record_page(&mut self, rows: Vec<RowRecord>) {
        self.pages += 1;
        self.rows.extend(rows);
    }

    fn fail(&mut self, error: BridgeError) {
        warn!("extraction failed: {error}");
        self.errors.push(error.to_string());
    }

    fn finish(self, dedupe_key: Option<&str>) -> ExtractionResult {
        let (rows, duplicates_removed) = dedupe(self.rows, dedupe_key);
        let ended = Utc::now();
        let result = ExtractionResult {
            success: self.errors.is_empty(),
            stats: ExtractionStats {
                total_pages: self.pages,
                total_rows: rows.len(),
                duplicates_removed,
                error_count: self.errors.len(),
            },
            rows,
            errors: self.errors,
            performance: Performance {
                start_time: self.started.timestamp_millis(),
                end_time: ended.timestamp_millis(),
                duration_ms: (ended - self.started).num_milliseconds(),
            },
        };
        info!(
            success = result.success,
            pages = result.stats.total_pages,
            rows = result.stats.total_rows,
            duplicates = result.stats.duplicates_removed,
            "extraction finished"
        );
        result
    }
}

/// Runs extractions against the active tab of a [`TabProvider`].
pub struct Orchestrator<T> {
    tabs: T,
    policy: RetryPolicy,
    timings: PaginationSettings,
}

impl<T: TabProvider> Orchestrator<T> {
    pub fn new(tabs: T, settings: &HarvestSettings) -> Self {
        Self {
            tabs,
            policy: RetryPolicy::from(&settings.bridge),
            timings: settings.pagination.clone(),
        }
    }

    pub fn tabs(&self) -> &T {
        &self.tabs
    }

    pub fn into_tabs(self) -> T {
        self.tabs
    }

    /// Validate the active tab and get a ready bridge to it.
    async fn connect(&self) -> Result<ExecutionBridge<T::Page>, BridgeError> {
        let page = self.tabs.active_tab().await.ok_or(BridgeError::NoActiveTab)?;
        let location = page.location().await.map_err(|e| {
            warn!("reading tab location failed: {e}");
            BridgeError::Unreachable
        })?;
        if access::is_internal_url(&location.url) {
            return Err(BridgeError::RestrictedPage);
        }

        let bridge = ExecutionBridge::new(page, self.policy);
        bridge.ensure_ready().await?;
        debug!(url = %location.url, "bridge ready");
        Ok(bridge)
    }

    /// One pass over the current page.
    pub async fn extract_single_page(&self, config: &ExtractionConfig) -> ExtractionResult {
        let span = info_span!("extract", run = %uuid::Uuid::new_v4(), mode = "single_page");
        async {
            let mut run = RunLog::start();
            match self.single_pass(config).await {
                Ok(rows) => run.record_page(rows),
                Err(e) => run.fail(e),
            }
            run.finish(config.dedupe_key.as_deref())
        }
        .instrument(span)
        .await
    }

    async fn single_pass(&self, config: &ExtractionConfig) -> Result<Vec<RowRecord>, BridgeError> {
        let bridge = self.connect().await?;
        bridge.extract(&config.fields, config.max_rows).await
    }

    /// Extract with the configured pagination strategy.
    pub async fn extract_with_pagination(&self, config: &ExtractionConfig) -> ExtractionResult {
        let pagination = config.pagination.normalized();
        let (max_pages, next_selector) = match &pagination {
            PaginationConfig::None => return self.extract_single_page(config).await,
            PaginationConfig::InfiniteScroll {
                max_scrolls,
                idle_timeout,
            } => {
                return self
                    .extract_after_scrolling(config, *max_scrolls, Duration::from_millis(*idle_timeout))
                    .await
            }
            PaginationConfig::ClickThrough {
                max_pages,
                next_selector,
            } => (*max_pages, next_selector.as_deref()),
        };

        let span = info_span!(
            "extract",
            run = %uuid::Uuid::new_v4(),
            mode = config.pagination.kind(),
            max_pages
        );
        async {
            let mut run = RunLog::start();
            if let Err(e) = self.click_through(&mut run, config, max_pages, next_selector).await {
                run.fail(e);
            }
            run.finish(config.dedupe_key.as_deref())
        }
        .instrument(span)
        .await
    }

    async fn extract_after_scrolling(
        &self,
        config: &ExtractionConfig,
        max_scrolls: u32,
        idle: Duration,
    ) -> ExtractionResult {
        let span = info_span!(
            "extract",
            run = %uuid::Uuid::new_v4(),
            mode = config.pagination.kind(),
            max_scrolls
        );
        async {
            let mut run = RunLog::start();
            let outcome = async {
                let bridge = self.connect().await?;
                let scrolls = bridge.scroll(max_scrolls, idle).await?;
                info!(scrolls, "scrolling finished");
                bridge.ensure_ready().await?;
                bridge.extract(&config.fields, config.max_rows).await
            }
            .await;
            match outcome {
                Ok(rows) => run.record_page(rows),
                Err(e) => run.fail(e),
            }
            run.finish(config.dedupe_key.as_deref())
        }
        .instrument(span)
        .await
    }

    /// Extract, click "next", settle, repeat. Rows land in `run` as they
    /// are extracted so an error keeps earlier pages.
    async fn click_through(
        &self,
        run: &mut RunLog,
        config: &ExtractionConfig,
        max_pages: u32,
        next_selector: Option<&str>,
    ) -> Result<(), BridgeError> {
        let bridge = self.connect().await?;
        let next_selector = next_selector.map(str::trim).filter(|s| !s.is_empty());
        let max_pages = max_pages as usize;

        for page_index in 0..max_pages {
            bridge.ensure_ready().await?;
            let mut rows = bridge.extract(&config.fields, config.max_rows).await?;
            for row in &mut rows {
                row.meta.page_index = page_index;
            }
            debug!(page_index, rows = rows.len(), "page extracted");
            run.record_page(rows);

            let Some(selector) = next_selector else {
                break;
            };
            if page_index + 1 >= max_pages {
                debug!("page budget spent");
                break;
            }

            bridge.ensure_ready().await?;
            if !bridge.click_next(selector).await? {
                info!(page_index, "no next page, stopping");
                break;
            }
            tokio::time::sleep(Duration::from_millis(self.timings.click_settle_ms)).await;
        }
        Ok(())
    }

    /// Facts about the active tab, after a short grace delay.
    pub async fn current_page_info(&self) -> Result<PageInfo, BridgeError> {
        tokio::time::sleep(Duration::from_millis(self.timings.page_info_delay_ms)).await;
        let bridge = self.connect().await?;
        bridge.page_info().await
    }

    /// E-mails, phone numbers and images found on the active tab.
    pub async fn scan_page(&self) -> Result<PageScan, BridgeError> {
        let bridge = self.connect().await?;
        bridge.scan().await
    }
}
