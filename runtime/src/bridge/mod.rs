//! Execution bridge — keeps the page runtime loaded and responsive.
//!
//! Before any operation the bridge probes the tab; when the probe gets no
//! answer it injects the page runtime, waits for it to settle and probes
//! again, up to the retry ceiling. Every request is wrapped the same way:
//! a stale channel (receiver gone, context evicted by the back/forward
//! cache, channel closed) triggers reinjection and a retry of the same
//! request before the failure is surfaced.

pub mod retry;

use crate::page::access::{self, PageAccess};
use crate::page::{millis, LivePage, PageAgent, Request, Response};
use crate::types::{FieldDescriptor, PageInfo, PageScan, RowRecord};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub use retry::RetryPolicy;

/// User-facing failure from the bridge or the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("No active tab found. Please make sure you have a tab open.")]
    NoActiveTab,
    #[error("Cannot access browser internal pages. Please navigate to a regular website.")]
    RestrictedPage,
    #[error("Cannot access local files. Please navigate to a website.")]
    LocalFile,
    #[error("Page is still loading. Please wait and try again.")]
    StillLoading,
    #[error("Connection lost to the page. Please refresh the page and try again.")]
    ConnectionLost,
    #[error("Unable to access the current page. Please refresh and try again.")]
    Unreachable,
    /// The page answered but refused or failed the request.
    #[error("{0}")]
    Rejected(String),
}

impl BridgeError {
    fn from_access(access: PageAccess) -> Option<Self> {
        match access {
            PageAccess::Ok => None,
            PageAccess::BrowserInternal => Some(Self::RestrictedPage),
            PageAccess::LocalFile => Some(Self::LocalFile),
            PageAccess::Loading => Some(Self::StillLoading),
        }
    }
}

/// Resilient request channel to one tab.
pub struct ExecutionBridge<P: ?Sized> {
    agent: PageAgent<P>,
    policy: RetryPolicy,
}

impl<P: LivePage + ?Sized> ExecutionBridge<P> {
    pub fn new(page: Arc<P>, policy: RetryPolicy) -> Self {
        Self {
            agent: PageAgent::new(page),
            policy,
        }
    }

    pub fn page(&self) -> &Arc<P> {
        self.agent.page()
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Liveness probe. True when the page runtime answered.
    async fn probe(&self) -> bool {
        match self.agent.handle(Request::Ping).await {
            Ok(resp) => resp.success,
            Err(e) => {
                debug!("probe failed: {e}");
                false
            }
        }
    }

    /// Make sure the page runtime answers, injecting it if needed.
    pub async fn ensure_ready(&self) -> Result<(), BridgeError> {
        for attempt in 1..=self.policy.max_attempts.max(1) {
            if self.probe().await {
                return Ok(());
            }

            debug!(attempt, "page runtime not responding, injecting");
            match self.page().install_runtime().await {
                Ok(outcome) => {
                    debug!(attempt, ?outcome, "page runtime injected");
                    tokio::time::sleep(self.policy.settle_delay).await;
                    if self.probe().await {
                        return Ok(());
                    }
                }
                Err(e) => warn!(attempt, "injecting page runtime failed: {e}"),
            }

            if self.policy.can_retry(attempt) {
                tokio::time::sleep(self.policy.retry_delay(attempt)).await;
            }
        }

        let error = self.diagnose().await;
        warn!("page runtime unreachable: {error}");
        Err(error)
    }

    /// Pick the most specific reason the tab can't be reached.
    async fn diagnose(&self) -> BridgeError {
        match self.page().location().await {
            Ok(location) => {
                BridgeError::from_access(access::check(&location)).unwrap_or(BridgeError::Unreachable)
            }
            Err(_) => BridgeError::Unreachable,
        }
    }

    /// Send a request, reinjecting and retrying on stale channels.
    ///
    /// A reply with `success: false` is a refusal and is returned as an
    /// error without retrying, except "still loading", which is retried
    /// after the retry delay.
    pub async fn request(&self, request: Request) -> Result<Response, BridgeError> {
        let action = request.action();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.agent.handle(request.clone()).await {
                Ok(resp) if resp.success => {
                    if attempt > 1 {
                        info!(action, attempt, "request succeeded after retry");
                    }
                    return Ok(resp);
                }
                Ok(resp) => {
                    let message = resp
                        .error
                        .unwrap_or_else(|| "Page operation failed".to_string());
                    match PageAccess::from_message(&message) {
                        Some(PageAccess::Loading) if self.policy.can_retry(attempt) => {
                            debug!(action, attempt, "page still loading, retrying");
                            tokio::time::sleep(self.policy.retry_delay(attempt)).await;
                        }
                        Some(access) => {
                            return Err(BridgeError::from_access(access)
                                .unwrap_or(BridgeError::Rejected(message)))
                        }
                        None => return Err(BridgeError::Rejected(message)),
                    }
                }
                Err(e) if self.policy.can_retry(attempt) => {
                    warn!(action, attempt, "stale channel ({e}), reinjecting page runtime");
                    if let Err(e) = self.page().install_runtime().await {
                        warn!(action, attempt, "reinjection failed: {e}");
                    }
                    tokio::time::sleep(self.policy.settle_delay).await;
                }
                Err(e) => {
                    warn!(action, attempt, "giving up after stale channel: {e}");
                    return Err(BridgeError::ConnectionLost);
                }
            }
        }
    }

    pub async fn page_info(&self) -> Result<PageInfo, BridgeError> {
        self.request(Request::GetPageInfo)
            .await?
            .page_info
            .ok_or_else(|| BridgeError::Rejected("Page info missing from reply".to_string()))
    }

    /// One extraction pass over the current document.
    pub async fn extract(
        &self,
        fields: &[FieldDescriptor],
        max_rows: Option<NonZeroUsize>,
    ) -> Result<Vec<RowRecord>, BridgeError> {
        let resp = self
            .request(Request::ExtractCurrentPage {
                fields: fields.to_vec(),
                max_rows,
            })
            .await?;
        Ok(resp.data.unwrap_or_default())
    }

    /// Run the infinite-scroll driver; returns the number of scrolls.
    pub async fn scroll(&self, max_scrolls: u32, idle: Duration) -> Result<u32, BridgeError> {
        let resp = self
            .request(Request::ScrollPage {
                max_scrolls,
                idle_timeout: millis(idle),
            })
            .await?;
        Ok(resp.scrolls.unwrap_or_default())
    }

    /// Click the next-page control. `false` means there is no next page.
    pub async fn click_next(&self, next_selector: &str) -> Result<bool, BridgeError> {
        let resp = self
            .request(Request::ClickNextPage {
                next_selector: next_selector.to_string(),
            })
            .await?;
        Ok(resp.clicked.unwrap_or(false))
    }

    pub async fn scan(&self) -> Result<PageScan, BridgeError> {
        let resp = self.request(Request::ScrapePage).await?;
        Ok(PageScan {
            emails: resp.emails.unwrap_or_default(),
            phones: resp.phones.unwrap_or_default(),
            images: resp.images.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::fake::FakePage;

    const LIST: &str = r#"<html><body>
        <div class="card"><h2>Alpha</h2></div>
        <div class="card"><h2>Beta</h2></div>
    </body></html>"#;

    fn bridge(page: FakePage) -> ExecutionBridge<FakePage> {
        ExecutionBridge::new(Arc::new(page), RetryPolicy::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_page_needs_no_injection() {
        let page = FakePage::single(LIST);
        page.install_now();
        let bridge = bridge(page);
        bridge.ensure_ready().await.unwrap();
        assert_eq!(bridge.page().counters().install_calls, 0);
        assert_eq!(bridge.page().counters().probes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_page_gets_injected_once() {
        let bridge = bridge(FakePage::single(LIST));
        bridge.ensure_ready().await.unwrap();
        bridge.ensure_ready().await.unwrap();
        let counters = bridge.page().counters();
        assert_eq!(counters.installs, 1);
        assert_eq!(counters.install_calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_injection_is_noop() {
        let page = FakePage::single(LIST);
        assert_eq!(page.install_runtime().await.unwrap(), crate::page::InstallOutcome::Installed);
        assert_eq!(
            page.install_runtime().await.unwrap(),
            crate::page::InstallOutcome::AlreadyPresent
        );
        assert_eq!(page.counters().installs, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_fails_twice_then_succeeds() {
        let page = FakePage::single(LIST);
        page.install_now();
        page.fail_stale(2);
        let bridge = bridge(page);

        let rows = bridge
            .extract(&[FieldDescriptor::text("t", "h2")], None)
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        let counters = bridge.page().counters();
        assert_eq!(counters.probes, 3);
        assert_eq!(counters.html_reads, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evicted_runtime_is_restored() {
        let page = FakePage::single(LIST);
        page.install_now();
        let bridge = bridge(page);
        bridge.page().evict();

        let info = bridge.page_info().await.unwrap();
        assert_eq!(info.domain, "shop.test");
        assert_eq!(bridge.page().counters().installs, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_past_ceiling_is_connection_lost() {
        let page = FakePage::single(LIST);
        page.install_now();
        page.fail_stale(10);
        let bridge = bridge(page);

        let err = bridge.page_info().await.unwrap_err();
        assert_eq!(err, BridgeError::ConnectionLost);
        assert_eq!(bridge.page().counters().probes, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_internal_page_is_categorized() {
        let page = FakePage::single(LIST);
        page.set_url("chrome://newtab");
        page.fail_installs(10);
        let bridge = bridge(page);

        let err = bridge.ensure_ready().await.unwrap_err();
        assert_eq!(err, BridgeError::RestrictedPage);
        assert_eq!(bridge.page().counters().install_calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_regular_page() {
        let page = FakePage::single(LIST);
        page.fail_installs(10);
        let bridge = bridge(page);
        assert_eq!(bridge.ensure_ready().await.unwrap_err(), BridgeError::Unreachable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refusal_is_not_retried() {
        let page = FakePage::single(LIST);
        page.install_now();
        page.set_url("file:///tmp/list.html");
        let bridge = bridge(page);

        let err = bridge.page_info().await.unwrap_err();
        assert_eq!(err, BridgeError::LocalFile);
        assert_eq!(bridge.page().counters().probes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_page_is_retried() {
        let page = FakePage::single(LIST);
        page.install_now();
        page.set_ready_state("loading");
        let bridge = bridge(page);

        let err = bridge.page_info().await.unwrap_err();
        assert_eq!(err, BridgeError::StillLoading);
        assert_eq!(bridge.page().counters().probes, 3);
    }
}
