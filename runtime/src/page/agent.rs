//! Page agent — answers protocol requests against one tab.

use crate::extraction::{extract_rows, scan_document};
use crate::page::access::{self, PageAccess};
use crate::page::protocol::{Request, Response};
use crate::page::scroll::run_infinite_scroll;
use crate::page::{ChannelError, ClickOutcome, LivePage, PageLocation};
use crate::types::{FieldDescriptor, PageInfo};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Dispatches requests to the extraction, scroll and click logic.
///
/// Stale-channel failures come back as `Err` for the bridge to retry.
/// Everything else, including page refusals and script errors, becomes a
/// [`Response`].
pub struct PageAgent<P: ?Sized> {
    page: Arc<P>,
}

impl<P: LivePage + ?Sized> PageAgent<P> {
    pub fn new(page: Arc<P>) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &Arc<P> {
        &self.page
    }

    /// Validate and handle a raw JSON request.
    pub async fn handle_value(&self, raw: serde_json::Value) -> Result<Response, ChannelError> {
        match Request::from_value(raw) {
            Ok(request) => self.handle(request).await,
            Err(refusal) => Ok(refusal),
        }
    }

    pub async fn handle(&self, request: Request) -> Result<Response, ChannelError> {
        self.page.runtime_ready().await?;
        let location = self.page.location().await?;
        let access = access::check(&location);

        match request {
            Request::Ping => Ok(Response {
                ready: Some(true),
                url: Some(location.url),
                accessible: Some(access.is_ok()),
                ..Response::ok()
            }),
            _ if !access.is_ok() => {
                debug!(action = request.action(), ?access, "request refused");
                Ok(Response::failure(access.message()))
            }
            Request::GetPageInfo => Ok(Response {
                page_info: Some(page_info(location, access)),
                ..Response::ok()
            }),
            Request::ExtractCurrentPage { fields, max_rows } => {
                self.extract(&location, &fields, max_rows).await
            }
            Request::ScrollPage {
                max_scrolls,
                idle_timeout,
            } => {
                let idle = Duration::from_millis(idle_timeout);
                match recoverable(run_infinite_scroll(self.page.as_ref(), max_scrolls, idle).await)? {
                    Ok(report) => Ok(Response {
                        scrolls: Some(report.scrolls),
                        ..Response::ok()
                    }),
                    Err(e) => Ok(Response::failure(format!("Scrolling failed: {e}"))),
                }
            }
            Request::ClickNextPage { next_selector } => self.click(&next_selector).await,
            Request::ScrapePage => match recoverable(self.page.document_html().await)? {
                Ok(html) => {
                    let scan = scan_document(&html, &location.url);
                    Ok(Response {
                        emails: Some(scan.emails),
                        phones: Some(scan.phones),
                        images: Some(scan.images),
                        ..Response::ok()
                    })
                }
                Err(e) => Ok(Response::failure(format!("Page scan failed: {e}"))),
            },
        }
    }

    /// One extraction pass. Failures reading the DOM yield no rows.
    async fn extract(
        &self,
        location: &PageLocation,
        fields: &[FieldDescriptor],
        max_rows: Option<NonZeroUsize>,
    ) -> Result<Response, ChannelError> {
        let rows = match recoverable(self.page.document_html().await)? {
            Ok(html) => extract_rows(&html, &location.url, fields, max_rows),
            Err(e) => {
                warn!(url = %location.url, "extraction pass failed: {e}");
                Vec::new()
            }
        };
        Ok(Response {
            extracted_count: Some(rows.len()),
            data: Some(rows),
            ..Response::ok()
        })
    }

    /// Click "next". Anything short of a click reports `clicked: false`.
    async fn click(&self, selector: &str) -> Result<Response, ChannelError> {
        if selector.trim().is_empty() {
            return Ok(Response::failure("No next selector provided"));
        }
        let clicked = match recoverable(self.page.click_next(selector).await)? {
            Ok(ClickOutcome::Clicked) => true,
            Ok(outcome) => {
                debug!(selector, ?outcome, "next-page control not clickable");
                false
            }
            Err(e) => {
                warn!(selector, "clicking next page failed: {e}");
                false
            }
        };
        Ok(Response {
            clicked: Some(clicked),
            ..Response::ok()
        })
    }
}

/// Split stale failures (outer `Err`) from ones the agent reports itself.
fn recoverable<T>(result: Result<T, ChannelError>) -> Result<Result<T, ChannelError>, ChannelError> {
    match result {
        Err(e) if e.is_stale() => Err(e),
        other => Ok(other),
    }
}

fn page_info(location: PageLocation, access: PageAccess) -> PageInfo {
    let domain = url::Url::parse(&location.url)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
        .unwrap_or_default();
    PageInfo {
        url: location.url,
        title: location.title,
        domain,
        accessible: access.is_ok(),
        ready_state: location.ready_state,
    }
}
