//! Page-side logic: the live-page seam, the request protocol and the agent
//! that answers requests.
//!
//! A tab's execution context is volatile. Navigations, back/forward cache
//! transitions and frame swaps silently discard whatever was injected into
//! the previous document. Every [`LivePage`] call therefore reports stale
//! channels distinctly ([`ChannelError::is_stale`]) so the bridge can
//! reinject and retry.

pub mod access;
pub mod agent;
pub mod protocol;
pub mod scroll;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;
use std::time::Duration;

pub use agent::PageAgent;
pub use protocol::{Request, Response};

/// Transport-level failure talking to the page.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// The page runtime is not present in the current document.
    #[error("Receiving end does not exist")]
    ReceiverGone,
    /// The document moved into the back/forward cache or was destroyed.
    #[error("execution context was invalidated: {0}")]
    ContextInvalidated(String),
    /// The connection to the tab closed mid-request.
    #[error("message channel is closed")]
    Closed,
    /// The page ran the call and threw.
    #[error("script error: {0}")]
    Script(String),
}

impl ChannelError {
    /// Whether reinjecting the page runtime can fix this failure.
    pub fn is_stale(&self) -> bool {
        !matches!(self, Self::Script(_))
    }

    /// Classify a raw error message from the browser connection.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("__pageharvester")
            || lower.contains("receiving end does not exist")
            || lower.contains("cannot find context with specified id")
        {
            Self::ReceiverGone
        } else if lower.contains("back/forward cache")
            || lower.contains("execution context was destroyed")
            || lower.contains("inspected target navigated or closed")
        {
            Self::ContextInvalidated(message.to_string())
        } else if lower.contains("channel is closed")
            || lower.contains("channel closed")
            || lower.contains("connection closed")
        {
            Self::Closed
        } else {
            Self::Script(message.to_string())
        }
    }
}

/// Where the tab is and how far its document has loaded.
///
/// Answered by the browser itself; never needs the page runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    pub url: String,
    pub title: String,
    /// `document.readyState`: `loading`, `interactive` or `complete`.
    pub ready_state: String,
}

/// Result of injecting the page runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    /// The guard was already set in this document; nothing changed.
    AlreadyPresent,
}

/// Result of trying to click the "next page" control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Clicked,
    NotFound,
    /// Present but without a layout box (`offsetParent === null`).
    NotVisible,
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Live-DOM primitives of one tab.
#[async_trait]
pub trait LivePage: Send + Sync {
    /// URL, title and ready state of the current document.
    async fn location(&self) -> Result<PageLocation, ChannelError>;

    /// Inject the page runtime. Idempotent within one document.
    async fn install_runtime(&self) -> Result<InstallOutcome, ChannelError>;

    /// Ok when the page runtime of the current document answers.
    async fn runtime_ready(&self) -> Result<(), ChannelError>;

    /// Serialized `document.documentElement`.
    async fn document_html(&self) -> Result<String, ChannelError>;

    /// Current `document.body.scrollHeight`.
    async fn scroll_height(&self) -> Result<u64, ChannelError>;

    async fn scroll_to_bottom(&self) -> Result<(), ChannelError>;

    /// Wait up to `idle` for the document to grow past `baseline`.
    ///
    /// Returns the new height, or `None` when the wait elapsed. The size
    /// observer and its timer are released on both paths.
    async fn wait_for_growth(
        &self,
        baseline: u64,
        idle: Duration,
    ) -> Result<Option<u64>, ChannelError>;

    /// Click the first element matching `selector` if it is rendered.
    async fn click_next(&self, selector: &str) -> Result<ClickOutcome, ChannelError>;
}
