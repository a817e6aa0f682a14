//! Page-accessibility check run before any request except `ping`.

use crate::page::PageLocation;

/// URL prefixes of browser-owned pages that can't be extracted from.
pub const INTERNAL_PREFIXES: &[&str] = &[
    "chrome://",
    "chrome-extension://",
    "moz-extension://",
    "edge://",
    "about:",
    "devtools://",
];

/// Whether the page may be worked on, and if not, why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAccess {
    Ok,
    BrowserInternal,
    LocalFile,
    Loading,
}

impl PageAccess {
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// Message shown to the user when the page is refused.
    pub fn message(self) -> &'static str {
        match self {
            Self::Ok => "Page is accessible.",
            Self::BrowserInternal => {
                "Cannot access browser internal pages. Please navigate to a regular website."
            }
            Self::LocalFile => "Cannot access local files. Please navigate to a website.",
            Self::Loading => "Page is still loading. Please wait and try again.",
        }
    }

    /// Recover the category from a refusal message.
    pub fn from_message(message: &str) -> Option<Self> {
        [Self::BrowserInternal, Self::LocalFile, Self::Loading]
            .into_iter()
            .find(|access| access.message() == message)
    }
}

/// True for browser-internal URLs.
pub fn is_internal_url(url: &str) -> bool {
    INTERNAL_PREFIXES.iter().any(|p| url.starts_with(p))
}

/// Categorize a page by its URL scheme and load state.
pub fn check(location: &PageLocation) -> PageAccess {
    if is_internal_url(&location.url) {
        PageAccess::BrowserInternal
    } else if location.url.starts_with("file://") {
        PageAccess::LocalFile
    } else if location.ready_state != "complete" && location.ready_state != "interactive" {
        PageAccess::Loading
    } else {
        PageAccess::Ok
    }
}
