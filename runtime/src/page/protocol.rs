//! Request/response messages exchanged with the page agent.
//!
//! One request in, one response out. Requests are a closed set; raw JSON is
//! checked at the boundary by [`Request::from_value`] before dispatch.

use crate::types::{FieldDescriptor, PageInfo, RowRecord, DEFAULT_IDLE_TIMEOUT_MS, DEFAULT_MAX_SCROLLS};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// Action names the agent understands.
pub const ACTIONS: &[&str] = &[
    "ping",
    "getPageInfo",
    "extractCurrentPage",
    "scrollPage",
    "clickNextPage",
    "scrapePage",
];

/// A request to the page agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    /// Liveness probe; exempt from the page-access check.
    Ping,
    GetPageInfo,
    #[serde(rename_all = "camelCase")]
    ExtractCurrentPage {
        fields: Vec<FieldDescriptor>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_rows: Option<NonZeroUsize>,
    },
    /// Resolves only once the scroll run is done.
    #[serde(rename_all = "camelCase")]
    ScrollPage {
        #[serde(default = "default_max_scrolls")]
        max_scrolls: u32,
        #[serde(default = "default_idle_timeout", alias = "idleTimeoutMs")]
        idle_timeout: u64,
    },
    #[serde(rename_all = "camelCase")]
    ClickNextPage { next_selector: String },
    /// E-mails, phone numbers and images across the page.
    ScrapePage,
}

fn default_max_scrolls() -> u32 {
    DEFAULT_MAX_SCROLLS
}

fn default_idle_timeout() -> u64 {
    DEFAULT_IDLE_TIMEOUT_MS
}

impl Request {
    /// Wire name of the action.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::GetPageInfo => "getPageInfo",
            Self::ExtractCurrentPage { .. } => "extractCurrentPage",
            Self::ScrollPage { .. } => "scrollPage",
            Self::ClickNextPage { .. } => "clickNextPage",
            Self::ScrapePage => "scrapePage",
        }
    }

    /// Validate a raw request.
    ///
    /// Unknown actions and malformed payloads come back as the failure
    /// response to send to the caller.
    pub fn from_value(value: serde_json::Value) -> Result<Self, Response> {
        let action = value
            .get("action")
            .and_then(|a| a.as_str())
            .unwrap_or("")
            .to_string();
        if !ACTIONS.contains(&action.as_str()) {
            return Err(Response::failure(format!("Unknown action: {action}")));
        }
        serde_json::from_value(value)
            .map_err(|e| Response::failure(format!("Invalid request: {e}")))
    }
}

/// Reply from the page agent. Only the fields relevant to the action are set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_info: Option<PageInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<RowRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrolls: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clicked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emails: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phones: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}
