//! [`LivePage`] over a Chrome DevTools Protocol page.

use crate::page::{millis, ChannelError, ClickOutcome, InstallOutcome, LivePage, PageLocation};
use crate::renderer::script::{RuntimeScript, RUNTIME_GLOBAL};
use async_trait::async_trait;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Reply of `waitForGrowth`; a bare `null` would not survive decoding.
#[derive(Debug, serde::Deserialize)]
struct Growth {
    height: Option<u64>,
}

/// One browser tab with the page runtime injected on demand.
pub struct CdpPage {
    page: Page,
    script: Arc<RuntimeScript>,
}

impl CdpPage {
    pub fn new(page: Page, script: Arc<RuntimeScript>) -> Self {
        Self { page, script }
    }

    pub fn inner(&self) -> &Page {
        &self.page
    }

    /// Evaluate `expression`, awaiting promises, and decode the result.
    async fn eval<T: DeserializeOwned>(&self, expression: String) -> Result<T, ChannelError> {
        let result = self
            .page
            .evaluate(expression)
            .await
            .map_err(|e| ChannelError::classify(&e.to_string()))?;
        result
            .into_value()
            .map_err(|e| ChannelError::Script(format!("unexpected reply: {e}")))
    }

    /// Call a page runtime method with JSON arguments. A missing runtime
    /// throws a message that classifies as a stale channel.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        args: serde_json::Value,
    ) -> Result<T, ChannelError> {
        self.eval(format!(
            "(() => {{ const rt = window.{RUNTIME_GLOBAL}; \
             if (!rt) throw new Error('{RUNTIME_GLOBAL} missing'); \
             return rt.{method}(...{args}); }})()"
        ))
        .await
    }
}

#[async_trait]
impl LivePage for CdpPage {
    async fn location(&self) -> Result<PageLocation, ChannelError> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| ChannelError::classify(&e.to_string()))?
            .unwrap_or_default();
        let title = self
            .page
            .get_title()
            .await
            .map_err(|e| ChannelError::classify(&e.to_string()))?
            .unwrap_or_default();
        let ready_state: String = self.eval("document.readyState".to_string()).await?;
        Ok(PageLocation {
            url,
            title,
            ready_state,
        })
    }

    async fn install_runtime(&self) -> Result<InstallOutcome, ChannelError> {
        let outcome: String = self.eval(self.script.source().to_string()).await?;
        debug!(outcome = %outcome, "page runtime evaluated");
        match outcome.as_str() {
            "installed" => Ok(InstallOutcome::Installed),
            "present" => Ok(InstallOutcome::AlreadyPresent),
            other => Err(ChannelError::Script(format!(
                "page runtime returned {other:?}"
            ))),
        }
    }

    async fn runtime_ready(&self) -> Result<(), ChannelError> {
        let ready: bool = self
            .eval(format!(
                "typeof window.{RUNTIME_GLOBAL} === 'object' && window.{RUNTIME_GLOBAL}.ping().ready === true"
            ))
            .await?;
        if ready {
            Ok(())
        } else {
            Err(ChannelError::ReceiverGone)
        }
    }

    async fn document_html(&self) -> Result<String, ChannelError> {
        self.call("html", json!([])).await
    }

    async fn scroll_height(&self) -> Result<u64, ChannelError> {
        self.call("height", json!([])).await
    }

    async fn scroll_to_bottom(&self) -> Result<(), ChannelError> {
        let _: bool = self.call("scrollToBottom", json!([])).await?;
        Ok(())
    }

    async fn wait_for_growth(
        &self,
        baseline: u64,
        idle: Duration,
    ) -> Result<Option<u64>, ChannelError> {
        let growth: Growth = self
            .call("waitForGrowth", json!([baseline, millis(idle)]))
            .await?;
        Ok(growth.height)
    }

    async fn click_next(&self, selector: &str) -> Result<ClickOutcome, ChannelError> {
        let outcome: String = self.call("clickNext", json!([selector])).await?;
        match outcome.as_str() {
            "clicked" => Ok(ClickOutcome::Clicked),
            "not_found" => Ok(ClickOutcome::NotFound),
            "not_visible" => Ok(ClickOutcome::NotVisible),
            other => Err(ChannelError::Script(format!("unexpected click reply {other:?}"))),
        }
    }
}
