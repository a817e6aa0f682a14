//! Chrome session: launch a local browser or attach to a running one.

use crate::orchestrator::TabProvider;
use crate::renderer::page::CdpPage;
use crate::renderer::script::RuntimeScript;
use crate::settings::BrowserSettings;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::handler::HandlerConfig;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Executable names searched on `PATH`.
const CHROME_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// Well-known install locations checked after `PATH`.
const CHROME_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/snap/bin/chromium",
    "/opt/google/chrome/google-chrome",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

/// Pump CDP events until the connection ends. Errors are logged and
/// skipped; returns how many were seen.
async fn drive_events<S, T, E>(mut events: S) -> usize
where
    S: futures::Stream<Item = Result<T, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut errors = 0;
    while let Some(event) = events.next().await {
        if let Err(e) = event {
            errors += 1;
            warn!("CDP handler event error: {e}");
        }
    }
    debug!(errors, "CDP event stream ended");
    errors
}

/// Find a Chrome or Chromium executable.
pub fn find_chrome(explicit: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.clone());
        }
        return Err(anyhow!("configured Chrome not found at {}", path.display()));
    }

    if let Some(path) = CHROME_COMMANDS.iter().find_map(|cmd| which::which(cmd).ok()) {
        debug!("found Chrome on PATH: {}", path.display());
        return Ok(path);
    }

    CHROME_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| {
            anyhow!(
                "Chrome/Chromium not found. Install it, set PAGEHARVEST_CHROME, \
                 or attach to a running browser with --remote"
            )
        })
}

/// Turn `ws://host:port` or `http://host:port` into the `/json/version` URL.
fn version_endpoint(remote: &str) -> String {
    let http = remote
        .replacen("wss://", "https://", 1)
        .replacen("ws://", "http://", 1);
    let base = match http.find("/devtools/") {
        Some(idx) => &http[..idx],
        None => http.trim_end_matches('/'),
    };
    format!("{base}/json/version")
}

/// A browser plus the tab extractions run against.
pub struct ChromeSession {
    browser: Browser,
    handler: JoinHandle<()>,
    tab: Option<Arc<CdpPage>>,
    script: Arc<RuntimeScript>,
    settings: BrowserSettings,
    owned: bool,
}

impl ChromeSession {
    /// Connect to `settings.remote_url` if set, otherwise launch Chrome.
    pub async fn start(settings: &BrowserSettings) -> Result<Self> {
        let script = Arc::new(RuntimeScript::load(settings.runtime_script.as_deref())?);
        match &settings.remote_url {
            Some(remote) => Self::connect(remote, settings, script).await,
            None => Self::launch(settings, script).await,
        }
    }

    async fn launch(settings: &BrowserSettings, script: Arc<RuntimeScript>) -> Result<Self> {
        let chrome = find_chrome(settings.chrome_path.as_ref())?;
        info!(headless = settings.headless, "launching {}", chrome.display());

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome)
            .request_timeout(Duration::from_secs(settings.request_timeout_secs))
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");
        if !settings.headless {
            builder = builder.with_head();
        }
        for arg in &settings.chrome_args {
            builder = builder.arg(arg);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow!("invalid browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("launching Chrome")?;
        let handler = tokio::spawn(async move {
            drive_events(&mut handler).await;
        });

        Ok(Self {
            browser,
            handler,
            tab: None,
            script,
            settings: settings.clone(),
            owned: true,
        })
    }

    async fn connect(
        remote: &str,
        settings: &BrowserSettings,
        script: Arc<RuntimeScript>,
    ) -> Result<Self> {
        let ws_url = if remote.contains("/devtools/browser/") {
            remote.to_string()
        } else {
            let endpoint = version_endpoint(remote);
            debug!("resolving DevTools endpoint via {endpoint}");
            let version: serde_json::Value = reqwest::Client::new()
                .get(&endpoint)
                .send()
                .await
                .with_context(|| format!("reaching {endpoint}"))?
                .json()
                .await
                .context("parsing /json/version")?;
            version
                .get("webSocketDebuggerUrl")
                .and_then(|v| v.as_str())
                .map(String::from)
                .ok_or_else(|| anyhow!("no webSocketDebuggerUrl at {endpoint}"))?
        };
        info!("attaching to browser at {ws_url}");

        let handler_config = HandlerConfig {
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            ..Default::default()
        };
        let (mut browser, mut handler) = Browser::connect_with_config(&ws_url, handler_config)
            .await
            .context("connecting to remote browser")?;
        let handler = tokio::spawn(async move {
            drive_events(&mut handler).await;
        });

        if let Err(e) = browser.fetch_targets().await {
            warn!("listing existing tabs failed: {e}");
        }
        // Attached targets arrive as handler events.
        tokio::time::sleep(Duration::from_millis(250)).await;
        let existing = browser.pages().await.context("listing tabs")?;
        let tab = existing
            .into_iter()
            .next()
            .map(|page| Arc::new(CdpPage::new(page, script.clone())));

        Ok(Self {
            browser,
            handler,
            tab,
            script,
            settings: settings.clone(),
            owned: false,
        })
    }

    /// Load `url` in the session's tab, opening one if needed.
    pub async fn open(&mut self, url: &str) -> Result<()> {
        let timeout = Duration::from_millis(self.settings.navigation_timeout_ms);
        info!("opening {url}");

        match &self.tab {
            Some(tab) => {
                tokio::time::timeout(timeout, tab.inner().goto(url))
                    .await
                    .map_err(|_| anyhow!("navigation to {url} timed out"))?
                    .with_context(|| format!("navigating to {url}"))?;
            }
            None => {
                let page = tokio::time::timeout(timeout, self.browser.new_page(url))
                    .await
                    .map_err(|_| anyhow!("opening {url} timed out"))?
                    .with_context(|| format!("opening {url}"))?;
                self.tab = Some(Arc::new(CdpPage::new(page, self.script.clone())));
            }
        }
        Ok(())
    }

    /// Close a launched browser, or detach from a remote one.
    pub async fn close(mut self) {
        if self.owned {
            if let Err(e) = self.browser.close().await {
                warn!("closing browser failed: {e}");
            }
            if let Err(e) = self.browser.wait().await {
                debug!("waiting for browser exit failed: {e}");
            }
        }
        self.handler.abort();
    }
}

#[async_trait]
impl TabProvider for ChromeSession {
    type Page = CdpPage;

    async fn active_tab(&self) -> Option<Arc<CdpPage>> {
        self.tab.clone()
    }
}
