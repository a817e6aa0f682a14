//! Runtime settings: bridge retry policy, pagination timings, browser launch.
//!
//! Read from an optional JSON file (default `~/.pageharvest/settings.json`),
//! then overridden by `PAGEHARVEST_*` environment variables. Every field has
//! a default, so a partial file is fine.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Retry ceiling and delays for the execution bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    pub max_attempts: u32,
    pub settle_delay_ms: u64,
    pub retry_delay_ms: u64,
    pub backoff: f64,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            settle_delay_ms: 1500,
            retry_delay_ms: 1000,
            backoff: 1.0,
        }
    }
}

/// Fixed waits used by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationSettings {
    /// Wait after a successful "next" click before the next pass.
    pub click_settle_ms: u64,
    /// Wait before probing the tab for page info.
    pub page_info_delay_ms: u64,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            click_settle_ms: 3000,
            page_info_delay_ms: 500,
        }
    }
}

/// How to get hold of a Chrome instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    /// Explicit Chrome/Chromium executable; searched for when unset.
    pub chrome_path: Option<PathBuf>,
    /// DevTools endpoint of an already running browser (`ws://` or `http://`).
    pub remote_url: Option<String>,
    pub chrome_args: Vec<String>,
    pub navigation_timeout_ms: u64,
    pub request_timeout_secs: u64,
    /// Page runtime script to inject instead of the built-in one.
    pub runtime_script: Option<PathBuf>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            remote_url: None,
            chrome_args: Vec::new(),
            navigation_timeout_ms: 30_000,
            request_timeout_secs: 60,
            runtime_script: None,
        }
    }
}

/// All runtime settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HarvestSettings {
    pub bridge: BridgeSettings,
    pub pagination: PaginationSettings,
    pub browser: BrowserSettings,
}

impl HarvestSettings {
    /// Default settings file location.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".pageharvest")
            .join("settings.json")
    }

    /// Load from `path` (or the default location) and apply env overrides.
    ///
    /// An explicit path must exist; a missing default file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Self::default_path();
                if default.exists() {
                    Self::from_file(&default)?
                } else {
                    Self::default()
                }
            }
        };
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings {}", path.display()))?;
        let settings = serde_json::from_str(&raw)
            .with_context(|| format!("parsing settings {}", path.display()))?;
        debug!("loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Apply `PAGEHARVEST_*` overrides from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("PAGEHARVEST_HEADLESS") {
            match parse_bool(&v) {
                Some(headless) => self.browser.headless = headless,
                None => warn!("ignoring PAGEHARVEST_HEADLESS={v}"),
            }
        }
        if let Some(v) = lookup("PAGEHARVEST_CHROME").filter(|v| !v.is_empty()) {
            self.browser.chrome_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("PAGEHARVEST_REMOTE_URL").filter(|v| !v.is_empty()) {
            self.browser.remote_url = Some(v);
        }
        if let Some(v) = lookup("PAGEHARVEST_MAX_ATTEMPTS") {
            match v.parse::<u32>() {
                Ok(n) if n > 0 => self.bridge.max_attempts = n,
                _ => warn!("ignoring PAGEHARVEST_MAX_ATTEMPTS={v}"),
            }
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"bridge": {{"max_attempts": 5}}, "browser": {{"headless": false}}}}"#)
            .unwrap();

        let settings = HarvestSettings::from_file(file.path()).unwrap();
        assert_eq!(settings.bridge.max_attempts, 5);
        assert_eq!(settings.bridge.settle_delay_ms, 1500);
        assert!(!settings.browser.headless);
        assert_eq!(settings.pagination.click_settle_ms, 3000);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = HarvestSettings::load(Some(&dir.path().join("nope.json")));
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PAGEHARVEST_HEADLESS", "no"),
            ("PAGEHARVEST_REMOTE_URL", "ws://127.0.0.1:9222"),
            ("PAGEHARVEST_MAX_ATTEMPTS", "zero"),
        ]
        .into_iter()
        .collect();

        let mut settings = HarvestSettings::default();
        settings.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert!(!settings.browser.headless);
        assert_eq!(settings.browser.remote_url.as_deref(), Some("ws://127.0.0.1:9222"));
        assert_eq!(settings.bridge.max_attempts, 3);
    }
}
