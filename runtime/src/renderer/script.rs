//! Locate the page runtime script.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Built-in page runtime.
const EMBEDDED: &str = include_str!("scripts/page_runtime.js");

/// Global the runtime installs itself under.
pub const RUNTIME_GLOBAL: &str = "__pageHarvester";

/// Where the loaded script came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOrigin {
    Embedded,
    File(PathBuf),
}

/// Source of the page runtime to inject.
#[derive(Debug, Clone)]
pub struct RuntimeScript {
    source: String,
    origin: ScriptOrigin,
}

impl RuntimeScript {
    /// Use `override_path` when given, else the built-in runtime.
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let Some(path) = override_path else {
            return Ok(Self::embedded());
        };
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("reading page runtime {}", path.display()))?;
        if !source.contains(RUNTIME_GLOBAL) {
            bail!(
                "{} does not define window.{RUNTIME_GLOBAL}",
                path.display()
            );
        }
        info!("loaded page runtime from {}", path.display());
        Ok(Self {
            source,
            origin: ScriptOrigin::File(path.to_path_buf()),
        })
    }

    pub fn embedded() -> Self {
        Self {
            source: EMBEDDED.to_string(),
            origin: ScriptOrigin::Embedded,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn origin(&self) -> &ScriptOrigin {
        &self.origin
    }
}
