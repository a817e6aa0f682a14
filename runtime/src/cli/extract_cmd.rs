//! `pageharvest extract --config <file>` — run an extraction and print the result.

use crate::cli::output::{self, Styled};
use crate::orchestrator::Orchestrator;
use crate::settings::HarvestSettings;
use crate::types::{ExtractionConfig, ExtractionResult, FieldKind};
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

/// Read and parse an extraction config file.
pub fn load_config(path: &Path) -> Result<ExtractionConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading extraction config {}", path.display()))?;
    let config: ExtractionConfig = serde_json::from_str(&raw)
        .with_context(|| format!("parsing extraction config {}", path.display()))?;
    if config.fields.is_empty() {
        bail!("extraction config {} has no fields", path.display());
    }
    Ok(config)
}

/// Problems that don't stop the run but will produce empty columns.
pub fn config_warnings(config: &ExtractionConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let mut names = HashSet::new();
    for (i, field) in config.fields.iter().enumerate() {
        if field.name.trim().is_empty() {
            warnings.push(format!("field #{} has no name and will be skipped", i + 1));
            continue;
        }
        if !names.insert(field.name.as_str()) {
            warnings.push(format!("field name {:?} is used more than once", field.name));
        }
        if field.selector.trim().is_empty() {
            warnings.push(format!("field {:?} has no selector", field.name));
        }
        if field.kind == FieldKind::Attribute
            && field.attribute.as_deref().map_or(true, |a| a.trim().is_empty())
        {
            warnings.push(format!("field {:?} reads an attribute but names none", field.name));
        }
    }
    if let Some(key) = &config.dedupe_key {
        if !names.contains(key.as_str()) {
            warnings.push(format!("dedupe key {key:?} is not a field name"));
        }
    }
    warnings
}

/// Run the extract command. Returns whether the extraction succeeded.
pub async fn run(
    settings: &HarvestSettings,
    url: Option<&str>,
    config_path: &Path,
    output_path: Option<&Path>,
    quiet: bool,
) -> Result<bool> {
    let config = load_config(config_path)?;
    for warning in config_warnings(&config) {
        warn!("{warning}");
    }

    let session = super::open_session(settings, url).await?;
    let orchestrator = Orchestrator::new(session, settings);
    let result = orchestrator.extract_with_pagination(&config).await;
    orchestrator.into_tabs().close().await;

    output::write_json(&result, output_path)?;
    if !quiet {
        print_summary(&Styled::new(), &result, output_path);
    }
    Ok(result.success)
}

fn print_summary(s: &Styled, result: &ExtractionResult, output_path: Option<&Path>) {
    let stats = &result.stats;
    let mut line = format!(
        "{} from {} in {}",
        output::plural(stats.total_rows, "row"),
        output::plural(stats.total_pages, "page"),
        output::format_millis(result.performance.duration_ms)
    );
    if stats.duplicates_removed > 0 {
        line.push_str(&format!(
            " ({} removed)",
            output::plural(stats.duplicates_removed, "duplicate")
        ));
    }

    eprintln!();
    if result.success {
        output::print_check(s.ok_sym(), "Extracted:", &line);
    } else {
        output::print_check(s.fail_sym(), "Extracted:", &s.yellow(&line));
        for error in &result.errors {
            output::print_detail(&s.red(error));
        }
    }
    if let Some(path) = output_path {
        output::print_check(s.ok_sym(), "Written:", &path.display().to_string());
    }
}
