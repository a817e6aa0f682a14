//! `pageharvest info` — show what the page in the tab is.

use crate::cli::output::{self, Styled};
use crate::orchestrator::Orchestrator;
use crate::settings::HarvestSettings;
use anyhow::Result;

pub async fn run(settings: &HarvestSettings, url: Option<&str>, quiet: bool) -> Result<bool> {
    let session = super::open_session(settings, url).await?;
    let orchestrator = Orchestrator::new(session, settings);
    let info = orchestrator.current_page_info().await;
    orchestrator.into_tabs().close().await;

    let s = Styled::new();
    match info {
        Ok(info) => {
            output::write_json(&info, None)?;
            if !quiet {
                output::print_header(&s);
                output::print_check(s.ok_sym(), "Title:", &info.title);
                output::print_check(s.ok_sym(), "Domain:", &info.domain);
                output::print_check(s.ok_sym(), "State:", &info.ready_state);
            }
            Ok(true)
        }
        Err(e) => {
            output::write_json(&serde_json::json!({ "success": false, "error": e.to_string() }), None)?;
            if !quiet {
                output::print_check(s.fail_sym(), "Page:", &s.red(&e.to_string()));
            }
            Ok(false)
        }
    }
}
