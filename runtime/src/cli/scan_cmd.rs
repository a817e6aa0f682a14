//! `pageharvest scan` — contact details and images found on a page.

use crate::cli::output::{self, Styled};
use crate::orchestrator::Orchestrator;
use crate::settings::HarvestSettings;
use anyhow::Result;

pub async fn run(settings: &HarvestSettings, url: Option<&str>, quiet: bool) -> Result<bool> {
    let session = super::open_session(settings, url).await?;
    let orchestrator = Orchestrator::new(session, settings);
    let scan = orchestrator.scan_page().await;
    orchestrator.into_tabs().close().await;

    let s = Styled::new();
    match scan {
        Ok(scan) => {
            output::write_json(&scan, None)?;
            if !quiet {
                let sym = |n: usize| if n > 0 { s.ok_sym() } else { s.warn_sym() };
                output::print_check(sym(scan.emails.len()), "E-mails:", &scan.emails.len().to_string());
                output::print_check(sym(scan.phones.len()), "Phones:", &scan.phones.len().to_string());
                output::print_check(sym(scan.images.len()), "Images:", &scan.images.len().to_string());
            }
            Ok(true)
        }
        Err(e) => {
            output::write_json(&serde_json::json!({ "success": false, "error": e.to_string() }), None)?;
            if !quiet {
                output::print_check(s.fail_sym(), "Scan:", &s.red(&e.to_string()));
            }
            Ok(false)
        }
    }
}
