//! CLI for the `pageharvest` binary.

pub mod extract_cmd;
pub mod info_cmd;
pub mod output;
pub mod scan_cmd;

use crate::renderer::ChromeSession;
use crate::settings::HarvestSettings;
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "pageharvest",
    version,
    about = "Extract rows of data from web pages in a real browser"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file (default: ~/.pageharvest/settings.json)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Suppress the human-readable summary on stderr
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Show the browser window
    #[arg(long, global = true)]
    pub headed: bool,

    /// Attach to a running browser (ws:// or http:// DevTools endpoint)
    #[arg(long, global = true)]
    pub remote: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract rows using an extraction config
    Extract {
        /// Page to open; omit to use the current tab of a --remote browser
        #[arg(long)]
        url: Option<String>,
        /// Extraction config (JSON)
        #[arg(long)]
        config: PathBuf,
        /// Write the result here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Show URL, title, domain and load state of the page
    Info {
        #[arg(long)]
        url: Option<String>,
    },
    /// List e-mail addresses, phone numbers and images on the page
    Scan {
        #[arg(long)]
        url: Option<String>,
    },
}

impl Cli {
    /// Settings file plus env overrides plus command-line flags.
    pub fn load_settings(&self) -> Result<HarvestSettings> {
        let mut settings = HarvestSettings::load(self.settings.as_deref())?;
        if self.headed {
            settings.browser.headless = false;
        }
        if let Some(remote) = &self.remote {
            settings.browser.remote_url = Some(remote.clone());
        }
        Ok(settings)
    }
}

/// Run the parsed command. `Ok(false)` means it ran but did not succeed.
pub async fn run(cli: Cli) -> Result<bool> {
    let settings = cli.load_settings()?;
    match &cli.command {
        Command::Extract {
            url,
            config,
            output,
        } => {
            extract_cmd::run(
                &settings,
                url.as_deref(),
                config,
                output.as_deref(),
                cli.quiet,
            )
            .await
        }
        Command::Info { url } => info_cmd::run(&settings, url.as_deref(), cli.quiet).await,
        Command::Scan { url } => scan_cmd::run(&settings, url.as_deref(), cli.quiet).await,
    }
}

/// Start a browser session and open `url` in it.
pub(crate) async fn open_session(settings: &HarvestSettings, url: Option<&str>) -> Result<ChromeSession> {
    if url.is_none() && settings.browser.remote_url.is_none() {
        bail!("--url is required unless attaching to a browser with --remote");
    }
    let mut session = ChromeSession::start(&settings.browser).await?;
    if let Some(url) = url {
        if let Err(e) = session.open(url).await {
            session.close().await;
            return Err(e);
        }
    }
    Ok(session)
}
