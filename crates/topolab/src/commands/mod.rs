//! Command dispatch: bridges CLI args -> inventory + resolution -> output.

pub mod config_cmd;
pub mod fqdn;
pub mod resolve;
pub mod snapshot;
pub mod topology;
pub mod upstream;

use std::io::{self, IsTerminal};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use topolab_core::{CoreError, InventorySnapshot, Resolution};

use crate::cli::{Command, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

/// Dispatch an inventory-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Resolve(args) => resolve::handle(args, cfg, global).await,
        Command::Topology(args) => topology::handle(args, cfg, global).await,
        Command::Fqdn(args) => fqdn::handle(args, cfg, global).await,
        Command::Upstream => upstream::handle(cfg, global).await,
        Command::Snapshot(args) => snapshot::handle(args, cfg, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}

// ── Shared pipeline ─────────────────────────────────────────────────

/// The inventory for this run: a saved snapshot when `--snapshot` is
/// given, otherwise a live fetch.
pub async fn load_inventory(
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<InventorySnapshot, CliError> {
    if let Some(ref path) = global.snapshot {
        tracing::info!(path = %path.display(), "loading inventory snapshot");
        return Ok(InventorySnapshot::load(path)?);
    }

    let client = config::client(cfg, global)?;
    let url = client.base_url().to_string();

    let spinner = spinner(&format!("Fetching inventory from {url}"), global.quiet);
    let fetched = topolab_core::fetch_snapshot(&client, &cfg.fetch_config()).await;
    spinner.finish_and_clear();

    fetched.map_err(|e| match e {
        CoreError::Inventory(api) => CliError::from_inventory(api, &url, cfg.inventory.timeout),
        other => other.into(),
    })
}

/// Load the inventory and run one resolution. The transit table is
/// validated before anything is fetched.
pub async fn resolve_graph(cfg: &Config, global: &GlobalOpts) -> Result<Resolution, CliError> {
    let resolve_config = cfg.resolve_config()?;
    let snapshot = load_inventory(cfg, global).await?;
    let resolution = topolab_core::resolve(&snapshot, &resolve_config)?;

    if !global.quiet {
        let color = output::should_color(&global.color);
        eprintln!("{}", output::summary(&resolution, color));
    }
    Ok(resolution)
}

fn spinner(message: &str, quiet: bool) -> ProgressBar {
    if quiet || !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} ({elapsed})") {
        bar.set_style(style);
    }
    bar.set_message(message.to_owned());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
