//! Clap derive structures for the `topolab` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// topolab -- build container-lab topologies from a NetBox inventory
#[derive(Debug, Parser)]
#[command(
    name = "topolab",
    version,
    about = "Resolve a NetBox inventory into a lab topology",
    long_about = "Walks the devices, interfaces, cables and circuits recorded in a\n\
        NetBox inventory and resolves them into a deduplicated graph of\n\
        devices and point-to-point links, ready for a container-lab emulation.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config dir)
    #[arg(long, env = "TOPOLAB_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Inventory URL (overrides [inventory] url)
    #[arg(long, env = "TOPOLAB_URL", global = true)]
    pub url: Option<String>,

    /// Inventory API token (also read from TOPOLAB_TOKEN after token_env)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Load the inventory from a saved snapshot instead of fetching
    #[arg(long, global = true, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "TOPOLAB_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "TOPOLAB_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides [inventory] timeout)
    #[arg(long, env = "TOPOLAB_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve the inventory and show devices, links, or diagnostics
    #[command(alias = "r")]
    Resolve(ResolveArgs),

    /// Write the lab topology descriptor
    #[command(alias = "topo")]
    Topology(TopologyArgs),

    /// Print or write the device name to FQDN map
    Fqdn(FqdnArgs),

    /// Show the AS-path plan for the simulated upstream
    Upstream,

    /// Fetch the inventory and save it for offline runs
    Snapshot(SnapshotArgs),

    /// Inspect configuration and store credentials
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  RESOLVE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// What to list
    #[arg(value_enum, default_value = "links")]
    pub view: ResolveView,

    /// Exit non-zero when any diagnostic was raised
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResolveView {
    /// Resolved devices with interface counts
    Devices,
    /// Deduplicated links
    Links,
    /// Interfaces that could not be resolved
    Diagnostics,
    /// The whole graph plus diagnostics (structured formats)
    Graph,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TOPOLOGY / FQDN / SNAPSHOT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct TopologyArgs {
    /// Write to this file instead of stdout
    #[arg(long, short = 'w', value_name = "FILE")]
    pub write: Option<PathBuf>,

    /// Lab name (overrides [resolve] name)
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Debug, Args)]
pub struct FqdnArgs {
    /// Write the map as YAML to this file
    #[arg(long, short = 'w', value_name = "FILE")]
    pub write: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    /// Destination file
    #[arg(value_name = "FILE")]
    pub path: PathBuf,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Show the effective configuration (tokens redacted)
    Show,

    /// Prompt for an API token and store it in the system keyring
    SetToken,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
