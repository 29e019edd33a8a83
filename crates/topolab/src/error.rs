//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use topolab_config::ConfigError;
use topolab_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const CONFIG: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the inventory at {url}")]
    #[diagnostic(
        code(topolab::connection_failed),
        help(
            "Check that the inventory is running and reachable.\n\
             URL: {url}\n\
             Self-signed certificate? Try --insecure, or set [inventory] ca_cert."
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: topolab_api::Error,
    },

    #[error("Inventory request failed")]
    #[diagnostic(code(topolab::inventory))]
    Inventory(#[source] topolab_api::Error),

    #[error("Inventory request timed out after {seconds}s")]
    #[diagnostic(
        code(topolab::timeout),
        help("Increase the timeout with --timeout or [inventory] timeout.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed")]
    #[diagnostic(
        code(topolab::auth_failed),
        help(
            "The inventory rejected the API token.\n\
             Store a new one with: topolab config set-token"
        )
    )]
    AuthFailed(#[source] topolab_api::Error),

    #[error("No API token configured for {host}")]
    #[diagnostic(
        code(topolab::no_credentials),
        help(
            "Pass --token, set TOPOLAB_TOKEN, or run: topolab config set-token"
        )
    )]
    NoCredentials { host: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration error")]
    #[diagnostic(
        code(topolab::config),
        help("Check the file shown by: topolab config path")
    )]
    Config(#[source] ConfigError),

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(topolab::validation))]
    Validation { field: String, reason: String },

    // ── Resolution ───────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(topolab::resolve))]
    Core(CoreError),

    #[error("{count} interface(s) could not be resolved")]
    #[diagnostic(
        code(topolab::diagnostics),
        help("Run: topolab resolve diagnostics")
    )]
    Unresolved { count: usize },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to encode output: {0}")]
    #[diagnostic(code(topolab::encode))]
    Encode(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed(_) | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Config(_) | Self::Core(CoreError::MalformedTransitTable { .. }) => {
                exit_code::CONFIG
            }
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Classify an adapter failure by what the user has to fix.
    pub fn from_inventory(err: topolab_api::Error, url: &str, timeout_secs: u64) -> Self {
        use topolab_api::Error as ApiError;

        if matches!(&err, ApiError::Transport(e) if e.is_timeout()) {
            return Self::Timeout {
                seconds: timeout_secs,
            };
        }
        let unreachable = matches!(&err, ApiError::Tls(_))
            || matches!(&err, ApiError::Transport(e) if e.is_connect());
        if unreachable {
            return Self::ConnectionFailed {
                url: url.to_owned(),
                source: err,
            };
        }
        if err.is_auth() || matches!(err, ApiError::Api { status: 401 | 403, .. }) {
            return Self::AuthFailed(err);
        }
        Self::Inventory(err)
    }
}

// ── ConfigError / CoreError → CliError mapping ───────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { host } => Self::NoCredentials { host },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::Transit(core) => Self::Core(core),
            other => Self::Config(other),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Inventory(e) => Self::Inventory(e),
            other => Self::Core(other),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err.to_string())
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Encode(err.to_string())
    }
}
