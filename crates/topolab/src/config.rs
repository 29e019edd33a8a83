//! CLI configuration: thin wrapper around `topolab_config`.
//!
//! Applies `GlobalOpts` flag overrides (--url, --insecure, --timeout) on
//! top of the loaded file and resolves the API token with the flag and an
//! interactive prompt at either end of the shared chain.

use std::io::IsTerminal;

use secrecy::SecretString;

use topolab_api::NetboxClient;
use topolab_config::ConfigError;

pub use topolab_config::{Config, config_path};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Load the config file named by `--config` (or the default) and apply
/// flag overrides.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = topolab_config::load_config(global.config.as_deref())?;

    if let Some(ref url) = global.url {
        cfg.inventory.url = Some(url.clone());
    }
    if global.insecure {
        cfg.inventory.insecure = true;
    }
    if let Some(timeout) = global.timeout {
        cfg.inventory.timeout = timeout;
    }
    Ok(cfg)
}

/// Resolve the API token: `--token`, then the shared chain, then a
/// prompt when stdin is a terminal.
pub fn resolve_token(cfg: &Config, global: &GlobalOpts) -> Result<SecretString, CliError> {
    if let Some(ref token) = global.token {
        return Ok(SecretString::from(token.clone()));
    }

    match cfg.resolve_token() {
        Ok(token) => Ok(token),
        Err(ConfigError::NoCredentials { host }) if std::io::stdin().is_terminal() => {
            let token = prompt_token(&format!("API token for {host}: "))?;
            Ok(token)
        }
        Err(e) => Err(e.into()),
    }
}

/// Read a token without echo; an empty answer is rejected.
pub fn prompt_token(prompt: &str) -> Result<SecretString, CliError> {
    let token = rpassword::prompt_password(prompt)?;
    if token.trim().is_empty() {
        return Err(CliError::Validation {
            field: "token".into(),
            reason: "token cannot be empty".into(),
        });
    }
    Ok(SecretString::from(token.trim().to_owned()))
}

/// Build the inventory client from the effective config.
pub fn client(cfg: &Config, global: &GlobalOpts) -> Result<NetboxClient, CliError> {
    let url = cfg.inventory_url()?;
    let token = resolve_token(cfg, global)?;
    let client = NetboxClient::from_token(url.as_str(), &token, &cfg.transport_config())
        .map_err(|e| CliError::from_inventory(e, url.as_str(), cfg.inventory.timeout))?;
    Ok(client.with_page_size(cfg.inventory.page_size))
}
