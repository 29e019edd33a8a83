//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "<redacted>";

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            let path = global.config.clone().unwrap_or_else(config::config_path);
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let mut cfg = config::load(global)?;
            if cfg.inventory.token.is_some() {
                cfg.inventory.token = Some(REDACTED.into());
            }
            let out = output::render_single(&global.output, &cfg, |c| {
                toml::to_string_pretty(c).map_err(|e| CliError::Encode(e.to_string()))
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::SetToken => {
            let cfg = config::load(global)?;
            let token = match global.token {
                Some(ref token) => secrecy::SecretString::from(token.clone()),
                None => config::prompt_token("API token: ")?,
            };
            cfg.store_token(&token)?;
            if !global.quiet {
                eprintln!("Token stored in system keyring");
            }
            Ok(())
        }
    }
}
