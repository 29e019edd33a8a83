//! FQDN command: device name to FQDN map.

use serde::Serialize;
use tabled::Tabled;

use crate::cli::{FqdnArgs, GlobalOpts};
use crate::config::Config;
use crate::error::CliError;
use crate::output;

#[derive(Serialize, Tabled)]
struct FqdnRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "FQDN")]
    fqdn: String,
}

pub async fn handle(args: FqdnArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let resolution = super::resolve_graph(cfg, global).await?;
    let map = resolution.graph.fqdn_map();

    if let Some(path) = args.write {
        std::fs::write(&path, output::render_yaml(&map)?)?;
        if !global.quiet {
            eprintln!("Wrote {} entries to {}", map.len(), path.display());
        }
        return Ok(());
    }

    let rows: Vec<FqdnRow> = map
        .into_iter()
        .map(|(name, fqdn)| FqdnRow { name, fqdn })
        .collect();
    let out = output::render_list(
        &global.output,
        &rows,
        |r| FqdnRow {
            name: r.name.clone(),
            fqdn: r.fqdn.clone(),
        },
        |r| format!("{} {}", r.name, r.fqdn),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
