//! Upstream command: AS paths each transit provider announces to the lab.

use tabled::Tabled;

use topolab_core::ProviderPlan;
use topolab_core::upstream;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::config::Config;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct PathRow {
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "ASN")]
    asn: u32,
    #[tabled(rename = "Policy")]
    policy: String,
    #[tabled(rename = "Peers")]
    peers: String,
    #[tabled(rename = "AS path")]
    as_path: String,
}

fn rows(plan: &ProviderPlan) -> Vec<PathRow> {
    let peers = plan
        .peers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    let row = |as_path: String| PathRow {
        provider: plan.provider.clone(),
        asn: plan.asn,
        policy: plan.policy.clone(),
        peers: peers.clone(),
        as_path,
    };

    if plan.paths.is_empty() {
        return vec![row("-".into())];
    }
    plan.paths
        .iter()
        .map(|path| {
            row(path
                .as_path
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" "))
        })
        .collect()
}

pub async fn handle(cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let resolution = super::resolve_graph(cfg, global).await?;
    let plans = upstream::plan(
        &resolution.graph,
        &cfg.upstream.paths,
        &cfg.prepend_policy(),
    );

    let out = output::render_single(&global.output, &plans, |plans| {
        Ok(match global.output {
            OutputFormat::Plain => plans
                .iter()
                .map(|p| p.policy.clone())
                .collect::<Vec<_>>()
                .join("\n"),
            _ => output::render_rows(&plans.iter().flat_map(rows).collect::<Vec<_>>()),
        })
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
