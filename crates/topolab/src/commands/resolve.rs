//! Resolve command: run a resolution and list one view of it.

use tabled::Tabled;

use topolab_core::{Device, Diagnostic, Link};

use crate::cli::{GlobalOpts, ResolveArgs, ResolveView};
use crate::config::Config;
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Type")]
    sub_type: String,
    #[tabled(rename = "Interfaces")]
    interfaces: usize,
    #[tabled(rename = "Units")]
    units: usize,
    #[tabled(rename = "Loopbacks")]
    loopbacks: String,
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        Self {
            name: d.name.clone(),
            kind: d.kind.to_string(),
            sub_type: d.sub_type.to_string(),
            interfaces: d.physical_interfaces.len(),
            units: d.sub_interfaces.len(),
            loopbacks: join(&d.loopback_addresses),
        }
    }
}

#[derive(Tabled)]
struct LinkRow {
    #[tabled(rename = "A")]
    a: String,
    #[tabled(rename = "B")]
    b: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&Link> for LinkRow {
    fn from(l: &Link) -> Self {
        Self {
            a: l.a.to_string(),
            b: l.b.to_string(),
            description: l.description.clone(),
        }
    }
}

#[derive(Tabled)]
struct DiagnosticRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Interface")]
    interface: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl From<&Diagnostic> for DiagnosticRow {
    fn from(d: &Diagnostic) -> Self {
        Self {
            kind: d.kind.to_string(),
            device: d.device.clone(),
            interface: d.interface.clone(),
            detail: d.detail.clone(),
        }
    }
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: ResolveArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let resolution = super::resolve_graph(cfg, global).await?;
    let graph = &resolution.graph;

    let out = match args.view {
        ResolveView::Devices => {
            let devices: Vec<&Device> = graph.devices.values().collect();
            output::render_list(
                &global.output,
                &devices,
                |d| DeviceRow::from(*d),
                |d| d.name.clone(),
            )?
        }
        ResolveView::Links => {
            let links: Vec<&Link> = graph.links.values().collect();
            output::render_list(
                &global.output,
                &links,
                |l| LinkRow::from(*l),
                |l| l.id().to_string(),
            )?
        }
        ResolveView::Diagnostics => output::render_list(
            &global.output,
            &resolution.diagnostics,
            |d: &Diagnostic| DiagnosticRow::from(d),
            |d| format!("{}:{}", d.device, d.interface),
        )?,
        ResolveView::Graph => {
            output::render_single(&global.output, &resolution, output::render_yaml)?
        }
    };
    output::print_output(&out, global.quiet);

    if args.strict && !resolution.diagnostics.is_empty() {
        return Err(CliError::Unresolved {
            count: resolution.diagnostics.len(),
        });
    }
    Ok(())
}
