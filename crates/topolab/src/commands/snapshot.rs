//! Snapshot command: fetch once, replay offline with `--snapshot`.

use crate::cli::{GlobalOpts, SnapshotArgs};
use crate::config::Config;
use crate::error::CliError;

pub async fn handle(args: SnapshotArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = super::load_inventory(cfg, global).await?;
    snapshot.save(&args.path)?;

    tracing::info!(
        path = %args.path.display(),
        devices = snapshot.devices.len(),
        interfaces = snapshot.interfaces.len(),
        "snapshot saved"
    );
    if !global.quiet {
        eprintln!(
            "Saved {} devices, {} interfaces, {} addresses to {}",
            snapshot.devices.len(),
            snapshot.interfaces.len(),
            snapshot.addresses.len(),
            args.path.display()
        );
    }
    Ok(())
}
