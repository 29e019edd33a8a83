//! Topology resolution engine between `topolab-api` and the CLI.
//!
//! Turns a network inventory into a deduplicated graph of devices,
//! interfaces and links suitable for a container-lab emulation:
//!
//! - **[`fetch_snapshot`]**: Concurrent prefetch of everything a run
//!   needs into an [`InventorySnapshot`], which can also be saved and
//!   replayed offline.
//!
//! - **[`Inventory`]**: The read-only lookup surface the engine consumes.
//!   Records are validated once in [`convert`]; past that boundary there is
//!   no loose JSON.
//!
//! - **[`resolve`]**: The traversal driver. Dispatches each interface to
//!   the right handler (loopback, sub-interface, circuit, switch-facing,
//!   generic transport), using [`FarSideResolver`] to find the other end
//!   and [`ModelBuilder`] to materialize devices and interfaces. Returns a
//!   [`Resolution`]: the [`Graph`] plus non-fatal [`Diagnostic`]s.
//!
//! - **[`upstream`]**: AS-path plan for the simulated ISP device.

pub mod builder;
pub mod config;
pub mod convert;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod fetch;
pub mod inventory;
pub mod model;
pub mod resolver;
pub mod snapshot;
pub mod upstream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use builder::ModelBuilder;
pub use config::{Classification, FetchConfig, ResolveConfig, TransitPeer, TransitTable};
pub use diagnostics::{Diagnostic, DiagnosticKind, Resolution};
pub use driver::resolve;
pub use error::CoreError;
pub use fetch::fetch_snapshot;
pub use inventory::{Inventory, RecordId};
pub use resolver::FarSideResolver;
pub use snapshot::InventorySnapshot;
pub use upstream::{PrependPolicy, ProviderPlan};

pub use model::{
    Address, Device, DeviceKind, DeviceSubType, Endpoint, Graph, Link, LinkId, PhysicalInterface,
    RedundancyGroup, SubInterface,
};
