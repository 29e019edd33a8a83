// ── Non-fatal resolution diagnostics ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::model::Graph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DiagnosticKind {
    /// No far side could be determined; the interface was skipped.
    UnresolvedFarSide,
    /// A sub-interface's parent is not among the device's interfaces.
    MissingParentInterface,
    /// An aggregate with no member reporting membership.
    MissingLagMember,
    /// Circuit type the engine does not model (peering, unknown).
    UnsupportedCircuit,
}

/// A gap found during resolution. Accumulated, never thrown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub device: String,
    pub interface: String,
    pub detail: String,
}

/// Output of one resolution run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub graph: Graph,
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }
}
