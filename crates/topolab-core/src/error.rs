// ── Core error types ──
//
// Only fatal conditions live here. Gaps found while resolving (unresolved
// far sides, missing parents or LAG members) are `Diagnostic` values
// returned with the graph, never errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // ── Inventory ────────────────────────────────────────────────────
    /// The inventory source failed (network, auth, bad payload). Aborts the run.
    #[error("Inventory adapter failure: {0}")]
    Inventory(#[from] topolab_api::Error),

    // ── Configuration ────────────────────────────────────────────────
    /// A transit peer cannot be mapped to an ASN.
    #[error("Malformed transit table for {device}, peer {peer}: {reason}")]
    MalformedTransitTable {
        device: String,
        peer: String,
        reason: String,
    },

    // ── Graph construction ───────────────────────────────────────────
    /// A link referenced an interface that was never materialized.
    #[error("Link endpoint {device}:{interface} does not exist")]
    MissingEndpoint { device: String, interface: String },

    // ── Snapshot persistence ─────────────────────────────────────────
    #[error("Snapshot I/O error on {path}: {source}")]
    SnapshotIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot format error: {0}")]
    SnapshotFormat(#[from] serde_json::Error),
}

impl CoreError {
    /// The underlying adapter error, if this is an inventory failure.
    pub fn as_inventory(&self) -> Option<&topolab_api::Error> {
        match self {
            Self::Inventory(e) => Some(e),
            _ => None,
        }
    }
}
