// ── Link identity ──

use serde::{Deserialize, Serialize};
use std::fmt;

/// One side of a link: canonical device name and normalized interface name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Endpoint {
    pub device: String,
    pub interface: String,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.device, self.interface)
    }
}

/// Canonical composite key of a link.
///
/// Built from endpoints that are already in canonical order, so the same
/// physical connection always yields the same key whichever side found it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkId {
    pub device_a: String,
    pub interface_a: String,
    pub device_b: String,
    pub interface_b: String,
}

impl LinkId {
    pub fn new(a: &Endpoint, b: &Endpoint) -> Self {
        Self {
            device_a: a.device.clone(),
            interface_a: a.interface.clone(),
            device_b: b.device.clone(),
            interface_b: b.interface.clone(),
        }
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}<->{}:{}",
            self.device_a, self.interface_a, self.device_b, self.interface_b
        )
    }
}

/// Undirected point-to-point edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub a: Endpoint,
    pub b: Endpoint,
    pub description: String,
}

impl Link {
    pub fn id(&self) -> LinkId {
        LinkId::new(&self.a, &self.b)
    }
}
