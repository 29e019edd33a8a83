// topolab-api: Async Rust client for the NetBox inventory REST API

pub mod circuits;
pub mod client;
pub mod dcim;
pub mod error;
pub mod ipam;
pub mod transport;
pub mod types;

pub use client::NetboxClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
