// IPAM endpoints: IP addresses and first-hop redundancy groups.

use tracing::debug;

use crate::client::NetboxClient;
use crate::error::Error;
use crate::types::{FhrpAssignmentResponse, FhrpGroupResponse, IpAddressResponse};

impl NetboxClient {
    /// All addresses assigned to interfaces of one device.
    ///
    /// `GET /api/ipam/ip-addresses/?device_id={id}`
    pub async fn list_ip_addresses_for_device(
        &self,
        device_id: u64,
    ) -> Result<Vec<IpAddressResponse>, Error> {
        debug!(device_id, "listing device addresses");
        self.list_all(
            "ipam/ip-addresses/",
            &[("device_id", device_id.to_string())],
        )
        .await
    }

    /// All addresses inside a prefix, regardless of assignment.
    ///
    /// `GET /api/ipam/ip-addresses/?parent={prefix}`
    pub async fn list_ip_addresses_in(
        &self,
        prefix: &str,
    ) -> Result<Vec<IpAddressResponse>, Error> {
        debug!(prefix, "listing subnet addresses");
        self.list_all("ipam/ip-addresses/", &[("parent", prefix.to_owned())])
            .await
    }

    /// `GET /api/ipam/fhrp-groups/`
    pub async fn list_fhrp_groups(&self) -> Result<Vec<FhrpGroupResponse>, Error> {
        self.list_all("ipam/fhrp-groups/", &[]).await
    }

    /// `GET /api/ipam/fhrp-group-assignments/`
    pub async fn list_fhrp_group_assignments(
        &self,
    ) -> Result<Vec<FhrpAssignmentResponse>, Error> {
        self.list_all("ipam/fhrp-group-assignments/", &[]).await
    }
}
