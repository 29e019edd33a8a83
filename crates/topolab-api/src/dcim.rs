// DCIM endpoints: devices, interfaces, front/rear ports.

use tracing::debug;

use crate::client::NetboxClient;
use crate::error::Error;
use crate::types::{
    DeviceFilter, DeviceResponse, FrontPortResponse, InterfaceResponse, RearPortResponse,
};

impl NetboxClient {
    /// List devices matching the filter.
    ///
    /// `GET /api/dcim/devices/?role=..&status=..&name=..`
    pub async fn list_devices(&self, filter: &DeviceFilter) -> Result<Vec<DeviceResponse>, Error> {
        debug!(?filter, "listing devices");
        self.list_all("dcim/devices/", &filter.to_params()).await
    }

    /// `GET /api/dcim/devices/{id}/`
    pub async fn get_device(&self, id: u64) -> Result<DeviceResponse, Error> {
        self.get_object("device", &format!("dcim/devices/{id}/"), id)
            .await
    }

    /// List the enabled interfaces of one device.
    ///
    /// `GET /api/dcim/interfaces/?device_id={id}&enabled=true`
    pub async fn list_interfaces(&self, device_id: u64) -> Result<Vec<InterfaceResponse>, Error> {
        debug!(device_id, "listing interfaces");
        self.list_all(
            "dcim/interfaces/",
            &[
                ("device_id", device_id.to_string()),
                ("enabled", "true".to_owned()),
            ],
        )
        .await
    }

    /// `GET /api/dcim/interfaces/{id}/`
    pub async fn get_interface(&self, id: u64) -> Result<InterfaceResponse, Error> {
        self.get_object("interface", &format!("dcim/interfaces/{id}/"), id)
            .await
    }

    /// `GET /api/dcim/front-ports/{id}/`
    pub async fn get_front_port(&self, id: u64) -> Result<FrontPortResponse, Error> {
        self.get_object("front port", &format!("dcim/front-ports/{id}/"), id)
            .await
    }

    /// `GET /api/dcim/rear-ports/{id}/`
    pub async fn get_rear_port(&self, id: u64) -> Result<RearPortResponse, Error> {
        self.get_object("rear port", &format!("dcim/rear-ports/{id}/"), id)
            .await
    }
}
