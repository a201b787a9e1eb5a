//! Registry REST wire format.
//!
//! Devices are addressed by resource name (`projects/{p}/devices/{d}`) on the
//! wire; the domain only keeps the trailing device id.

use serde::{Deserialize, Serialize};
use twin::{Device, DeviceId, Labels, RegistryError, ReportedState};

/// A device as the registry returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceResource {
    /// Full resource name, `projects/{project}/devices/{device}`.
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported: Option<ReportedState>,
}

impl DeviceResource {
    /// Converts to the domain model, keeping the last path segment as the id.
    pub fn into_device(self) -> Result<Device, RegistryError> {
        let id = self
            .name
            .rsplit('/')
            .next()
            .and_then(DeviceId::new)
            .ok_or_else(|| RegistryError::Decode(format!("invalid device name '{}'", self.name)))?;

        Ok(Device {
            id,
            device_type: self.device_type,
            labels: self.labels,
            reported: self.reported,
        })
    }
}

/// One page of a device listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDevicesResponse {
    #[serde(default)]
    pub devices: Vec<DeviceResource>,
    /// Empty on the last page.
    #[serde(default)]
    pub next_page_token: String,
}

impl ListDevicesResponse {
    /// Converts every device on this page to the domain model.
    pub fn into_devices(self) -> Result<Vec<Device>, RegistryError> {
        self.devices
            .into_iter()
            .map(DeviceResource::into_device)
            .collect()
    }
}

/// Body of a create-device request.
#[derive(Debug, Serialize)]
pub struct CreateDeviceRequest<'a> {
    #[serde(rename = "type")]
    pub device_type: &'a str,
    pub labels: &'a Labels,
}

/// Body of a label update.
#[derive(Debug, Serialize, Deserialize)]
pub struct LabelValue<'a> {
    pub value: &'a str,
}
