//! Registry URL construction.
//!
//! The registry splits its REST surface over two bases: the main API (device
//! listing, label updates) and the emulator API (creating, deleting and
//! publishing to emulated devices).

use twin::{DeviceId, ProjectId};

/// Base URLs of the registry REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEndpoints {
    api_url_base: String,
    emulator_url_base: String,
}

impl RegistryEndpoints {
    /// Creates endpoints from the two base URLs. Trailing slashes are ignored.
    pub fn new(api_url_base: impl Into<String>, emulator_url_base: impl Into<String>) -> Self {
        Self {
            api_url_base: trim(api_url_base.into()),
            emulator_url_base: trim(emulator_url_base.into()),
        }
    }

    /// `GET` target listing a project's devices.
    pub fn list_devices(&self, project: &ProjectId) -> String {
        format!("{}/projects/{project}/devices", self.api_url_base)
    }

    /// `POST` target creating an emulated device.
    pub fn create_device(&self, project: &ProjectId) -> String {
        format!("{}/projects/{project}/devices", self.emulator_url_base)
    }

    /// `DELETE` target removing an emulated device.
    pub fn delete_device(&self, project: &ProjectId, device: &DeviceId) -> String {
        format!(
            "{}/projects/{project}/devices/{device}",
            self.emulator_url_base
        )
    }

    /// `PATCH` target updating one label's value.
    pub fn label(&self, project: &ProjectId, device: &DeviceId, key: &str) -> String {
        format!(
            "{}/projects/{project}/devices/{device}/labels/{key}",
            self.api_url_base
        )
    }

    /// `POST` target publishing an event to an emulated device.
    pub fn publish(&self, project: &ProjectId, device: &DeviceId) -> String {
        format!(
            "{}/projects/{project}/devices/{device}:publish",
            self.emulator_url_base
        )
    }
}

fn trim(mut base: String) -> String {
    while base.ends_with('/') {
        base.pop();
    }
    base
}
