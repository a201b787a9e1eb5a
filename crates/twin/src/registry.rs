//! Port definitions for the external device registry.
//!
//! The registry is the system of record: the roster, the twin binding and the
//! decay model state all live on registry devices. The reconciler reaches it
//! only through [`DeviceRegistry`]; infrastructure crates supply the
//! implementation (HTTP in production, in-memory for simulation and tests).
//!
//! Every call is a single request/response attempt. Implementations must not
//! retry internally; failures surface as [`RegistryError`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Device, DeviceId, Labels, ProjectId, RegistryError};

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// A modelled temperature value published to a twin.
///
/// The registry stamps its own `updateTime` on publish.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureSample {
    pub value: f64,
}

/// Body of a publish call: `{"temperature": {"value": ...}}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PublishPayload {
    pub temperature: TemperatureSample,
}

impl PublishPayload {
    pub fn temperature(value: f64) -> Self {
        Self {
            temperature: TemperatureSample { value },
        }
    }
}

// ---------------------------------------------------------------------------
// DeviceRegistry
// ---------------------------------------------------------------------------

/// Operations the reconciler needs from the device registry.
///
/// An instance is already authorised: the credential is bound when the
/// instance is obtained (see [`RegistryConnector`]), not passed per call.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Lists every device in `project`, in registry order.
    async fn list_devices(&self, project: &ProjectId) -> Result<Vec<Device>, RegistryError>;

    /// Creates a device and returns it as the registry stored it.
    async fn create_device(
        &self,
        project: &ProjectId,
        device_type: &str,
        labels: &Labels,
    ) -> Result<Device, RegistryError>;

    async fn delete_device(&self, project: &ProjectId, device: &DeviceId)
        -> Result<(), RegistryError>;

    /// Sets the value of one existing label.
    async fn patch_label(
        &self,
        project: &ProjectId,
        device: &DeviceId,
        key: &str,
        value: &str,
    ) -> Result<(), RegistryError>;

    /// Publishes a reading to an emulated device.
    async fn publish_reading(
        &self,
        project: &ProjectId,
        device: &DeviceId,
        payload: &PublishPayload,
    ) -> Result<(), RegistryError>;
}

#[async_trait]
impl<R> DeviceRegistry for Arc<R>
where
    R: DeviceRegistry + ?Sized,
{
    async fn list_devices(&self, project: &ProjectId) -> Result<Vec<Device>, RegistryError> {
        (**self).list_devices(project).await
    }

    async fn create_device(
        &self,
        project: &ProjectId,
        device_type: &str,
        labels: &Labels,
    ) -> Result<Device, RegistryError> {
        (**self).create_device(project, device_type, labels).await
    }

    async fn delete_device(
        &self,
        project: &ProjectId,
        device: &DeviceId,
    ) -> Result<(), RegistryError> {
        (**self).delete_device(project, device).await
    }

    async fn patch_label(
        &self,
        project: &ProjectId,
        device: &DeviceId,
        key: &str,
        value: &str,
    ) -> Result<(), RegistryError> {
        (**self).patch_label(project, device, key, value).await
    }

    async fn publish_reading(
        &self,
        project: &ProjectId,
        device: &DeviceId,
        payload: &PublishPayload,
    ) -> Result<(), RegistryError> {
        (**self).publish_reading(project, device, payload).await
    }
}

// ---------------------------------------------------------------------------
// RegistryConnector
// ---------------------------------------------------------------------------

/// Produces an authorised [`DeviceRegistry`] for one invocation.
///
/// Production implementations acquire a fresh access token on every call;
/// nothing is cached between invocations.
#[async_trait]
pub trait RegistryConnector: Send + Sync {
    type Registry: DeviceRegistry + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn connect(&self) -> Result<Self::Registry, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_payload_wire_shape() {
        let json = serde_json::to_value(PublishPayload::temperature(21.5)).unwrap();
        assert_eq!(json, serde_json::json!({"temperature": {"value": 21.5}}));
    }
}
