//! An in-process [`DeviceRegistry`].
//!
//! Holds one project's roster in memory, records every call it receives and
//! can be told to fail selected operations. Used by the `simulate` command to
//! dry-run an event against a captured roster, and by tests.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use twin::{
    Device, DeviceId, DeviceRegistry, Labels, ProjectId, PublishPayload, RegistryError,
    TemperatureReading, Timestamp,
};

/// Registry operation kinds, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    List,
    Create,
    Delete,
    PatchLabel,
    Publish,
}

/// One call received by the registry, with its arguments.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum RegistryCall {
    List {
        project: ProjectId,
    },
    Create {
        project: ProjectId,
        device_type: String,
        labels: Labels,
    },
    Delete {
        project: ProjectId,
        device: DeviceId,
    },
    PatchLabel {
        project: ProjectId,
        device: DeviceId,
        key: String,
        value: String,
    },
    Publish {
        project: ProjectId,
        device: DeviceId,
        payload: PublishPayload,
    },
}

impl RegistryCall {
    pub fn operation(&self) -> Operation {
        match self {
            Self::List { .. } => Operation::List,
            Self::Create { .. } => Operation::Create,
            Self::Delete { .. } => Operation::Delete,
            Self::PatchLabel { .. } => Operation::PatchLabel,
            Self::Publish { .. } => Operation::Publish,
        }
    }
}

#[derive(Debug, Clone)]
struct Failure {
    operation: Operation,
    /// `None` fails the operation for every device.
    device: Option<DeviceId>,
    code: u16,
}

#[derive(Debug)]
struct State {
    devices: Vec<Device>,
    calls: Vec<RegistryCall>,
    failures: Vec<Failure>,
    twin_id_prefix: String,
    next_id: u64,
}

/// In-memory registry for a single project.
///
/// The project argument of each call is recorded but not used to partition
/// devices.
#[derive(Debug)]
pub struct InMemoryRegistry {
    state: Mutex<State>,
}

impl InMemoryRegistry {
    /// Creates a registry holding `devices`; created twins get ids prefixed `emu`.
    pub fn new(devices: Vec<Device>) -> Self {
        Self::with_twin_prefix(devices, twin::config::DEFAULT_TWIN_ID_PREFIX)
    }

    /// Creates a registry whose created devices get ids starting with `prefix`.
    pub fn with_twin_prefix(devices: Vec<Device>, prefix: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(State {
                devices,
                calls: Vec::new(),
                failures: Vec::new(),
                twin_id_prefix: prefix.into(),
                next_id: 1,
            }),
        }
    }

    /// Makes every future call of `operation` fail with status `code`.
    pub fn fail(&self, operation: Operation, code: u16) {
        self.lock().failures.push(Failure {
            operation,
            device: None,
            code,
        });
    }

    /// Makes future calls of `operation` on `device` fail with status `code`.
    pub fn fail_on(&self, operation: Operation, device: DeviceId, code: u16) {
        self.lock().failures.push(Failure {
            operation,
            device: Some(device),
            code,
        });
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<RegistryCall> {
        self.lock().calls.clone()
    }

    /// Number of calls of `operation` received so far.
    pub fn count(&self, operation: Operation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    /// The current roster.
    pub fn devices(&self) -> Vec<Device> {
        self.lock().devices.clone()
    }

    /// Looks up a device in the current roster.
    pub fn device(&self, id: &DeviceId) -> Option<Device> {
        self.lock().devices.iter().find(|d| &d.id == id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl State {
    /// Records `call` and returns the injected failure for it, if any.
    fn receive(&mut self, call: RegistryCall, device: Option<&DeviceId>) -> Result<(), RegistryError> {
        let operation = call.operation();
        self.calls.push(call);

        let injected = self.failures.iter().find(|f| {
            f.operation == operation && (f.device.is_none() || f.device.as_ref() == device)
        });
        match injected {
            Some(failure) => Err(RegistryError::Status {
                code: failure.code,
                body: format!("injected {operation:?} failure"),
            }),
            None => Ok(()),
        }
    }

    fn device_mut(&mut self, id: &DeviceId) -> Result<&mut Device, RegistryError> {
        self.devices
            .iter_mut()
            .find(|d| &d.id == id)
            .ok_or_else(|| not_found(id))
    }
}

fn not_found(id: &DeviceId) -> RegistryError {
    RegistryError::Status {
        code: 404,
        body: format!("device {id} not found"),
    }
}

#[async_trait]
impl DeviceRegistry for InMemoryRegistry {
    async fn list_devices(&self, project: &ProjectId) -> Result<Vec<Device>, RegistryError> {
        let mut state = self.lock();
        state.receive(
            RegistryCall::List {
                project: project.clone(),
            },
            None,
        )?;
        Ok(state.devices.clone())
    }

    async fn create_device(
        &self,
        project: &ProjectId,
        device_type: &str,
        labels: &Labels,
    ) -> Result<Device, RegistryError> {
        let mut state = self.lock();
        state.receive(
            RegistryCall::Create {
                project: project.clone(),
                device_type: device_type.to_string(),
                labels: labels.clone(),
            },
            None,
        )?;

        let raw_id = format!("{}{:06}", state.twin_id_prefix, state.next_id);
        state.next_id += 1;
        let id = DeviceId::new(raw_id)
            .ok_or_else(|| RegistryError::Decode("generated an empty device id".to_string()))?;

        let mut device = Device::new(id).with_type(device_type);
        device.labels = labels.clone();
        state.devices.push(device.clone());
        Ok(device)
    }

    async fn delete_device(
        &self,
        project: &ProjectId,
        device: &DeviceId,
    ) -> Result<(), RegistryError> {
        let mut state = self.lock();
        state.receive(
            RegistryCall::Delete {
                project: project.clone(),
                device: device.clone(),
            },
            Some(device),
        )?;

        let before = state.devices.len();
        state.devices.retain(|d| &d.id != device);
        if state.devices.len() == before {
            return Err(not_found(device));
        }
        Ok(())
    }

    async fn patch_label(
        &self,
        project: &ProjectId,
        device: &DeviceId,
        key: &str,
        value: &str,
    ) -> Result<(), RegistryError> {
        let mut state = self.lock();
        state.receive(
            RegistryCall::PatchLabel {
                project: project.clone(),
                device: device.clone(),
                key: key.to_string(),
                value: value.to_string(),
            },
            Some(device),
        )?;

        state.device_mut(device)?.labels.insert(key, value);
        Ok(())
    }

    async fn publish_reading(
        &self,
        project: &ProjectId,
        device: &DeviceId,
        payload: &PublishPayload,
    ) -> Result<(), RegistryError> {
        let mut state = self.lock();
        state.receive(
            RegistryCall::Publish {
                project: project.clone(),
                device: device.clone(),
                payload: *payload,
            },
            Some(device),
        )?;

        let reading = TemperatureReading::new(payload.temperature.value, Timestamp::now());
        let stored = state.device_mut(device)?;
        *stored = stored.clone().with_reported_temperature(reading);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: &str) -> DeviceId {
        DeviceId::new(value).unwrap()
    }

    fn project() -> ProjectId {
        ProjectId::new("p1").unwrap()
    }

    #[tokio::test]
    async fn create_assigns_prefixed_ids() {
        let registry = InMemoryRegistry::new(vec![]);
        let labels = Labels::new().with("name", "Room1 twin");

        let first = registry
            .create_device(&project(), "temperature", &labels)
            .await
            .unwrap();
        let second = registry
            .create_device(&project(), "temperature", &labels)
            .await
            .unwrap();

        assert_eq!(first.id.as_str(), "emu000001");
        assert_eq!(second.id.as_str(), "emu000002");
        assert_eq!(first.device_type.as_deref(), Some("temperature"));
        assert_eq!(registry.devices().len(), 2);
    }

    #[tokio::test]
    async fn delete_of_unknown_device_is_not_found() {
        let registry = InMemoryRegistry::new(vec![]);
        let err = registry.delete_device(&project(), &id("emu1")).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert_eq!(registry.count(Operation::Delete), 1);
    }

    #[tokio::test]
    async fn injected_failures_can_target_one_device() {
        let registry = InMemoryRegistry::new(vec![Device::new(id("emu1")), Device::new(id("emu2"))]);
        registry.fail_on(Operation::Delete, id("emu1"), 500);

        let first = registry.delete_device(&project(), &id("emu1")).await;
        let second = registry.delete_device(&project(), &id("emu2")).await;

        assert!(matches!(first, Err(RegistryError::Status { code: 500, .. })));
        assert!(second.is_ok());
        assert!(registry.device(&id("emu1")).is_some());
        assert!(registry.device(&id("emu2")).is_none());
    }

    #[tokio::test]
    async fn publish_stores_reported_temperature() {
        let registry = InMemoryRegistry::new(vec![Device::new(id("emu1"))]);
        registry
            .publish_reading(&project(), &id("emu1"), &PublishPayload::temperature(19.25))
            .await
            .unwrap();

        let reading = registry
            .device(&id("emu1"))
            .and_then(|d| d.reported_temperature())
            .unwrap();
        assert_eq!(reading.value, 19.25);
    }

    #[tokio::test]
    async fn patch_label_overwrites_value() {
        let registry = InMemoryRegistry::new(vec![Device::new(id("emu1")).with_label("name", "old")]);
        registry
            .patch_label(&project(), &id("emu1"), "name", "new")
            .await
            .unwrap();
        assert_eq!(
            registry.device(&id("emu1")).unwrap().labels.get("name"),
            Some("new")
        );
    }
}
