//! Reconciliation configuration.
//!
//! Label keys, the twin id prefix and twin naming conventions are process-wide
//! values read once at startup. They are carried in an explicit
//! [`ReconcilerConfig`] that is passed to every decision function, so the
//! reconciliation logic has no hidden dependencies on the environment.

use serde::{Deserialize, Serialize};

/// Default key of the label that enables emulation and carries the decay coefficient.
pub const DEFAULT_EMULATION_LABEL: &str = "inertia-model";

/// Default key of the label that binds a twin to its original device.
pub const DEFAULT_ORIGINAL_DEVICE_LABEL: &str = "original_device_id";

/// Default key of the human-readable name label.
pub const DEFAULT_NAME_LABEL: &str = "name";

/// Default id prefix the registry gives emulated devices.
pub const DEFAULT_TWIN_ID_PREFIX: &str = "emu";

/// Default suffix appended to the original device's display name.
pub const DEFAULT_TWIN_NAME_SUFFIX: &str = " twin";

/// Default registry device type used when spawning a twin.
pub const DEFAULT_TWIN_DEVICE_TYPE: &str = "temperature";

/// Label keys and naming conventions used by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Label whose presence enables a twin and whose value is the decay coefficient `k`.
    pub emulation_label: String,
    /// Label on a twin holding the id of the device it emulates.
    pub original_device_label: String,
    /// Label holding a device's human-readable name.
    pub name_label: String,
    /// Device id prefix that classifies a device as an emulated twin.
    pub twin_id_prefix: String,
    /// Appended to the original device's display name to name its twin.
    pub twin_name_suffix: String,
    /// Registry device type requested when spawning a twin.
    pub twin_device_type: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            emulation_label: DEFAULT_EMULATION_LABEL.to_string(),
            original_device_label: DEFAULT_ORIGINAL_DEVICE_LABEL.to_string(),
            name_label: DEFAULT_NAME_LABEL.to_string(),
            twin_id_prefix: DEFAULT_TWIN_ID_PREFIX.to_string(),
            twin_name_suffix: DEFAULT_TWIN_NAME_SUFFIX.to_string(),
            twin_device_type: DEFAULT_TWIN_DEVICE_TYPE.to_string(),
        }
    }
}

impl ReconcilerConfig {
    /// The name a twin of a device displayed as `original_name` should carry.
    pub fn twin_name(&self, original_name: &str) -> String {
        format!("{original_name}{}", self.twin_name_suffix)
    }
}
