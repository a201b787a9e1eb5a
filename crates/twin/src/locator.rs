//! Twin lookups over a device roster.
//!
//! The roster is the project's device list as the registry returned it at the
//! start of an invocation. All functions here are pure scans over that slice;
//! where several devices match, the first in roster order wins.

use crate::{Device, DeviceId, ReconcilerConfig};

/// Returns `true` if `device` is an emulated twin.
///
/// Purely syntactic: the device id carries the configured twin prefix.
pub fn is_twin(device: &Device, config: &ReconcilerConfig) -> bool {
    device.id.has_prefix(&config.twin_id_prefix)
}

/// Returns `true` if `device` is a twin bound to `original`.
pub fn is_bound_twin(device: &Device, original: &DeviceId, config: &ReconcilerConfig) -> bool {
    is_twin(device, config)
        && device.labels.get(&config.original_device_label) == Some(original.as_str())
}

/// Finds the device with id `id`.
pub fn find_original_device<'a>(id: &DeviceId, roster: &'a [Device]) -> Option<&'a Device> {
    roster.iter().find(|device| &device.id == id)
}

/// Finds the twin bound to `original`.
///
/// If the roster holds several bound twins only the first is returned; the
/// rest are a detected inconsistency that cleanup removes.
pub fn find_twin<'a>(
    original: &DeviceId,
    roster: &'a [Device],
    config: &ReconcilerConfig,
) -> Option<&'a Device> {
    roster
        .iter()
        .find(|device| is_bound_twin(device, original, config))
}

/// Every twin bound to `original`, in roster order.
pub fn bound_twins<'r, 'k>(
    original: &'k DeviceId,
    roster: &'r [Device],
    config: &'k ReconcilerConfig,
) -> impl Iterator<Item = &'r Device> + 'k
where
    'r: 'k,
{
    roster
        .iter()
        .filter(move |device| is_bound_twin(device, original, config))
}

/// The human-readable name of `device`: its name label, or its id.
pub fn display_name<'a>(device: &'a Device, config: &ReconcilerConfig) -> &'a str {
    device
        .labels
        .get(&config.name_label)
        .unwrap_or_else(|| device.id.as_str())
}

/// Returns `true` if `twin`'s display name does not start with `original`'s.
pub fn violates_naming(twin: &Device, original: &Device, config: &ReconcilerConfig) -> bool {
    !display_name(twin, config).starts_with(display_name(original, config))
}
