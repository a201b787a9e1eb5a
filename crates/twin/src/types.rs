//! Shared value types for the twin reconciliation domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values and participate in domain decisions: the device roster,
//! label sets, temperature readings and the outcome reported to the caller.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DeviceId;

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly. Serialised as an RFC 3339 string, which is the format the
/// registry uses for `updateTime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from whole seconds since the unix epoch.
    ///
    /// Returns `None` if `secs` is outside the range `chrono` can represent.
    pub fn from_unix_seconds(secs: i64) -> Option<Self> {
        DateTime::from_timestamp(secs, 0).map(Self)
    }

    /// Parses an RFC 3339 timestamp (any offset), normalising it to UTC.
    pub fn parse_rfc3339(value: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| Self(dt.with_timezone(&Utc)))
    }

    /// Whole seconds since the unix epoch, rounded towards negative infinity.
    pub fn unix_seconds(self) -> i64 {
        self.0.timestamp()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// A device's label set: string keys mapped to string values.
///
/// Label order carries no meaning; a sorted map keeps serialised output and
/// log lines stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Labels(BTreeMap<String, String>);

impl Labels {
    /// Creates an empty label set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns `true` if `key` is present, whatever its value.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Inserts or replaces a label, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder-style [`Labels::insert`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Labels {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

/// A temperature reading as reported by a sensor or stored on a twin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureReading {
    /// Degrees Celsius.
    pub value: f64,
    /// When the reading was taken.
    pub update_time: Timestamp,
}

impl TemperatureReading {
    pub fn new(value: f64, update_time: Timestamp) -> Self {
        Self { value, update_time }
    }
}

/// The last-known state a device has reported to the registry.
///
/// Only the temperature part is modelled; other reported kinds are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportedState {
    /// `None` when the device has never reported a temperature.
    #[serde(default)]
    pub temperature: Option<TemperatureReading>,
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

/// A device in the registry: either a real sensor or an emulated twin.
///
/// Whether a device is a twin is decided purely from its [`DeviceId`] prefix
/// (see [`crate::locator::is_twin`]); there is no stored flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,

    /// Registry device type (e.g. `"temperature"`), when known.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,

    #[serde(default)]
    pub labels: Labels,

    /// `None` when the registry returned no reported state at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported: Option<ReportedState>,
}

impl Device {
    /// Creates a device with no labels and no reported state.
    pub fn new(id: DeviceId) -> Self {
        Self {
            id,
            device_type: None,
            labels: Labels::new(),
            reported: None,
        }
    }

    /// Builder-style label insertion.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key, value);
        self
    }

    /// Builder-style device type.
    #[must_use]
    pub fn with_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = Some(device_type.into());
        self
    }

    /// Builder-style reported temperature.
    #[must_use]
    pub fn with_reported_temperature(mut self, reading: TemperatureReading) -> Self {
        self.reported = Some(ReportedState {
            temperature: Some(reading),
        });
        self
    }

    /// The last temperature this device reported, if any.
    pub fn reported_temperature(&self) -> Option<TemperatureReading> {
        self.reported.as_ref().and_then(|r| r.temperature)
    }
}

// ---------------------------------------------------------------------------
// Invocation outcome
// ---------------------------------------------------------------------------

/// HTTP-style status code used for success, including intentional no-ops.
pub const STATUS_OK: u16 = 200;

/// HTTP-style status code used for caller/input errors.
pub const STATUS_BAD_REQUEST: u16 = 400;

/// HTTP-style status code used when the registry could not be reached or
/// answered with content that could not be decoded.
pub const STATUS_BAD_GATEWAY: u16 = 502;

/// The `(message, statusCode)` pair produced by one invocation.
///
/// A `200` does not by itself mean reconciliation happened: skips and no-ops
/// are also `200` and are told apart by `message` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub message: String,
    pub code: u16,
}

impl Status {
    pub fn new(message: impl Into<String>, code: u16) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }

    /// A `200` status with the given message.
    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(message, STATUS_OK)
    }

    pub fn is_success(&self) -> bool {
        self.code == STATUS_OK
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}
