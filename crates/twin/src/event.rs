//! Events delivered by the device registry's webhook.
//!
//! The registry posts one [`Delivery`] per state change: the [`Event`] itself
//! plus the source device's *current* [`Labels`]. Only `temperature` and
//! `labelsChanged` events carry payloads the reconciler understands; every
//! other type is kept by name so it can be reported as skipped.

use serde::{Deserialize, Serialize};

use crate::{DeviceId, Labels, ProjectId, TemperatureReading};

/// Event type name of a temperature reading.
pub const EVENT_TEMPERATURE: &str = "temperature";

/// Event type name of a label change.
pub const EVENT_LABELS_CHANGED: &str = "labelsChanged";

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// One webhook delivery: the event and the labels of its source device.
///
/// `labels` reflects the device at delivery time, which can differ from the
/// delta embedded in a `labelsChanged` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Delivery {
    pub event: Event,
    #[serde(default)]
    pub labels: Labels,
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A single state-change notification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawEvent")]
pub struct Event {
    /// Registry-assigned event id, when present. Used for logging only.
    pub event_id: Option<String>,
    /// Resource path of the source device, `projects/{project}/devices/{device}`.
    pub target_name: String,
    pub kind: EventKind,
}

/// Type-specific payload of an [`Event`].
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// A new sensor reading.
    Temperature(TemperatureReading),
    /// Labels were added, modified or removed on the source device.
    LabelsChanged(LabelDelta),
    /// Any other event type; carries the type name only.
    Other(String),
}

impl EventKind {
    /// The registry's name for this event type.
    pub fn name(&self) -> &str {
        match self {
            Self::Temperature(_) => EVENT_TEMPERATURE,
            Self::LabelsChanged(_) => EVENT_LABELS_CHANGED,
            Self::Other(name) => name,
        }
    }
}

impl Event {
    /// A `temperature` event for `target_name`.
    pub fn temperature(target_name: impl Into<String>, reading: TemperatureReading) -> Self {
        Self {
            event_id: None,
            target_name: target_name.into(),
            kind: EventKind::Temperature(reading),
        }
    }

    /// A `labelsChanged` event for `target_name`.
    pub fn labels_changed(target_name: impl Into<String>, delta: LabelDelta) -> Self {
        Self {
            event_id: None,
            target_name: target_name.into(),
            kind: EventKind::LabelsChanged(delta),
        }
    }

    /// An event of a type the reconciler does not handle.
    pub fn other(target_name: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            event_id: None,
            target_name: target_name.into(),
            kind: EventKind::Other(event_type.into()),
        }
    }

    pub fn event_type(&self) -> &str {
        self.kind.name()
    }

    /// Splits the target name into project and device ids.
    ///
    /// Returns `None` unless the name has exactly the shape
    /// `projects/{project}/devices/{device}` with non-empty ids.
    pub fn target(&self) -> Option<Target> {
        Target::parse(&self.target_name)
    }
}

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// The project and device an event refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub project: ProjectId,
    pub device: DeviceId,
}

impl Target {
    /// Parses `projects/{project}/devices/{device}`.
    pub fn parse(name: &str) -> Option<Self> {
        let mut segments = name.split('/');
        let (Some("projects"), Some(project), Some("devices"), Some(device), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return None;
        };

        Some(Self {
            project: ProjectId::new(project)?,
            device: DeviceId::new(device)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Label delta
// ---------------------------------------------------------------------------

/// The label changes carried by a `labelsChanged` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelDelta {
    #[serde(default)]
    pub added: Labels,
    #[serde(default)]
    pub modified: Labels,
    /// Keys only; removed labels have no value.
    #[serde(default)]
    pub removed: Vec<String>,
}

/// How a single label key was affected by a [`LabelDelta`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelChange {
    Added,
    Modified,
    Removed,
}

impl LabelDelta {
    /// Reports how `key` changed, checking added, then modified, then removed.
    ///
    /// The first match wins, so a key listed in several parts is reported by
    /// the earliest one.
    pub fn change_of(&self, key: &str) -> Option<LabelChange> {
        if self.added.contains(key) {
            Some(LabelChange::Added)
        } else if self.modified.contains(key) {
            Some(LabelChange::Modified)
        } else if self.removed.iter().any(|k| k == key) {
            Some(LabelChange::Removed)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Wire decoding
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    #[serde(default)]
    event_id: Option<String>,
    event_type: String,
    target_name: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Deserialize)]
struct TemperatureData {
    temperature: TemperatureReading,
}

impl TryFrom<RawEvent> for Event {
    type Error = serde_json::Error;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        let kind = match raw.event_type.as_str() {
            EVENT_TEMPERATURE => {
                let data: TemperatureData = serde_json::from_value(raw.data)?;
                EventKind::Temperature(data.temperature)
            }
            EVENT_LABELS_CHANGED if raw.data.is_null() => {
                EventKind::LabelsChanged(LabelDelta::default())
            }
            EVENT_LABELS_CHANGED => EventKind::LabelsChanged(serde_json::from_value(raw.data)?),
            _ => EventKind::Other(raw.event_type),
        };

        Ok(Self {
            event_id: raw.event_id,
            target_name: raw.target_name,
            kind,
        })
    }
}
