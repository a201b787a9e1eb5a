//! Pure reconciliation decisions.
//!
//! Given one event, the source device's current labels and the roster, these
//! functions decide which registry commands must be issued. They perform no
//! I/O; the `reconciler` crate executes the commands and feeds the results of
//! fatal steps (the created twin) back into [`rename_command`] and
//! [`model_update`].
//!
//! Decision order for one event:
//!
//! 1. Event types other than `temperature` and `labelsChanged` are skipped
//!    ([`skipped_event_type`]) before the target or roster is looked at.
//! 2. For `labelsChanged`, the emulation label's change decides: added requests
//!    a spawn, modified is acknowledged with no structural change, removed
//!    cleans up bound twins.
//! 3. If the emulation label is present (or a spawn was requested) the twin is
//!    synchronised: the original device must be in the roster, a missing twin
//!    is created after cleanup, a misnamed twin is renamed.
//! 4. Otherwise bound twins are cleaned up (deactivation).
//! 5. For `temperature` events the synchronised twin's model is advanced.

use serde::Serialize;

use crate::decay;
use crate::event::LabelChange;
use crate::locator::{bound_twins, display_name, find_original_device, find_twin, violates_naming};
use crate::{
    Device, DeviceId, Event, EventKind, Labels, PublishPayload, ReconcileError, ReconcilerConfig,
    Target, TemperatureReading,
};

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Whether a failed step aborts the invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Failure aborts the invocation and is reported to the caller.
    Fatal,
    /// Failure is logged; the invocation continues.
    BestEffort,
}

/// One registry call the reconciler issues.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum RegistryCommand {
    /// Spawn a twin.
    Create { device_type: String, labels: Labels },
    /// Remove a twin.
    Delete { device: DeviceId },
    /// Set a twin's name label.
    Rename {
        device: DeviceId,
        label: String,
        name: String,
    },
    /// Publish a new modelled value to a twin.
    Publish {
        device: DeviceId,
        payload: PublishPayload,
    },
}

impl RegistryCommand {
    /// Create and publish are required steps; delete and rename are best-effort.
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::Create { .. } | Self::Publish { .. } => Disposition::Fatal,
            Self::Delete { .. } | Self::Rename { .. } => Disposition::BestEffort,
        }
    }

    /// The device this command targets; `None` for a create.
    pub fn device(&self) -> Option<&DeviceId> {
        match self {
            Self::Create { .. } => None,
            Self::Delete { device } | Self::Rename { device, .. } | Self::Publish { device, .. } => {
                Some(device)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Delete { .. } => "delete",
            Self::Rename { .. } => "rename",
            Self::Publish { .. } => "publish",
        }
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// What an event requires, decided from the event, labels and roster.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// The emulation coefficient changed. The new value is read from the
    /// labels on the next temperature event, so nothing is stored here.
    CoefficientModified,
    /// The emulation label was removed: delete every bound twin.
    EmulationRemoved { cleanup: Vec<RegistryCommand> },
    /// No emulation label and no spawn requested: delete every bound twin.
    Deactivate { cleanup: Vec<RegistryCommand> },
    /// The twin must exist and carry the right name.
    Synchronize(Synchronize),
}

/// Synchronisation of one original device with its twin.
#[derive(Debug, Clone, PartialEq)]
pub struct Synchronize {
    /// The original device as found in the roster.
    pub original: Device,
    pub twin: TwinState,
    /// Reading to advance the model with once the twin is resolved.
    /// `None` for label-change events, which never update the model.
    pub reading: Option<TemperatureReading>,
}

/// Whether the roster already holds a twin for the original device.
#[derive(Debug, Clone, PartialEq)]
pub enum TwinState {
    /// The first bound twin in roster order.
    Existing(Device),
    /// No twin: clean up stale bindings, then create one.
    Missing {
        cleanup: Vec<RegistryCommand>,
        create: RegistryCommand,
    },
}

/// The event type name when `event` is not one the reconciler handles.
pub fn skipped_event_type(event: &Event) -> Option<&str> {
    match &event.kind {
        EventKind::Other(event_type) => Some(event_type.as_str()),
        EventKind::Temperature(_) | EventKind::LabelsChanged(_) => None,
    }
}

/// Decides what `event` requires.
///
/// `target` is the parsed target of `event`; `labels` are the source device's
/// current labels; `roster` is the project's device list. Events for which
/// [`skipped_event_type`] is `Some` are filtered out before this is called;
/// they carry no reading and request no spawn.
///
/// # Errors
///
/// Returns [`ReconcileError::OriginalDeviceNotFound`] when a twin must be
/// synchronised but the source device is not in the roster.
pub fn decide(
    event: &Event,
    target: &Target,
    labels: &Labels,
    roster: &[Device],
    config: &ReconcilerConfig,
) -> Result<Decision, ReconcileError> {
    let (spawn_requested, reading) = match &event.kind {
        EventKind::Other(_) => (false, None),
        EventKind::LabelsChanged(delta) => match delta.change_of(&config.emulation_label) {
            Some(LabelChange::Added) => (true, None),
            Some(LabelChange::Modified) => return Ok(Decision::CoefficientModified),
            Some(LabelChange::Removed) => {
                return Ok(Decision::EmulationRemoved {
                    cleanup: cleanup_commands(&target.device, roster, config),
                })
            }
            None => (false, None),
        },
        EventKind::Temperature(reading) => (false, Some(*reading)),
    };

    if !spawn_requested && !labels.contains(&config.emulation_label) {
        return Ok(Decision::Deactivate {
            cleanup: cleanup_commands(&target.device, roster, config),
        });
    }

    let original = find_original_device(&target.device, roster).ok_or_else(|| {
        ReconcileError::OriginalDeviceNotFound {
            device: target.device.clone(),
        }
    })?;

    let twin = match find_twin(&target.device, roster, config) {
        Some(twin) => TwinState::Existing(twin.clone()),
        None => TwinState::Missing {
            cleanup: cleanup_commands(&target.device, roster, config),
            create: spawn_command(original, config),
        },
    };

    Ok(Decision::Synchronize(Synchronize {
        original: original.clone(),
        twin,
        reading,
    }))
}

/// A delete for every twin bound to `original`, in roster order.
pub fn cleanup_commands(
    original: &DeviceId,
    roster: &[Device],
    config: &ReconcilerConfig,
) -> Vec<RegistryCommand> {
    bound_twins(original, roster, config)
        .map(|twin| RegistryCommand::Delete {
            device: twin.id.clone(),
        })
        .collect()
}

/// The create command for a twin of `original`.
pub fn spawn_command(original: &Device, config: &ReconcilerConfig) -> RegistryCommand {
    let labels = Labels::new()
        .with(
            config.name_label.as_str(),
            config.twin_name(display_name(original, config)),
        )
        .with(config.original_device_label.as_str(), original.id.as_str());

    RegistryCommand::Create {
        device_type: config.twin_device_type.clone(),
        labels,
    }
}

/// A rename for `twin` if its name no longer starts with `original`'s name.
pub fn rename_command(
    twin: &Device,
    original: &Device,
    config: &ReconcilerConfig,
) -> Option<RegistryCommand> {
    violates_naming(twin, original, config).then(|| RegistryCommand::Rename {
        device: twin.id.clone(),
        label: config.name_label.clone(),
        name: config.twin_name(display_name(original, config)),
    })
}

// ---------------------------------------------------------------------------
// Model update
// ---------------------------------------------------------------------------

/// The decay model step for a temperature event.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelUpdate {
    /// Publish the advanced value to the twin.
    Publish { value: f64, command: RegistryCommand },
    /// The emulation label is missing or not a number; nothing is published.
    NonNumericCoefficient,
}

/// Advances `twin`'s model with `reading`, using the coefficient from the
/// source device's current `labels`.
pub fn model_update(
    twin: &Device,
    reading: TemperatureReading,
    labels: &Labels,
    config: &ReconcilerConfig,
) -> ModelUpdate {
    let Some(k) = labels
        .get(&config.emulation_label)
        .and_then(decay::parse_coefficient)
    else {
        return ModelUpdate::NonNumericCoefficient;
    };

    let value = decay::advance_reading(twin.reported_temperature(), reading, k);
    ModelUpdate::Publish {
        value,
        command: RegistryCommand::Publish {
            device: twin.id.clone(),
            payload: PublishPayload::temperature(value),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LabelDelta, Timestamp};

    const TARGET: &str = "projects/p1/devices/abc";

    fn id(value: &str) -> DeviceId {
        DeviceId::new(value).unwrap()
    }

    fn target() -> Target {
        Target::parse(TARGET).unwrap()
    }

    fn emulated() -> Labels {
        Labels::new().with("inertia-model", "0.5")
    }

    fn reading(value: f64, secs: i64) -> TemperatureReading {
        TemperatureReading::new(value, Timestamp::from_unix_seconds(secs).unwrap())
    }

    fn original() -> Device {
        Device::new(id("abc")).with_label("name", "Room1")
    }

    fn twin(value: &str, name: &str) -> Device {
        Device::new(id(value))
            .with_label("name", name)
            .with_label("original_device_id", "abc")
    }

    fn decide_with(event: Event, labels: &Labels, roster: &[Device]) -> Decision {
        decide(&event, &target(), labels, roster, &ReconcilerConfig::default()).unwrap()
    }

    #[test]
    fn only_temperature_and_label_events_are_handled() {
        assert_eq!(
            skipped_event_type(&Event::other("not a target", "touch")),
            Some("touch")
        );
        assert_eq!(
            skipped_event_type(&Event::temperature(TARGET, reading(20.0, 0))),
            None
        );
        assert_eq!(
            skipped_event_type(&Event::labels_changed(TARGET, LabelDelta::default())),
            None
        );
    }

    #[test]
    fn added_label_requests_spawn_even_without_current_label() {
        let delta = LabelDelta {
            added: Labels::new().with("inertia-model", "0.5"),
            ..LabelDelta::default()
        };
        let decision = decide_with(
            Event::labels_changed(TARGET, delta),
            &Labels::new(),
            &[original()],
        );

        let Decision::Synchronize(sync) = decision else {
            panic!("expected synchronize, got {decision:?}");
        };
        assert_eq!(sync.reading, None);
        assert_eq!(
            sync.twin,
            TwinState::Missing {
                cleanup: vec![],
                create: RegistryCommand::Create {
                    device_type: "temperature".into(),
                    labels: Labels::new()
                        .with("name", "Room1 twin")
                        .with("original_device_id", "abc"),
                },
            }
        );
    }

    #[test]
    fn modified_label_is_acknowledged() {
        let delta = LabelDelta {
            modified: Labels::new().with("inertia-model", "0.9"),
            ..LabelDelta::default()
        };
        let decision = decide_with(Event::labels_changed(TARGET, delta), &emulated(), &[]);
        assert_eq!(decision, Decision::CoefficientModified);
    }

    #[test]
    fn removed_label_cleans_up_bound_twins() {
        let delta = LabelDelta {
            removed: vec!["inertia-model".into()],
            ..LabelDelta::default()
        };
        let roster = vec![original(), twin("emu123", "Room1 twin")];
        let decision = decide_with(Event::labels_changed(TARGET, delta), &Labels::new(), &roster);

        assert_eq!(
            decision,
            Decision::EmulationRemoved {
                cleanup: vec![RegistryCommand::Delete { device: id("emu123") }]
            }
        );
    }

    #[test]
    fn missing_label_deactivates() {
        let roster = vec![original(), twin("emu1", "a"), twin("emu2", "b")];
        let decision = decide_with(
            Event::temperature(TARGET, reading(20.0, 0)),
            &Labels::new(),
            &roster,
        );

        let Decision::Deactivate { cleanup } = decision else {
            panic!("expected deactivate");
        };
        assert_eq!(cleanup.len(), 2);
        assert!(cleanup
            .iter()
            .all(|c| c.disposition() == Disposition::BestEffort));
    }

    #[test]
    fn unrelated_label_change_falls_through_to_presence_check() {
        let delta = LabelDelta {
            added: Labels::new().with("floor", "2"),
            ..LabelDelta::default()
        };
        let roster = vec![original(), twin("emu1", "Room1 twin")];
        let decision = decide_with(Event::labels_changed(TARGET, delta), &emulated(), &roster);

        let Decision::Synchronize(sync) = decision else {
            panic!("expected synchronize");
        };
        assert!(matches!(sync.twin, TwinState::Existing(ref t) if t.id == id("emu1")));
        assert_eq!(sync.reading, None);
    }

    #[test]
    fn missing_original_is_an_input_error() {
        let event = Event::temperature(TARGET, reading(20.0, 0));
        let result = decide(
            &event,
            &target(),
            &emulated(),
            &[],
            &ReconcilerConfig::default(),
        );
        assert!(matches!(
            result,
            Err(ReconcileError::OriginalDeviceNotFound { .. })
        ));
    }

    #[test]
    fn temperature_event_carries_reading() {
        let roster = vec![original(), twin("emu1", "Room1 twin")];
        let decision = decide_with(
            Event::temperature(TARGET, reading(21.5, 1000)),
            &emulated(),
            &roster,
        );
        let Decision::Synchronize(sync) = decision else {
            panic!("expected synchronize");
        };
        assert_eq!(sync.reading, Some(reading(21.5, 1000)));
    }

    #[test]
    fn rename_only_when_name_diverges() {
        let config = ReconcilerConfig::default();
        assert_eq!(
            rename_command(&twin("emu1", "Room1 twin"), &original(), &config),
            None
        );
        assert_eq!(
            rename_command(&twin("emu1", "Kitchen twin"), &original(), &config),
            Some(RegistryCommand::Rename {
                device: id("emu1"),
                label: "name".into(),
                name: "Room1 twin".into(),
            })
        );
    }

    #[test]
    fn model_update_initialises_from_reading() {
        let config = ReconcilerConfig::default();
        let update = model_update(
            &twin("emu1", "Room1 twin"),
            reading(21.5, 1000),
            &emulated(),
            &config,
        );
        assert_eq!(
            update,
            ModelUpdate::Publish {
                value: 21.5,
                command: RegistryCommand::Publish {
                    device: id("emu1"),
                    payload: PublishPayload::temperature(21.5),
                },
            }
        );
    }

    #[test]
    fn model_update_advances_previous_report() {
        let config = ReconcilerConfig::default();
        let twin = twin("emu1", "Room1 twin").with_reported_temperature(reading(20.0, 0));
        let update = model_update(&twin, reading(30.0, 60), &emulated(), &config);

        let ModelUpdate::Publish { value, .. } = update else {
            panic!("expected publish");
        };
        assert!((value - 25.0).abs() < 1e-12);
    }

    #[test]
    fn model_update_skips_non_numeric_coefficient() {
        let config = ReconcilerConfig::default();
        let labels = Labels::new().with("inertia-model", "fast");
        let update = model_update(&twin("emu1", "x"), reading(1.0, 0), &labels, &config);
        assert_eq!(update, ModelUpdate::NonNumericCoefficient);
    }

    #[test]
    fn model_update_skips_non_finite_coefficient() {
        let config = ReconcilerConfig::default();
        let twin = twin("emu1", "x").with_reported_temperature(reading(20.0, 0));
        for raw in ["NaN", "inf"] {
            let labels = Labels::new().with("inertia-model", raw);
            let update = model_update(&twin, reading(30.0, 60), &labels, &config);
            assert_eq!(update, ModelUpdate::NonNumericCoefficient);
        }
    }

    #[test]
    fn commands_serialize_with_tag() {
        let json = serde_json::to_value(RegistryCommand::Delete { device: id("emu1") }).unwrap();
        assert_eq!(json, serde_json::json!({"command": "delete", "device": "emu1"}));
    }
}
