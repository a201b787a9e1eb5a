//! Executes reconciliation decisions against a [`DeviceRegistry`].
//!
//! The executor owns sequencing only: it fetches the roster, asks
//! [`twin::plan`] what the event requires, issues the resulting commands and
//! feeds the outcome of fatal steps back into the next decision. Fatal steps
//! (create, publish) abort the invocation on failure; best-effort steps
//! (delete, rename) are logged and the invocation continues.

use tracing::{debug, info, instrument, warn};
use twin::plan::{self, Decision, ModelUpdate, Synchronize, TwinState};
use twin::{
    Device, DeviceRegistry, Disposition, Event, Labels, ProjectId, ReconcileError,
    ReconcilerConfig, RegistryCommand, RegistryError, Status, Target,
};

use crate::journal::{Journal, Reconciliation};

/// Reported when a label change or reading was reconciled with a twin.
pub const MSG_OK: &str = "OK";
/// Reported when the emulation coefficient changed.
pub const MSG_MODIFIED: &str = "-- Modified emulation label.";
/// Reported when the emulation label was removed.
pub const MSG_REMOVED: &str = "-- Removed emulation label.";
/// Reported when the source device has no emulation label.
pub const MSG_NO_EMULATION: &str = "no emulation label";
/// Reported when the coefficient is missing or not a number.
pub const MSG_NON_FLOAT: &str = "-- non-float coefficient, skipping...";

fn skipped(event_type: &str) -> Status {
    Status::ok(format!("skipped event type {event_type}"))
}

/// Reconciles one event at a time against a registry.
///
/// Holds no state between invocations; the registry is the system of record.
pub struct Reconciler<'a, R: ?Sized> {
    registry: &'a R,
    config: &'a ReconcilerConfig,
}

impl<'a, R> Reconciler<'a, R>
where
    R: DeviceRegistry + ?Sized,
{
    pub fn new(registry: &'a R, config: &'a ReconcilerConfig) -> Self {
        Self { registry, config }
    }

    /// Reconciles `event` given the source device's current `labels`.
    ///
    /// Never fails: errors become a non-`200` [`Status`] in the returned
    /// [`Reconciliation`], alongside the steps that ran before the failure.
    #[instrument(
        name = "reconcile",
        skip_all,
        fields(event_type = %event.event_type(), target = %event.target_name)
    )]
    pub async fn reconcile(&self, event: &Event, labels: &Labels) -> Reconciliation {
        let mut journal = Journal::default();
        let status = match self.run(event, labels, &mut journal).await {
            Ok(status) => status,
            Err(err) => {
                warn!(error = %err, status = err.status_code(), "reconciliation aborted");
                err.to_status()
            }
        };

        journal.finish(status)
    }

    async fn run(
        &self,
        event: &Event,
        labels: &Labels,
        journal: &mut Journal,
    ) -> Result<Status, ReconcileError> {
        // Filter before touching the registry.
        if let Some(event_type) = plan::skipped_event_type(event) {
            debug!("skipping unhandled event type");
            return Ok(skipped(event_type));
        }

        let target = event.target().ok_or_else(|| ReconcileError::InvalidTarget {
            target_name: event.target_name.clone(),
        })?;

        let roster = self
            .registry
            .list_devices(&target.project)
            .await
            .map_err(|source| ReconcileError::ListDevices { source })?;
        debug!(devices = roster.len(), "fetched device roster");

        match plan::decide(event, &target, labels, &roster, self.config)? {
            Decision::CoefficientModified => {
                info!("emulation coefficient modified");
                Ok(Status::ok(MSG_MODIFIED))
            }
            Decision::EmulationRemoved { cleanup } => {
                info!("emulation label removed");
                self.run_best_effort(&target.project, cleanup, journal).await;
                Ok(Status::ok(MSG_REMOVED))
            }
            Decision::Deactivate { cleanup } => {
                self.run_best_effort(&target.project, cleanup, journal).await;
                Ok(Status::ok(MSG_NO_EMULATION))
            }
            Decision::Synchronize(sync) => self.synchronize(&target, sync, labels, journal).await,
        }
    }

    async fn synchronize(
        &self,
        target: &Target,
        sync: Synchronize,
        labels: &Labels,
        journal: &mut Journal,
    ) -> Result<Status, ReconcileError> {
        let project = &target.project;
        let Synchronize {
            original,
            twin,
            reading,
        } = sync;

        let twin = match twin {
            TwinState::Existing(twin) => {
                debug!(twin = %twin.id, "located twin");
                twin
            }
            TwinState::Missing { cleanup, create } => {
                self.run_best_effort(project, cleanup, journal).await;
                self.spawn(project, &original, create, journal).await?
            }
        };
        journal.twin = Some(twin.id.clone());

        if let Some(rename) = plan::rename_command(&twin, &original, self.config) {
            self.step(project, rename, journal).await.ok();
        }
        info!(twin = %twin.id, "synchronized with twin");

        let Some(reading) = reading else {
            return Ok(Status::ok(MSG_OK));
        };

        match plan::model_update(&twin, reading, labels, self.config) {
            ModelUpdate::NonNumericCoefficient => {
                info!(twin = %twin.id, "non-numeric emulation coefficient, model update skipped");
                Ok(Status::ok(MSG_NON_FLOAT))
            }
            ModelUpdate::Publish { value, command } => {
                self.step(project, command, journal)
                    .await
                    .map_err(|source| ReconcileError::Publish {
                        twin: twin.id.clone(),
                        source,
                    })?;
                info!(twin = %twin.id, value, "published modelled temperature");
                Ok(Status::ok(MSG_OK))
            }
        }
    }

    async fn spawn(
        &self,
        project: &ProjectId,
        original: &Device,
        create: RegistryCommand,
        journal: &mut Journal,
    ) -> Result<Device, ReconcileError> {
        let spawn_error = |source: RegistryError| ReconcileError::Spawn {
            original: original.id.clone(),
            source,
        };

        match self.step(project, create, journal).await {
            Ok(Some(twin)) => {
                info!(twin = %twin.id, original = %original.id, "spawned twin");
                Ok(twin)
            }
            Ok(None) => Err(spawn_error(RegistryError::Decode(
                "create returned no device".to_string(),
            ))),
            Err(source) => Err(spawn_error(source)),
        }
    }

    /// Runs every command; failures are journaled and logged, never returned.
    async fn run_best_effort(
        &self,
        project: &ProjectId,
        commands: Vec<RegistryCommand>,
        journal: &mut Journal,
    ) {
        for command in commands {
            self.step(project, command, journal).await.ok();
        }
    }

    /// Executes one command and journals its outcome.
    async fn step(
        &self,
        project: &ProjectId,
        command: RegistryCommand,
        journal: &mut Journal,
    ) -> Result<Option<Device>, RegistryError> {
        let result = self.execute(project, &command).await;

        match (&result, command.disposition()) {
            (Ok(_), _) => debug!(command = command.name(), device = ?command.device(), "step succeeded"),
            (Err(err), Disposition::BestEffort) => {
                warn!(command = command.name(), device = ?command.device(), error = %err, "best-effort step failed")
            }
            (Err(err), Disposition::Fatal) => {
                warn!(command = command.name(), device = ?command.device(), error = %err, "required step failed")
            }
        }

        journal.record(command, &result);
        result
    }

    async fn execute(
        &self,
        project: &ProjectId,
        command: &RegistryCommand,
    ) -> Result<Option<Device>, RegistryError> {
        match command {
            RegistryCommand::Create {
                device_type,
                labels,
            } => self
                .registry
                .create_device(project, device_type, labels)
                .await
                .map(Some),
            RegistryCommand::Delete { device } => self
                .registry
                .delete_device(project, device)
                .await
                .map(|()| None),
            RegistryCommand::Rename {
                device,
                label,
                name,
            } => self
                .registry
                .patch_label(project, device, label, name)
                .await
                .map(|()| None),
            RegistryCommand::Publish { device, payload } => self
                .registry
                .publish_reading(project, device, payload)
                .await
                .map(|()| None),
        }
    }
}
