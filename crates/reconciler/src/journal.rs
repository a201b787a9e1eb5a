//! Step journal for one reconciliation.
//!
//! Every registry command the executor issues is recorded with its
//! disposition and outcome, so callers and tests can see exactly which steps
//! ran and which best-effort steps failed without parsing logs.

use serde::Serialize;
use twin::{DeviceId, Disposition, RegistryCommand, RegistryError, Status};

/// Result of one executed command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Succeeded,
    Failed {
        /// Status mirrored from the registry error.
        status: u16,
        error: String,
    },
}

/// One executed command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    pub command: RegistryCommand,
    pub disposition: Disposition,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

impl StepRecord {
    pub fn succeeded(&self) -> bool {
        self.outcome == StepOutcome::Succeeded
    }
}

/// The result of reconciling one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    /// `(message, status)` reported to the caller.
    pub status: Status,
    /// The twin the event was reconciled with, when one was resolved.
    pub twin: Option<DeviceId>,
    /// Every registry command issued, in order.
    pub steps: Vec<StepRecord>,
}

impl Reconciliation {
    /// Steps that failed without aborting the invocation.
    pub fn best_effort_failures(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps
            .iter()
            .filter(|s| s.disposition == Disposition::BestEffort && !s.succeeded())
    }
}

/// Accumulates step records and the resolved twin while an invocation runs.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    pub(crate) steps: Vec<StepRecord>,
    pub(crate) twin: Option<DeviceId>,
}

impl Journal {
    pub(crate) fn record<T>(&mut self, command: RegistryCommand, result: &Result<T, RegistryError>) {
        let outcome = match result {
            Ok(_) => StepOutcome::Succeeded,
            Err(err) => StepOutcome::Failed {
                status: err.status_code(),
                error: err.to_string(),
            },
        };
        self.steps.push(StepRecord {
            disposition: command.disposition(),
            command,
            outcome,
        });
    }

    pub(crate) fn finish(self, status: Status) -> Reconciliation {
        Reconciliation {
            status,
            twin: self.twin,
            steps: self.steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delete(id: &str) -> RegistryCommand {
        RegistryCommand::Delete {
            device: DeviceId::new(id).unwrap(),
        }
    }

    #[test]
    fn records_disposition_from_command() {
        let mut journal = Journal::default();
        journal.record(delete("emu1"), &Ok::<(), RegistryError>(()));
        journal.record(
            delete("emu2"),
            &Err::<(), _>(RegistryError::Status {
                code: 404,
                body: String::new(),
            }),
        );

        let reconciliation = journal.finish(Status::ok("OK"));
        assert_eq!(reconciliation.steps.len(), 2);
        assert!(reconciliation.steps[0].succeeded());

        let failures: Vec<_> = reconciliation.best_effort_failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].command, delete("emu2"));
        assert!(matches!(
            failures[0].outcome,
            StepOutcome::Failed { status: 404, .. }
        ));
    }

    #[test]
    fn step_record_serializes_flat() {
        let mut journal = Journal::default();
        journal.record(delete("emu1"), &Ok::<(), RegistryError>(()));
        let json = serde_json::to_value(&journal.steps[0]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "command": {"command": "delete", "device": "emu1"},
                "disposition": "best_effort",
                "outcome": "succeeded"
            })
        );
    }
}
