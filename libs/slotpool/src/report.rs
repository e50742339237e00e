//! Outcome to operator-notification mapping.

use serde::Serialize;

use crate::types::{AssignmentOutcome, SlotNumber};

/// Hostname pattern for a slot; `{slot}` is replaced with the slot number.
pub const DEFAULT_HOST_TEMPLATE: &str = "su{slot}.ao-testnet.xyz";

/// Alert level attached to a notification. Operators alert on these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message for the operator channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }
}

/// Pure mapping from [`AssignmentOutcome`] to [`Notification`].
#[derive(Debug, Clone)]
pub struct Reporter {
    host_template: String,
    application_port: u16,
}

impl Reporter {
    pub fn new(host_template: impl Into<String>, application_port: u16) -> Self {
        Self {
            host_template: host_template.into(),
            application_port,
        }
    }

    /// Public address of a slot, e.g. `su2.ao-testnet.xyz:9000`.
    pub fn slot_address(&self, slot: SlotNumber) -> String {
        let host = self.host_template.replace("{slot}", &slot.to_string());
        format!("{}:{}", host, self.application_port)
    }

    /// Build the notification for an outcome. `event` is the raw invocation
    /// payload, quoted verbatim for malformed requests.
    pub fn notification(
        &self,
        outcome: &AssignmentOutcome,
        event: &serde_json::Value,
    ) -> Notification {
        match outcome {
            AssignmentOutcome::Assigned { slot, endpoint } => Notification::new(
                format!(
                    "Assignment finder: {} was assigned to {}",
                    endpoint,
                    self.slot_address(*slot)
                ),
                Severity::Ok,
            ),
            AssignmentOutcome::BadRequest { .. } => {
                let event = serde_json::to_string_pretty(event)
                    .unwrap_or_else(|_| event.to_string());
                Notification::new(
                    format!("Assignment finder event error: {event}"),
                    Severity::Warn,
                )
            }
            AssignmentOutcome::PoolExhausted { endpoint } => Notification::new(
                format!("Assignment finder: {endpoint} was unable to find available assignment"),
                Severity::Error,
            ),
        }
    }
}
