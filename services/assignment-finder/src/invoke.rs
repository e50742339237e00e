//! One invocation: event in, slot (or failure literal) out.

use std::sync::Arc;

use serde_json::Value;
use slotpool::{
    Allocator, AssignmentOutcome, EndpointError, Reporter, SlotTable, TableError,
};
use tracing::{error, info, warn};

use crate::notify::Notifier;

/// Event field carrying the requester's endpoint.
pub const ENDPOINT_FIELD: &str = "public_ip";

/// Pull the endpoint out of an invocation event.
pub fn extract_endpoint(event: &Value) -> Result<&str, EndpointError> {
    match event.get(ENDPOINT_FIELD) {
        None | Some(Value::Null) => Err(EndpointError::Missing),
        Some(Value::String(raw)) => Ok(raw.as_str()),
        Some(other) => Err(EndpointError::NotAString(other.to_string())),
    }
}

/// Allocate, then report. Shared by every transport.
pub struct Finder {
    allocator: Allocator<Arc<dyn SlotTable>>,
    reporter: Reporter,
    notifier: Arc<dyn Notifier>,
}

impl Finder {
    pub fn new(
        allocator: Allocator<Arc<dyn SlotTable>>,
        reporter: Reporter,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            allocator,
            reporter,
            notifier,
        }
    }

    pub fn table(&self) -> &Arc<dyn SlotTable> {
        self.allocator.table()
    }

    /// Handle one invocation event.
    ///
    /// # Errors
    ///
    /// Only table backend failures; the notification for the outcome is
    /// best-effort and never fails the call.
    pub async fn handle_event(&self, event: &Value) -> Result<AssignmentOutcome, TableError> {
        let pretty = serde_json::to_string_pretty(event).unwrap_or_else(|_| event.to_string());
        info!("Received event: {pretty}");

        let outcome = match extract_endpoint(event) {
            Ok(raw) => self.allocator.allocate(raw).await?,
            Err(reason) => AssignmentOutcome::BadRequest { reason },
        };

        if let AssignmentOutcome::BadRequest { reason } = &outcome {
            warn!(reason = %reason, "No usable public IP in event, skipping");
        }

        self.report(&outcome, event).await;
        Ok(outcome)
    }

    async fn report(&self, outcome: &AssignmentOutcome, event: &Value) {
        let notification = self.reporter.notification(outcome, event);
        if let Err(e) = self.notifier.notify(&notification).await {
            error!(
                error = %e,
                severity = %notification.severity,
                "Error sending notification"
            );
        }
    }
}
