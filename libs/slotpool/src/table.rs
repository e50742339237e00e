//! Assignment table abstraction.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TableError;
use crate::types::{Endpoint, SlotNumber, SlotRecord, SlotState};

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The slot matched the expected state and now holds the endpoint.
    Claimed,
    /// The slot changed since it was read; nothing was written.
    ConditionFailed,
}

/// Durable slot-number to endpoint mapping shared by all invocations.
///
/// Implementations must make `conditional_put` atomic per slot: when two
/// callers race with the same expected state, at most one gets
/// [`PutOutcome::Claimed`].
#[async_trait]
pub trait SlotTable: Send + Sync {
    /// Read one slot. `None` means the row has never been written.
    async fn get(&self, slot: SlotNumber) -> Result<Option<SlotRecord>, TableError>;

    /// Write `endpoint` into `slot` only if the slot is still in `expected`.
    ///
    /// [`SlotState::Free`] matches a missing row as well as every free
    /// encoding of the endpoint column.
    async fn conditional_put(
        &self,
        slot: SlotNumber,
        endpoint: &Endpoint,
        expected: &SlotState,
    ) -> Result<PutOutcome, TableError>;

    /// Cheap reachability probe for readiness checks.
    async fn ping(&self) -> Result<(), TableError> {
        Ok(())
    }
}

#[async_trait]
impl<T: SlotTable + ?Sized> SlotTable for Arc<T> {
    async fn get(&self, slot: SlotNumber) -> Result<Option<SlotRecord>, TableError> {
        (**self).get(slot).await
    }

    async fn conditional_put(
        &self,
        slot: SlotNumber,
        endpoint: &Endpoint,
        expected: &SlotState,
    ) -> Result<PutOutcome, TableError> {
        (**self).conditional_put(slot, endpoint, expected).await
    }

    async fn ping(&self) -> Result<(), TableError> {
        (**self).ping().await
    }
}
