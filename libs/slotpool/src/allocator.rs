//! First-free slot allocator.

use tracing::{debug, info};

use crate::error::{SlotError, TableError};
use crate::table::{PutOutcome, SlotTable};
use crate::types::{AssignmentOutcome, Endpoint, SlotNumber, SlotState};

/// Scans a fixed pool in ascending order and claims the first free slot.
///
/// Stateless between calls; all coordination happens through the table's
/// conditional write, so any number of allocators may share one table.
#[derive(Debug)]
pub struct Allocator<T> {
    table: T,
    pool_size: u32,
}

impl<T: SlotTable> Allocator<T> {
    /// Create an allocator over slots `1..=pool_size`.
    pub fn new(table: T, pool_size: u32) -> Result<Self, SlotError> {
        if pool_size == 0 {
            return Err(SlotError::EmptyPool);
        }
        Ok(Self { table, pool_size })
    }

    pub fn pool_size(&self) -> u32 {
        self.pool_size
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    /// Validate `endpoint` and place it in the lowest free slot.
    ///
    /// An empty or placeholder endpoint yields
    /// [`AssignmentOutcome::BadRequest`] without touching the table.
    ///
    /// # Errors
    ///
    /// Backend failures while reading or writing propagate unchanged. Losing
    /// a race for a slot is not an error.
    pub async fn allocate(&self, endpoint: &str) -> Result<AssignmentOutcome, TableError> {
        let endpoint = match Endpoint::parse(endpoint) {
            Ok(endpoint) => endpoint,
            Err(reason) => return Ok(AssignmentOutcome::BadRequest { reason }),
        };

        match self.claim(&endpoint).await? {
            Some(slot) => Ok(AssignmentOutcome::Assigned { slot, endpoint }),
            None => Ok(AssignmentOutcome::PoolExhausted { endpoint }),
        }
    }

    /// Claim the first free slot for an already-validated endpoint.
    ///
    /// Returns `None` when the full scan finds nothing claimable.
    pub async fn claim(&self, endpoint: &Endpoint) -> Result<Option<SlotNumber>, TableError> {
        for slot in SlotNumber::range(self.pool_size) {
            let state = SlotState::from(self.table.get(slot).await?);

            if let SlotState::Assigned(holder) = &state {
                debug!(slot = %slot, holder = %holder, "Slot occupied");
                continue;
            }

            match self.table.conditional_put(slot, endpoint, &state).await? {
                PutOutcome::Claimed => {
                    info!(slot = %slot, endpoint = %endpoint, "Claimed slot");
                    return Ok(Some(slot));
                }
                PutOutcome::ConditionFailed => {
                    debug!(slot = %slot, endpoint = %endpoint, "Lost race for slot, continuing scan");
                }
            }
        }

        info!(
            endpoint = %endpoint,
            pool_size = self.pool_size,
            "No free slot in pool"
        );
        Ok(None)
    }
}
