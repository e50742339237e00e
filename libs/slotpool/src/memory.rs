//! In-memory assignment table.
//!
//! Keeps raw stored values (including the `""` / `"null"` placeholders) so
//! callers can reproduce upstream data exactly. Used by tests and by the
//! finder's `memory` store mode.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::TableError;
use crate::table::{PutOutcome, SlotTable};
use crate::types::{normalize_endpoint, Endpoint, SlotNumber, SlotRecord, SlotState};

/// Raw column value; `None` is a row whose endpoint is null.
type RawEndpoint = Option<String>;

#[derive(Debug, Default)]
pub struct MemorySlotTable {
    rows: Mutex<BTreeMap<SlotNumber, RawEndpoint>>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MemorySlotTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw value for a slot, bypassing the compare-and-swap.
    pub fn seed_raw(&self, slot: SlotNumber, raw: Option<&str>) {
        self.rows().insert(slot, raw.map(str::to_string));
    }

    /// Occupy a slot as an external writer would.
    pub fn occupy(&self, slot: SlotNumber, endpoint: &Endpoint) {
        self.seed_raw(slot, Some(endpoint.as_str()));
    }

    /// Normalized view of every row that exists.
    pub fn snapshot(&self) -> BTreeMap<SlotNumber, Option<Endpoint>> {
        self.rows()
            .iter()
            .map(|(slot, raw)| (*slot, normalize_endpoint(raw.as_deref())))
            .collect()
    }

    /// Number of `get` calls served.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of conditional writes attempted, committed or not.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    fn rows(&self) -> MutexGuard<'_, BTreeMap<SlotNumber, RawEndpoint>> {
        // A panic while holding the lock cannot leave a half-written row.
        self.rows.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SlotTable for MemorySlotTable {
    async fn get(&self, slot: SlotNumber) -> Result<Option<SlotRecord>, TableError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .rows()
            .get(&slot)
            .map(|raw| SlotRecord::from_raw(slot, raw.as_deref())))
    }

    async fn conditional_put(
        &self,
        slot: SlotNumber,
        endpoint: &Endpoint,
        expected: &SlotState,
    ) -> Result<PutOutcome, TableError> {
        self.writes.fetch_add(1, Ordering::Relaxed);

        let mut rows = self.rows();
        let current = SlotState::from(
            rows.get(&slot)
                .map(|raw| SlotRecord::from_raw(slot, raw.as_deref())),
        );
        if &current != expected {
            return Ok(PutOutcome::ConditionFailed);
        }

        rows.insert(slot, Some(endpoint.as_str().to_string()));
        Ok(PutOutcome::Claimed)
    }
}
