//! Slot, endpoint, and outcome types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EndpointError, SlotError};

/// Literal returned to the caller when the event carries no usable endpoint.
pub const BAD_EVENT_MARKER: &str = "ERROR BAD EVENT";

/// Literal returned to the caller when every slot is taken.
pub const NO_ASSIGNMENT_MARKER: &str = "ERROR NO ASSIGNMENT FOUND";

/// Placeholder upstream producers write instead of a real null.
const NULL_LITERAL: &str = "null";

// =============================================================================
// Slot numbers
// =============================================================================

/// A position in the pool, counted from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SlotNumber(u32);

impl SlotNumber {
    /// Create a slot number, rejecting 0.
    pub fn new(value: u32) -> Result<Self, SlotError> {
        if value == 0 {
            return Err(SlotError::InvalidSlot(value));
        }
        Ok(Self(value))
    }

    /// The first slot of every pool.
    pub const fn first() -> Self {
        Self(1)
    }

    /// Iterate `1..=pool_size` in ascending (priority) order.
    pub fn range(pool_size: u32) -> impl Iterator<Item = SlotNumber> {
        (1..=pool_size).map(SlotNumber)
    }

    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SlotNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for SlotNumber {
    type Error = SlotError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SlotNumber> for u32 {
    fn from(slot: SlotNumber) -> Self {
        slot.0
    }
}

// =============================================================================
// Endpoints
// =============================================================================

/// An assigned endpoint value (the requester's public IP).
///
/// Never empty and never the `"null"` placeholder, so a stored `Endpoint`
/// can't be mistaken for a free slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint(String);

impl Endpoint {
    /// Validate a requested endpoint.
    pub fn parse(raw: &str) -> Result<Self, EndpointError> {
        if raw.is_empty() {
            return Err(EndpointError::Empty);
        }
        if raw == NULL_LITERAL {
            return Err(EndpointError::Reserved(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Endpoint {
    type Error = EndpointError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.0
    }
}

/// Fold the upstream "unassigned" encodings into `None`.
///
/// `None` (absent field or null), `""` and `"null"` all mean free.
pub fn normalize_endpoint(raw: Option<&str>) -> Option<Endpoint> {
    raw.and_then(|value| Endpoint::parse(value).ok())
}

// =============================================================================
// Table rows
// =============================================================================

/// A slot row as read from the assignment table, already normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRecord {
    pub slot: SlotNumber,
    pub endpoint: Option<Endpoint>,
}

impl SlotRecord {
    /// Build a record from a raw stored value.
    pub fn from_raw(slot: SlotNumber, raw: Option<&str>) -> Self {
        Self {
            slot,
            endpoint: normalize_endpoint(raw),
        }
    }
}

/// Observed state of one slot; also the expected prior state of a
/// conditional write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState {
    /// No row, or a row without an endpoint.
    Free,
    /// Held by an endpoint.
    Assigned(Endpoint),
}

impl SlotState {
    pub fn is_free(&self) -> bool {
        matches!(self, SlotState::Free)
    }
}

impl From<Option<SlotRecord>> for SlotState {
    fn from(record: Option<SlotRecord>) -> Self {
        match record.and_then(|r| r.endpoint) {
            Some(endpoint) => SlotState::Assigned(endpoint),
            None => SlotState::Free,
        }
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// Result of one allocation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentOutcome {
    /// The endpoint now holds `slot`.
    Assigned { slot: SlotNumber, endpoint: Endpoint },
    /// The request had no usable endpoint; the table was not touched.
    BadRequest { reason: EndpointError },
    /// Every slot in the pool is held.
    PoolExhausted { endpoint: Endpoint },
}

impl AssignmentOutcome {
    /// The claimed slot, if any.
    pub fn slot(&self) -> Option<SlotNumber> {
        match self {
            AssignmentOutcome::Assigned { slot, .. } => Some(*slot),
            _ => None,
        }
    }

    /// Value handed back to the invoker.
    pub fn result(&self) -> InvocationResult {
        match self {
            AssignmentOutcome::Assigned { slot, .. } => InvocationResult::Slot(*slot),
            AssignmentOutcome::BadRequest { .. } => InvocationResult::Failed(BAD_EVENT_MARKER),
            AssignmentOutcome::PoolExhausted { .. } => {
                InvocationResult::Failed(NO_ASSIGNMENT_MARKER)
            }
        }
    }
}

/// Wire form of an outcome: a bare slot number or a failure literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum InvocationResult {
    Slot(SlotNumber),
    Failed(&'static str),
}

impl fmt::Display for InvocationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationResult::Slot(slot) => write!(f, "{slot}"),
            InvocationResult::Failed(marker) => f.write_str(marker),
        }
    }
}
