//! Error types for slot allocation.

use thiserror::Error;

/// Reasons an endpoint string is rejected before touching the table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EndpointError {
    /// The request carried no endpoint at all.
    #[error("endpoint is missing")]
    Missing,

    /// The endpoint is the empty string.
    #[error("endpoint cannot be empty")]
    Empty,

    /// The endpoint is one of the placeholder encodings that mean "free".
    #[error("endpoint '{0}' is reserved as an unassigned marker")]
    Reserved(String),

    /// The endpoint field is present but not a string.
    #[error("endpoint must be a string, got {0}")]
    NotAString(String),
}

/// Invalid pool or slot parameters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlotError {
    /// Slot numbers start at 1.
    #[error("slot number must be at least 1, got {0}")]
    InvalidSlot(u32),

    /// A pool needs at least one slot.
    #[error("pool size must be at least 1")]
    EmptyPool,
}

/// Failures reported by an assignment table backend.
///
/// A lost compare-and-swap is *not* an error; see
/// [`PutOutcome::ConditionFailed`](crate::PutOutcome::ConditionFailed).
#[derive(Debug, Error)]
pub enum TableError {
    /// The backend could not be reached or rejected the operation.
    #[error("assignment table backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl TableError {
    /// Wrap a backend-specific error.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TableError::Backend(Box::new(err))
    }
}
