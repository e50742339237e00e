//! # slotpool
//!
//! Assigns endpoints (public IP addresses) to numbered slots in a fixed-size
//! pool backed by a shared assignment table.
//!
//! ## Model
//!
//! - Slots are numbered `1..=N`; `N` is fixed per deployment.
//! - A slot is free when it has no endpoint. Upstream producers encode "no
//!   endpoint" four different ways (missing row or field, `""`, `"null"`,
//!   null); [`normalize_endpoint`] folds all of them into `None` at the
//!   storage boundary.
//! - Claims go through [`SlotTable::conditional_put`], a per-slot
//!   compare-and-swap. A lost race is not an error: the allocator moves on to
//!   the next candidate.
//!
//! The [`Allocator`] returns a typed [`AssignmentOutcome`]; mapping that
//! outcome to an operator notification is a separate, pure step
//! ([`Reporter`]).

mod allocator;
mod error;
mod memory;
mod report;
mod table;
mod types;

pub use allocator::Allocator;
pub use error::{EndpointError, SlotError, TableError};
pub use memory::MemorySlotTable;
pub use report::{Notification, Reporter, Severity, DEFAULT_HOST_TEMPLATE};
pub use table::{PutOutcome, SlotTable};
pub use types::{
    normalize_endpoint, AssignmentOutcome, Endpoint, InvocationResult, SlotNumber, SlotRecord,
    SlotState, BAD_EVENT_MARKER, NO_ASSIGNMENT_MARKER,
};
