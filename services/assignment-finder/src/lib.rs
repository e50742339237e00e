//! Assignment finder service library.
//!
//! The `assignment-finder` binary is a thin CLI over this crate; the library
//! surface exists so the transport and handler can be tested in-process.

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod invoke;
pub mod notify;
pub mod secrets;
pub mod state;
