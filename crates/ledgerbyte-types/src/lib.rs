//! Shared Ledgerbyte record model, rule, and run-state types.
//!
//! This crate carries no I/O; it is the boundary type set shared by the
//! transform engine, the state backend, and the database collaborators.

pub mod arrow;
pub mod error;
pub mod record;
pub mod rule;
pub mod state;
