//! Pipeline state persistence for Ledgerbyte.
//!
//! Provides the [`StateBackend`] trait and a [`SqliteStateBackend`]
//! implementation for run history and rejected-record (dead-letter)
//! storage.

#![warn(clippy::pedantic)]

pub mod backend;
pub mod error;
pub mod sqlite;

pub use backend::StateBackend;
pub use error::StateError;
pub use sqlite::SqliteStateBackend;
