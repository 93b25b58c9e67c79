//! PostgreSQL collaborators for Ledgerbyte pipelines.
//!
//! [`PostgresExtractor`] reads the raw orders and customers tables,
//! [`PostgresLoader`] replaces the analytics table with each accepted batch,
//! and [`seed`] recreates the raw tables from generated data.

#![warn(clippy::pedantic)]

pub mod client;
pub mod extract;
pub mod load;
pub mod seed;
mod type_map;

pub use client::{check_connection, connect};
pub use extract::PostgresExtractor;
pub use load::PostgresLoader;
