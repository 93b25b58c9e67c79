//! Core transform and orchestration crate for Ledgerbyte pipeline runs.
//!
//! The transform stage ([`transform::clean_and_transform`]) is pure and
//! synchronous. Everything that touches a database is reached through the
//! [`Extractor`] and [`Loader`] collaborator traits.

pub mod collaborator;
pub mod config;
pub mod diagnostics;
pub(crate) mod dlq;
pub mod errors;
pub mod generator;
pub mod orchestrator;
pub mod result;
pub mod transform;

// Re-export public API for convenience
pub use collaborator::{Extractor, Loader, MemoryExtractor, MemoryLoader};
pub use diagnostics::{DiagnosticEvent, DiagnosticsSink, RecordingSink, TracingSink};
pub use errors::PipelineError;
pub use orchestrator::run_pipeline;
pub use result::{DryRunResult, ExecutionOptions, PipelineOutcome, PipelineResult};
pub use transform::{clean_and_transform, TransformOptions, TransformOutput, TransformReport};
