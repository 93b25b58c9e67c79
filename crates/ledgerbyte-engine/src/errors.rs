//! Pipeline error model.

use ledgerbyte_state::StateError;
use ledgerbyte_types::error::TransformError;

/// Categorized pipeline failure.
///
/// `Structural` means the extracted input violates a transform
/// precondition. `Extract` and `Load` wrap collaborator failures, which are
/// never reported as validation failures.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input shape makes any partial output meaningless.
    #[error("structural input error: {0}")]
    Structural(#[from] TransformError),

    #[error("extract failed: {0:#}")]
    Extract(anyhow::Error),

    #[error("load failed: {0:#}")]
    Load(anyhow::Error),

    #[error("state backend error: {0}")]
    State(#[from] StateError),

    /// Every record was rejected and the pipeline is configured to fail.
    #[error("no records passed validation ({rejected} rejected)")]
    EmptyOutput { rejected: usize },

    /// Host-side failure (task join, Arrow encoding, etc.).
    #[error("{0:#}")]
    Infrastructure(anyhow::Error),
}

impl From<anyhow::Error> for PipelineError {
    fn from(e: anyhow::Error) -> Self {
        Self::Infrastructure(e)
    }
}

impl PipelineError {
    /// Returns `true` when the failure comes from the input shape rather than
    /// from I/O.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Structural(_))
    }

    /// Classify an extractor failure. A [`TransformError`] raised while
    /// reading (e.g. a missing column) stays structural.
    #[must_use]
    pub fn from_extract(err: anyhow::Error) -> Self {
        match err.downcast::<TransformError>() {
            Ok(structural) => Self::Structural(structural),
            Err(other) => Self::Extract(other),
        }
    }
}
