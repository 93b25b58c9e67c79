//! Execution options and pipeline run results.

use arrow::record_batch::RecordBatch;
use ledgerbyte_types::record::RejectedRecord;
use serde::Serialize;

use crate::transform::TransformReport;

/// Runtime execution options (not part of pipeline YAML config).
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    /// Skip the loader and return the accepted batch instead.
    pub dry_run: bool,
    /// Maximum orders to read (only used with `dry_run`).
    pub limit: Option<u64>,
}

/// Result of a pipeline run that reached the loader.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub pipeline: String,
    /// `None` when the state backend is disabled.
    pub run_id: Option<i64>,
    #[serde(flatten)]
    pub report: TransformReport,
    pub records_loaded: u64,
    pub rejections_persisted: u64,
    #[serde(skip)]
    pub rejected_records: Vec<RejectedRecord>,
    pub duration_secs: f64,
}

/// Result of a dry run: the batch that would have been loaded.
#[derive(Debug)]
pub struct DryRunResult {
    pub pipeline: String,
    pub report: TransformReport,
    pub batch: RecordBatch,
    pub rejected_records: Vec<RejectedRecord>,
    pub duration_secs: f64,
}

/// Either a normal pipeline result or a dry-run result.
#[derive(Debug)]
pub enum PipelineOutcome {
    Run(PipelineResult),
    DryRun(DryRunResult),
}

impl PipelineOutcome {
    #[must_use]
    pub fn report(&self) -> &TransformReport {
        match self {
            Self::Run(result) => &result.report,
            Self::DryRun(result) => &result.report,
        }
    }
}
