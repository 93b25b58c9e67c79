//! State backend trait definition.
//!
//! [`StateBackend`] defines the storage contract for run history and
//! rejected records. Model types live in [`ledgerbyte_types::state`].

use ledgerbyte_types::state::{DeadLetterRecord, PipelineId, RunRecord, RunStats, RunStatus};

use crate::error;

/// Storage contract for pipeline state.
///
/// Implementations must be `Send + Sync` for use behind `Arc<dyn StateBackend>`.
pub trait StateBackend: Send + Sync {
    /// Begin a new run, returning its unique ID.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn start_run(&self, pipeline: &PipelineId) -> error::Result<i64>;

    /// Finalize a run with status and aggregate stats.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn complete_run(&self, run_id: i64, status: RunStatus, stats: &RunStats) -> error::Result<()>;

    /// Persist rejected records for a run. Returns the count inserted.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn insert_rejected_records(
        &self,
        pipeline: &PipelineId,
        run_id: i64,
        records: &[DeadLetterRecord],
    ) -> error::Result<u64>;

    /// Look up a run by ID. `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn run_record(&self, run_id: i64) -> error::Result<Option<RunRecord>>;

    /// Rejected records of a run, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn rejected_records(&self, run_id: i64) -> error::Result<Vec<DeadLetterRecord>>;
}
