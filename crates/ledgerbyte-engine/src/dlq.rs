//! Rejected-record persistence helpers used by the orchestrator.

use chrono::Utc;
use ledgerbyte_state::StateBackend;
use ledgerbyte_types::record::RejectedRecord;
use ledgerbyte_types::state::{DeadLetterRecord, PipelineId};

/// Convert gate rejections into dead-letter rows stamped with the current time.
pub(crate) fn dead_letter_records(rejected: &[RejectedRecord]) -> Vec<DeadLetterRecord> {
    let failed_at = Utc::now().to_rfc3339();
    rejected
        .iter()
        .map(|r| DeadLetterRecord {
            order_id: r.order_id(),
            record_json: serde_json::to_string(&r.record).unwrap_or_else(|e| {
                tracing::warn!(order_id = r.order_id(), error = %e, "Failed to serialize rejected record");
                "{}".to_string()
            }),
            reason: r.reason(),
            failed_at: failed_at.clone(),
        })
        .collect()
}

/// Persist rejected records to the state backend.
///
/// Failure is logged and reported as zero persisted rows; it never fails
/// the run.
pub(crate) fn persist_rejected_records(
    state_backend: &dyn StateBackend,
    pipeline: &PipelineId,
    run_id: i64,
    records: &[DeadLetterRecord],
) -> u64 {
    if records.is_empty() {
        return 0;
    }

    let rejected_count = records.len();

    match state_backend.insert_rejected_records(pipeline, run_id, records) {
        Ok(inserted) => {
            tracing::info!(
                pipeline = pipeline.as_str(),
                run_id,
                rejected_records = inserted,
                "Persisted rejected records to state backend"
            );
            inserted
        }
        Err(e) => {
            tracing::error!(
                pipeline = pipeline.as_str(),
                run_id,
                rejected_count,
                error = %e,
                "Failed to persist rejected records"
            );
            0
        }
    }
}
