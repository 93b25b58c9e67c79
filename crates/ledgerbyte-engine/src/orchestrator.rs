//! Pipeline orchestrator: extract, transform, persist rejections, load.

use std::sync::Arc;
use std::time::Instant;

use ledgerbyte_state::{SqliteStateBackend, StateBackend};
use ledgerbyte_types::arrow::accepted_to_batch;
use ledgerbyte_types::state::{PipelineId, RunStats, RunStatus};

use crate::collaborator::{Extractor, Loader};
use crate::config::types::{EmptyOutputPolicy, PipelineConfig, StateBackendKind, StateConfig};
use crate::diagnostics::TracingSink;
use crate::errors::PipelineError;
use crate::result::{DryRunResult, ExecutionOptions, PipelineOutcome, PipelineResult};
use crate::transform::clean_and_transform;

/// Open the state backend named by the pipeline config.
///
/// # Errors
///
/// Returns [`PipelineError::State`] if the `SQLite` database cannot be
/// opened or initialized.
pub fn create_state_backend(
    config: &StateConfig,
) -> Result<Option<Arc<dyn StateBackend>>, PipelineError> {
    match config.backend {
        StateBackendKind::None => Ok(None),
        StateBackendKind::Sqlite => {
            let path = config.resolved_path();
            let backend = SqliteStateBackend::open(&path)?;
            tracing::debug!(path = %path.display(), "Opened SQLite state backend");
            Ok(Some(Arc::new(backend)))
        }
    }
}

/// Run one pipeline end to end.
///
/// With a state backend and outside dry-run mode, the run is recorded and
/// marked failed when any stage errors.
///
/// # Errors
///
/// Returns a [`PipelineError`] for structural input problems, collaborator
/// failures, or an empty output under [`EmptyOutputPolicy::Fail`].
pub async fn run_pipeline<E, L>(
    config: &PipelineConfig,
    extractor: &E,
    loader: &mut L,
    state: Option<Arc<dyn StateBackend>>,
    options: &ExecutionOptions,
) -> Result<PipelineOutcome, PipelineError>
where
    E: Extractor,
    L: Loader,
{
    let pipeline_id = PipelineId::new(config.pipeline.clone());
    tracing::info!(
        pipeline = config.pipeline,
        dry_run = options.dry_run,
        "Starting pipeline run"
    );

    // Dry runs are not tracked to avoid orphaned run records.
    let tracked = match state {
        Some(state) if !options.dry_run => {
            let state_for_run = state.clone();
            let pipeline_id_for_run = pipeline_id.clone();
            let run_id =
                tokio::task::spawn_blocking(move || state_for_run.start_run(&pipeline_id_for_run))
                    .await
                    .map_err(|e| {
                        PipelineError::Infrastructure(anyhow::anyhow!(
                            "start_run task panicked: {e}"
                        ))
                    })??;
            Some((state, run_id))
        }
        _ => None,
    };

    let mut stats = RunStats::default();
    let result = execute_pipeline(
        config,
        &pipeline_id,
        extractor,
        loader,
        tracked.as_ref(),
        options,
        &mut stats,
    )
    .await;

    match result {
        Ok(outcome) => {
            if let Some((state, run_id)) = tracked {
                complete_run(state, run_id, RunStatus::Completed, stats).await?;
            }
            Ok(outcome)
        }
        Err(err) => {
            tracing::error!(
                pipeline = config.pipeline,
                structural = err.is_structural(),
                "Pipeline run failed: {}",
                err
            );
            if let Some((state, run_id)) = tracked {
                stats.error_message = Some(err.to_string());
                if let Err(state_err) = complete_run(state, run_id, RunStatus::Failed, stats).await {
                    tracing::error!(
                        run_id,
                        error = %state_err,
                        "Failed to record failed run"
                    );
                }
            }
            Err(err)
        }
    }
}

async fn execute_pipeline<E, L>(
    config: &PipelineConfig,
    pipeline_id: &PipelineId,
    extractor: &E,
    loader: &mut L,
    tracked: Option<&(Arc<dyn StateBackend>, i64)>,
    options: &ExecutionOptions,
    stats: &mut RunStats,
) -> Result<PipelineOutcome, PipelineError>
where
    E: Extractor,
    L: Loader,
{
    let start = Instant::now();

    let limit = if options.dry_run { options.limit } else { None };
    let tables = extractor
        .extract(limit)
        .await
        .map_err(PipelineError::from_extract)?;
    stats.orders_read = tables.orders.len() as u64;
    tracing::info!(
        pipeline = config.pipeline,
        orders = tables.orders.len(),
        customers = tables.customers.len(),
        "Extracted raw tables"
    );

    let transform_options = config.transform.options();
    let sink_pipeline = config.pipeline.clone();
    let output = tokio::task::spawn_blocking(move || {
        let mut sink = TracingSink::new(sink_pipeline);
        clean_and_transform(tables, &transform_options, &mut sink)
    })
    .await
    .map_err(|e| PipelineError::Infrastructure(anyhow::anyhow!("transform task panicked: {e}")))??;

    let report = output.report;
    stats.duplicates_removed = report.duplicates_removed as u64;
    stats.records_accepted = report.accepted as u64;
    stats.records_rejected = report.rejected as u64;

    let rejections_persisted = match tracked {
        Some((state, run_id)) if !output.rejected.is_empty() => {
            let state_for_dlq = state.clone();
            let pipeline_id_for_dlq = pipeline_id.clone();
            let run_id = *run_id;
            let records = crate::dlq::dead_letter_records(&output.rejected);
            tokio::task::spawn_blocking(move || {
                crate::dlq::persist_rejected_records(
                    state_for_dlq.as_ref(),
                    &pipeline_id_for_dlq,
                    run_id,
                    &records,
                )
            })
            .await
            .map_err(|e| {
                PipelineError::Infrastructure(anyhow::anyhow!(
                    "persist_rejected_records task panicked: {e}"
                ))
            })?
        }
        _ => 0,
    };

    if output.accepted.is_empty() {
        match config.transform.on_empty_output {
            EmptyOutputPolicy::Fail => {
                return Err(PipelineError::EmptyOutput {
                    rejected: report.rejected,
                });
            }
            EmptyOutputPolicy::Warn => tracing::warn!(
                pipeline = config.pipeline,
                rejected = report.rejected,
                "No records passed validation; the analytics table will be empty"
            ),
        }
    }

    let batch = accepted_to_batch(&output.accepted).map_err(|e| {
        PipelineError::Infrastructure(anyhow::anyhow!("Failed to encode accepted records: {e}"))
    })?;

    if options.dry_run {
        return Ok(PipelineOutcome::DryRun(DryRunResult {
            pipeline: config.pipeline.clone(),
            report,
            batch,
            rejected_records: output.rejected,
            duration_secs: start.elapsed().as_secs_f64(),
        }));
    }

    let records_loaded = loader.load(&batch).await.map_err(PipelineError::Load)?;
    stats.records_loaded = records_loaded;

    let duration = start.elapsed();
    tracing::info!(
        pipeline = config.pipeline,
        orders_read = report.input_orders,
        duplicates_removed = report.duplicates_removed,
        accepted = report.accepted,
        rejected = report.rejected,
        records_loaded,
        duration_secs = duration.as_secs_f64(),
        "Pipeline run completed"
    );

    Ok(PipelineOutcome::Run(PipelineResult {
        pipeline: config.pipeline.clone(),
        run_id: tracked.map(|(_, run_id)| *run_id),
        report,
        records_loaded,
        rejections_persisted,
        rejected_records: output.rejected,
        duration_secs: duration.as_secs_f64(),
    }))
}

async fn complete_run(
    state: Arc<dyn StateBackend>,
    run_id: i64,
    status: RunStatus,
    stats: RunStats,
) -> Result<(), PipelineError> {
    tokio::task::spawn_blocking(move || state.complete_run(run_id, status, &stats))
        .await
        .map_err(|e| {
            PipelineError::Infrastructure(anyhow::anyhow!("complete_run task panicked: {e}"))
        })??;
    Ok(())
}
