use std::path::Path;

use anyhow::{Context, Result};
use arrow::util::pretty::pretty_format_batches;
use ledgerbyte_engine::orchestrator::{self, run_pipeline};
use ledgerbyte_engine::{
    DryRunResult, ExecutionOptions, PipelineOutcome, PipelineResult, TransformReport,
};
use ledgerbyte_postgres::{PostgresExtractor, PostgresLoader};
use ledgerbyte_types::record::RejectedRecord;

/// Rejections listed individually before the rest are summarized.
const MAX_LISTED_REJECTIONS: usize = 20;

/// Execute the `run` command: parse, validate, and run a pipeline.
pub async fn execute(pipeline_path: &Path, dry_run: bool, limit: Option<u64>) -> Result<()> {
    let config = super::load_pipeline(pipeline_path)?;

    let options = ExecutionOptions {
        dry_run: dry_run || limit.is_some(),
        limit,
    };

    if config.transform.uses_default_threshold() {
        tracing::warn!(
            min_order_id = config.transform.min_order_id,
            "transform.min_order_id is left at the default, which matches the synthetic \
             generator's numbering; set it explicitly for real sources"
        );
    }

    let destination = config.destination.connection_or(&config.source.connection);
    tracing::info!(
        pipeline = config.pipeline,
        source = %config.source.connection.display_target(),
        destination = %destination.display_target(),
        table = %format!("{}.{}", config.destination.schema, config.destination.table),
        dry_run = options.dry_run,
        "Pipeline validated"
    );

    let state = if options.dry_run {
        None
    } else {
        orchestrator::create_state_backend(&config.state)?
    };
    let extractor = PostgresExtractor::new(&config.source);
    let mut loader = PostgresLoader::new(&config.destination, &config.source);

    match run_pipeline(&config, &extractor, &mut loader, state, &options).await? {
        PipelineOutcome::Run(result) => print_run(&result),
        PipelineOutcome::DryRun(result) => print_dry_run(&result),
    }
}

fn print_run(result: &PipelineResult) -> Result<()> {
    println!("Pipeline '{}' completed successfully.", result.pipeline);
    if let Some(run_id) = result.run_id {
        println!("  Run id:             {run_id}");
    }
    print_report(&result.report);
    println!("  Records loaded:     {}", result.records_loaded);
    if result.run_id.is_some() {
        println!("  Rejections stored:  {}", result.rejections_persisted);
    }
    println!("  Duration:           {:.2}s", result.duration_secs);
    print_rejections(&result.rejected_records);

    // Machine-readable summary for scripts
    let json = serde_json::to_string(result).context("Failed to serialize run result")?;
    println!("@@LEDGERBYTE_JSON@@{json}");
    Ok(())
}

fn print_dry_run(result: &DryRunResult) -> Result<()> {
    println!("Dry run of '{}' (nothing loaded).", result.pipeline);
    print_report(&result.report);
    println!("  Duration:           {:.2}s", result.duration_secs);
    print_rejections(&result.rejected_records);

    if result.batch.num_rows() > 0 {
        let table = pretty_format_batches(std::slice::from_ref(&result.batch))
            .context("Failed to format accepted rows")?;
        println!("\n{table}");
    }
    Ok(())
}

fn print_report(report: &TransformReport) {
    println!("  Orders read:        {}", report.input_orders);
    println!("  Duplicates removed: {}", report.duplicates_removed);
    println!("  Unmatched orders:   {}", report.unmatched_orders);
    println!("  Quantities imputed: {}", report.quantities_imputed);
    println!("  Regions imputed:    {}", report.regions_imputed);
    println!("  Records accepted:   {}", report.accepted);
    println!("  Records rejected:   {}", report.rejected);
}

fn print_rejections(rejected: &[RejectedRecord]) {
    if rejected.is_empty() {
        return;
    }
    println!("  Rejected orders:");
    for record in rejected.iter().take(MAX_LISTED_REJECTIONS) {
        println!("    {}: {}", record.order_id(), record.reason());
    }
    if rejected.len() > MAX_LISTED_REJECTIONS {
        println!("    ... and {} more", rejected.len() - MAX_LISTED_REJECTIONS);
    }
}
