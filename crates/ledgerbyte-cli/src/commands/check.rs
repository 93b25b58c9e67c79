use std::path::Path;

use anyhow::Result;
use ledgerbyte_engine::orchestrator;

/// Execute the `check` command: validate pipeline config and connectivity.
pub async fn execute(pipeline_path: &Path) -> Result<()> {
    let config = super::load_pipeline(pipeline_path)?;
    println!("Pipeline structure: OK");

    let source = ledgerbyte_postgres::check_connection(&config.source.connection, None).await;
    let source_ok = print_check("Source", &source);

    let destination_conn = config.destination.connection_or(&config.source.connection);
    let destination = ledgerbyte_postgres::check_connection(
        destination_conn,
        Some(config.destination.schema.as_str()),
    )
    .await;
    let destination_ok = print_check("Destination", &destination);

    let state = orchestrator::create_state_backend(&config.state).map(|backend| match backend {
        Some(_) => format!("{}", config.state.resolved_path().display()),
        None => "disabled".to_string(),
    });
    let state_ok = print_check("State backend", &state);

    if source_ok && destination_ok && state_ok {
        println!("\nAll checks passed.");
        Ok(())
    } else {
        anyhow::bail!("One or more checks failed")
    }
}

fn print_check<E: std::fmt::Display>(label: &str, result: &Result<String, E>) -> bool {
    let label = format!("{label}:");
    match result {
        Ok(message) => {
            println!("{label:18} OK");
            println!("  {message}");
            true
        }
        Err(e) => {
            println!("{label:18} FAILED");
            println!("  {e:#}");
            false
        }
    }
}
