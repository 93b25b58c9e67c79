use std::path::Path;

use anyhow::Result;
use ledgerbyte_engine::generator::{self, GeneratorConfig};

/// Execute the `generate` command: recreate the raw tables with synthetic data.
pub async fn execute(
    pipeline_path: &Path,
    customers: usize,
    orders: usize,
    seed: Option<u64>,
) -> Result<()> {
    let config = super::load_pipeline(pipeline_path)?;

    let tables = generator::generate(&GeneratorConfig {
        customers,
        orders,
        seed,
        ..GeneratorConfig::default()
    })?;
    tracing::info!(
        customers = tables.customers.len(),
        orders = tables.orders.len(),
        seed = ?seed,
        "Generated synthetic source data"
    );

    let (customers_written, orders_written) =
        ledgerbyte_postgres::seed::seed_raw_tables(&config.source, &tables).await?;

    println!(
        "Seeded {} ({} rows) and {} ({} rows) on {}.",
        config.source.customers_table,
        customers_written,
        config.source.orders_table,
        orders_written,
        config.source.connection.display_target()
    );
    Ok(())
}
