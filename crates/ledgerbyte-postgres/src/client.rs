//! PostgreSQL client connection and connectivity checks.

use anyhow::Context;
use ledgerbyte_engine::config::ConnectionConfig;
use tokio_postgres::{Client, Config as PgConfig, NoTls};

/// Connect to PostgreSQL and drive the connection on a background task.
///
/// # Errors
///
/// Returns an error if the server cannot be reached or rejects the login.
pub async fn connect(config: &ConnectionConfig) -> anyhow::Result<Client> {
    let mut pg = PgConfig::new();
    pg.host(&config.host);
    pg.port(config.port);
    pg.user(&config.user);
    if !config.password.is_empty() {
        pg.password(&config.password);
    }
    pg.dbname(&config.database);

    let (client, connection) = pg
        .connect(NoTls)
        .await
        .with_context(|| format!("Connection to {} failed", config.display_target()))?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(error = %e, "PostgreSQL connection error");
        }
    });

    Ok(client)
}

/// Check connectivity and, when given, whether `schema` exists.
///
/// Returns a human-readable status line.
///
/// # Errors
///
/// Returns an error if the connection or the connectivity query fails.
pub async fn check_connection(
    config: &ConnectionConfig,
    schema: Option<&str>,
) -> anyhow::Result<String> {
    let client = connect(config).await?;
    client
        .query_one("SELECT 1", &[])
        .await
        .context("Connection test failed")?;

    let Some(schema) = schema else {
        return Ok(format!("Connected to {}", config.display_target()));
    };

    let exists = client
        .query_opt(
            "SELECT schema_name FROM information_schema.schemata WHERE schema_name = $1",
            &[&schema],
        )
        .await
        .context("Schema lookup failed")?
        .is_some();

    Ok(if exists {
        format!("Connected to {} (schema: {schema})", config.display_target())
    } else {
        format!(
            "Connected to {} (schema '{schema}' does not exist, will be created)",
            config.display_target()
        )
    })
}
