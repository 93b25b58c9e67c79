//! Semantic validation for parsed pipeline configuration values.

use anyhow::{bail, Result};

use crate::config::types::{ConnectionConfig, PipelineConfig};

/// PostgreSQL truncates identifiers beyond this many bytes.
const PG_IDENTIFIER_MAX_LEN: usize = 63;

/// Check that `name` is a plain PostgreSQL identifier: a letter or
/// underscore followed by letters, digits or underscores, at most 63 bytes.
///
/// # Errors
///
/// Returns a description of the first problem found.
pub fn validate_pg_identifier(name: &str) -> std::result::Result<(), String> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err("identifier must not be empty".to_string());
    };

    if name.len() > PG_IDENTIFIER_MAX_LEN {
        return Err(format!(
            "identifier '{name}' exceeds PostgreSQL maximum length of {PG_IDENTIFIER_MAX_LEN} bytes (got {})",
            name.len()
        ));
    }
    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(format!(
            "identifier '{name}' must start with a letter or underscore"
        ));
    }
    if let Some(ch) = chars.find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_') {
        return Err(format!("identifier '{name}' contains invalid character '{ch}'"));
    }
    Ok(())
}

fn validate_connection(conn: &ConnectionConfig, context: &str, errors: &mut Vec<String>) {
    if conn.host.trim().is_empty() {
        errors.push(format!("{context}: host must not be empty"));
    }
    if conn.database.trim().is_empty() {
        errors.push(format!("{context}: database must not be empty"));
    }
    if conn.user.trim().is_empty() {
        errors.push(format!("{context}: user must not be empty"));
    }
    if conn.port == 0 {
        errors.push(format!("{context}: port must be > 0"));
    }
}

fn validate_identifier(name: &str, context: &str, errors: &mut Vec<String>) {
    if let Err(e) = validate_pg_identifier(name) {
        errors.push(format!("{context}: {e}"));
    }
}

/// Validate a parsed pipeline configuration.
/// Returns `Ok(())` if valid, Err with all validation errors if not.
///
/// # Errors
///
/// Returns an error listing all validation failures found in the pipeline config.
pub fn validate_pipeline(config: &PipelineConfig) -> Result<()> {
    let mut errors = Vec::new();

    if config.version != "1.0" {
        errors.push(format!(
            "Unsupported pipeline version '{}', expected '1.0'",
            config.version
        ));
    }

    if config.pipeline.trim().is_empty() {
        errors.push("Pipeline name must not be empty".to_string());
    }

    validate_connection(&config.source.connection, "source", &mut errors);
    validate_identifier(&config.source.orders_table, "source.orders_table", &mut errors);
    validate_identifier(
        &config.source.customers_table,
        "source.customers_table",
        &mut errors,
    );

    if let Some(ref conn) = config.destination.connection {
        validate_connection(conn, "destination.connection", &mut errors);
    }
    validate_identifier(&config.destination.schema, "destination.schema", &mut errors);
    validate_identifier(&config.destination.table, "destination.table", &mut errors);

    if config.transform.parallel_threshold == 0 {
        errors.push("transform.parallel_threshold must be at least 1".to_string());
    }
    if config.transform.min_order_id < 0 {
        errors.push("transform.min_order_id must not be negative".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        bail!("Pipeline validation failed:\n  - {}", errors.join("\n  - "));
    }
}
