//! Pipeline YAML parsing with environment variable substitution.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::config::types::PipelineConfig;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"));

/// Substitute `${VAR_NAME}` patterns with environment variable values.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set.
pub fn substitute_env_vars(input: &str) -> Result<String> {
    let mut missing: Vec<String> = Vec::new();

    let substituted = ENV_VAR_RE.replace_all(input, |cap: &regex::Captures<'_>| {
        let var_name = &cap[1];
        std::env::var(var_name).unwrap_or_else(|_| {
            if !missing.iter().any(|m| m == var_name) {
                missing.push(var_name.to_string());
            }
            String::new()
        })
    });

    if !missing.is_empty() {
        anyhow::bail!("Missing environment variable(s): {}", missing.join(", "));
    }

    Ok(substituted.into_owned())
}

/// Parse a pipeline YAML string (after env var substitution).
///
/// # Errors
///
/// Returns an error if env var substitution fails or the YAML is invalid.
pub fn parse_pipeline_str(yaml_str: &str) -> Result<PipelineConfig> {
    let substituted = substitute_env_vars(yaml_str)?;
    let config: PipelineConfig =
        serde_yaml::from_str(&substituted).context("Failed to parse pipeline YAML")?;
    Ok(config)
}

/// Parse a pipeline YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the YAML is invalid.
pub fn parse_pipeline(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pipeline file: {}", path.display()))?;
    parse_pipeline_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::EmptyOutputPolicy;

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("LB_TEST_HOST", "myhost.example.com");
        let input = "host: ${LB_TEST_HOST}\nport: 5432";
        let result = substitute_env_vars(input).unwrap();
        assert!(result.contains("myhost.example.com"));
        assert!(!result.contains("${LB_TEST_HOST}"));
        std::env::remove_var("LB_TEST_HOST");
    }

    #[test]
    fn test_multiple_env_vars() {
        std::env::set_var("LB_TEST_A", "alpha");
        std::env::set_var("LB_TEST_B", "beta");
        let result = substitute_env_vars("${LB_TEST_A} and ${LB_TEST_B}").unwrap();
        assert_eq!(result, "alpha and beta");
        std::env::remove_var("LB_TEST_A");
        std::env::remove_var("LB_TEST_B");
    }

    #[test]
    fn test_substituted_value_is_not_rescanned() {
        std::env::set_var("LB_TEST_NESTED", "${LB_TEST_NEVER_SET}");
        let result = substitute_env_vars("pw: ${LB_TEST_NESTED}").unwrap();
        assert_eq!(result, "pw: ${LB_TEST_NEVER_SET}");
        std::env::remove_var("LB_TEST_NESTED");
    }

    #[test]
    fn test_no_env_vars_passthrough() {
        let input = "host: localhost\nport: 5432";
        assert_eq!(substitute_env_vars(input).unwrap(), input);
    }

    #[test]
    fn test_multiple_missing_env_vars_all_reported_once() {
        let err = substitute_env_vars("${LB_MISSING_X} and ${LB_MISSING_Y} ${LB_MISSING_X}")
            .unwrap_err()
            .to_string();
        assert_eq!(err, "Missing environment variable(s): LB_MISSING_X, LB_MISSING_Y");
    }

    #[test]
    fn test_parse_pipeline_from_string() {
        std::env::set_var("LB_TEST_PG_HOST", "localhost");
        std::env::set_var("LB_TEST_PG_PASS", "secret");
        let yaml = r#"
version: "1.0"
pipeline: sales_analytics
source:
  host: ${LB_TEST_PG_HOST}
  user: etl
  password: ${LB_TEST_PG_PASS}
  database: shop
destination:
  table: daily_sales
transform:
  min_order_id: 5000
  on_empty_output: fail
state:
  backend: none
"#;
        let config = parse_pipeline_str(yaml).unwrap();
        assert_eq!(config.pipeline, "sales_analytics");
        assert_eq!(config.source.connection.host, "localhost");
        assert_eq!(config.source.connection.password, "secret");
        assert_eq!(config.destination.table, "daily_sales");
        assert_eq!(config.transform.min_order_id, 5000);
        assert_eq!(config.transform.on_empty_output, EmptyOutputPolicy::Fail);
        std::env::remove_var("LB_TEST_PG_HOST");
        std::env::remove_var("LB_TEST_PG_PASS");
    }

    #[test]
    fn test_parse_pipeline_missing_file() {
        let err = parse_pipeline(Path::new("/definitely/not/here.yaml"))
            .unwrap_err()
            .to_string();
        assert!(err.contains("Failed to read pipeline file"));
    }

    #[test]
    fn test_parse_pipeline_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");
        std::fs::write(
            &path,
            "version: \"1.0\"\npipeline: p\nsource:\n  host: h\n  user: u\n  database: d\n",
        )
        .unwrap();
        let config = parse_pipeline(&path).unwrap();
        assert_eq!(config.source.connection.database, "d");
    }

    #[test]
    fn test_invalid_yaml_reports_context() {
        let err = parse_pipeline_str("version: [").unwrap_err().to_string();
        assert!(err.contains("Failed to parse pipeline YAML"));
    }
}
