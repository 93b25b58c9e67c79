pub mod check;
pub mod generate;
pub mod run;

use std::path::Path;

use anyhow::{Context, Result};
use ledgerbyte_engine::config::{parser, validator, PipelineConfig};

/// Parse and validate a pipeline file.
pub(crate) fn load_pipeline(pipeline_path: &Path) -> Result<PipelineConfig> {
    let config = parser::parse_pipeline(pipeline_path)
        .with_context(|| format!("Failed to parse pipeline: {}", pipeline_path.display()))?;
    validator::validate_pipeline(&config)?;
    Ok(config)
}
