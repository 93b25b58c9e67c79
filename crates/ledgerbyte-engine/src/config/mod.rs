//! Pipeline configuration: YAML model, parsing, and semantic validation.

pub mod parser;
pub mod types;
pub mod validator;

pub use parser::{parse_pipeline, parse_pipeline_str, substitute_env_vars};
pub use types::{
    ConnectionConfig, DestinationConfig, EmptyOutputPolicy, PipelineConfig, SourceConfig,
    StateBackendKind, StateConfig, TransformConfig,
};
pub use validator::{validate_pg_identifier, validate_pipeline};
