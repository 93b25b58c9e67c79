//! Pipeline YAML configuration model.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::transform::{TransformOptions, DEFAULT_MIN_ORDER_ID, DEFAULT_PARALLEL_THRESHOLD};

/// Top-level pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub version: String,
    pub pipeline: String,
    pub source: SourceConfig,
    #[serde(default)]
    pub destination: DestinationConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub state: StateConfig,
}

/// PostgreSQL connection parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
}

impl ConnectionConfig {
    /// libpq-style key/value connection string.
    #[must_use]
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} user={} password={} dbname={}",
            self.host, self.port, self.user, self.password, self.database
        )
    }

    /// `host:port/database`, safe to log.
    #[must_use]
    pub fn display_target(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

/// Where the raw tables are read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(flatten)]
    pub connection: ConnectionConfig,
    #[serde(default = "default_orders_table")]
    pub orders_table: String,
    #[serde(default = "default_customers_table")]
    pub customers_table: String,
}

/// Where the analytics table is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Falls back to the source connection when absent.
    #[serde(default)]
    pub connection: Option<ConnectionConfig>,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_table")]
    pub table: String,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            connection: None,
            schema: default_schema(),
            table: default_table(),
        }
    }
}

impl DestinationConfig {
    #[must_use]
    pub fn connection_or<'a>(&'a self, source: &'a ConnectionConfig) -> &'a ConnectionConfig {
        self.connection.as_ref().unwrap_or(source)
    }
}

/// What to do when the validation gate accepts nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyOutputPolicy {
    /// Log a warning and load the empty table.
    #[default]
    Warn,
    /// Fail the run before loading.
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(default = "default_min_order_id")]
    pub min_order_id: i64,
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
    #[serde(default)]
    pub on_empty_output: EmptyOutputPolicy,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            min_order_id: DEFAULT_MIN_ORDER_ID,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            on_empty_output: EmptyOutputPolicy::default(),
        }
    }
}

impl TransformConfig {
    #[must_use]
    pub fn options(&self) -> TransformOptions {
        TransformOptions {
            min_order_id: self.min_order_id,
            parallel_threshold: self.parallel_threshold,
        }
    }

    /// `true` when the `order_id` threshold was left at the value tied to
    /// the synthetic generator's numbering.
    #[must_use]
    pub fn uses_default_threshold(&self) -> bool {
        self.min_order_id == DEFAULT_MIN_ORDER_ID
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateBackendKind {
    #[default]
    Sqlite,
    None,
}

/// Run history and rejected-record storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default)]
    pub backend: StateBackendKind,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StateConfig {
    /// Database path, defaulting to `ledgerbyte-state.db` in the working
    /// directory.
    #[must_use]
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from("ledgerbyte-state.db"))
    }
}

fn default_port() -> u16 {
    5432
}

fn default_orders_table() -> String {
    "raw_orders".to_string()
}

fn default_customers_table() -> String {
    "raw_customers".to_string()
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_table() -> String {
    "analytics_sales".to_string()
}

fn default_min_order_id() -> i64 {
    DEFAULT_MIN_ORDER_ID
}

fn default_parallel_threshold() -> usize {
    DEFAULT_PARALLEL_THRESHOLD
}
