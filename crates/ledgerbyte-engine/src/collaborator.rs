//! I/O collaborators injected into the orchestrator.
//!
//! The transform never reaches a database itself. An [`Extractor`] hands it
//! the two raw tables and a [`Loader`] persists the accepted batch. The
//! in-memory implementations back tests and dry runs.

use std::future::Future;

use arrow::record_batch::RecordBatch;
use ledgerbyte_types::record::RawTables;

/// Source of the raw orders and customers tables.
pub trait Extractor: Send + Sync {
    /// Materialize both raw tables. `limit` caps the number of orders read.
    fn extract(&self, limit: Option<u64>) -> impl Future<Output = anyhow::Result<RawTables>> + Send;
}

/// Destination of the accepted analytics batch.
///
/// A load replaces whatever the previous load left behind.
pub trait Loader: Send {
    /// Persist `batch`, returning the number of rows written.
    fn load(&mut self, batch: &RecordBatch) -> impl Future<Output = anyhow::Result<u64>> + Send;
}

/// Extractor serving fixed tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryExtractor {
    tables: RawTables,
}

impl MemoryExtractor {
    #[must_use]
    pub fn new(tables: RawTables) -> Self {
        Self { tables }
    }
}

impl Extractor for MemoryExtractor {
    async fn extract(&self, limit: Option<u64>) -> anyhow::Result<RawTables> {
        let mut tables = self.tables.clone();
        if let Some(limit) = limit {
            tables
                .orders
                .truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(tables)
    }
}

/// Loader keeping the most recent batch in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    current: Option<RecordBatch>,
    loads: usize,
}

impl MemoryLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The batch written by the latest load.
    #[must_use]
    pub fn current(&self) -> Option<&RecordBatch> {
        self.current.as_ref()
    }

    /// Number of loads performed.
    #[must_use]
    pub fn loads(&self) -> usize {
        self.loads
    }
}

impl Loader for MemoryLoader {
    async fn load(&mut self, batch: &RecordBatch) -> anyhow::Result<u64> {
        self.current = Some(batch.clone());
        self.loads += 1;
        Ok(batch.num_rows() as u64)
    }
}
