//! `SQLite`-backed implementation of [`StateBackend`].
//!
//! Uses a single `Mutex<Connection>` for thread safety.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDateTime;
use ledgerbyte_types::state::{DeadLetterRecord, PipelineId, RunRecord, RunStats, RunStatus};
use rusqlite::{Connection, OptionalExtension};

use crate::backend::StateBackend;
use crate::error::{self, StateError};

/// `SQLite` datetime format (UTC, no timezone suffix).
const SQLITE_DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Idempotent DDL for state tables.
const CREATE_TABLES: &str = r"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pipeline TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL DEFAULT (datetime('now')),
    finished_at TEXT,
    orders_read INTEGER NOT NULL DEFAULT 0,
    duplicates_removed INTEGER NOT NULL DEFAULT 0,
    records_accepted INTEGER NOT NULL DEFAULT 0,
    records_rejected INTEGER NOT NULL DEFAULT 0,
    records_loaded INTEGER NOT NULL DEFAULT 0,
    error_message TEXT
);

CREATE TABLE IF NOT EXISTS rejected_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pipeline TEXT NOT NULL,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    order_id INTEGER NOT NULL,
    record_json TEXT NOT NULL,
    reason TEXT NOT NULL,
    failed_at TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_rejected_pipeline_run ON rejected_records (pipeline, run_id);
";

/// `SQLite`-backed state storage.
///
/// Create with [`SqliteStateBackend::open`] for file-backed persistence
/// or [`SqliteStateBackend::in_memory`] for tests.
pub struct SqliteStateBackend {
    conn: Mutex<Connection>,
}

impl SqliteStateBackend {
    /// Open or create a `SQLite` state database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`] if the directory can't be created,
    /// or [`StateError::Sqlite`] if the database can't be opened.
    pub fn open(path: &Path) -> error::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Create an in-memory `SQLite` backend (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Sqlite`] if the in-memory database can't
    /// be initialized.
    pub fn in_memory() -> error::Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> error::Result<Self> {
        conn.execute_batch(CREATE_TABLES)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the connection lock.
    fn lock_conn(&self) -> error::Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StateError::LockPoisoned)
    }

    /// Convert a `SQLite` datetime string to ISO-8601.
    fn sqlite_to_iso8601(raw: &str) -> String {
        NaiveDateTime::parse_from_str(raw, SQLITE_DATETIME_FMT).map_or_else(
            |_| raw.to_string(),
            |ndt| format!("{}Z", ndt.format("%Y-%m-%dT%H:%M:%S")),
        )
    }

    #[cfg(test)]
    fn count_rejected_for_run(&self, pipeline: &PipelineId, run_id: i64) -> error::Result<i64> {
        let conn = self.lock_conn()?;
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM rejected_records WHERE pipeline = ?1 AND run_id = ?2",
            rusqlite::params![pipeline.as_str(), run_id],
            |row| row.get(0),
        )?)
    }
}

#[allow(clippy::cast_sign_loss)]
fn count(value: i64) -> u64 {
    value.max(0) as u64
}

#[allow(clippy::cast_possible_wrap)]
fn stored(value: u64) -> i64 {
    value as i64
}

impl StateBackend for SqliteStateBackend {
    fn start_run(&self, pipeline: &PipelineId) -> error::Result<i64> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO runs (pipeline, status) VALUES (?1, ?2)",
            rusqlite::params![pipeline.as_str(), RunStatus::Running.as_str()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn complete_run(&self, run_id: i64, status: RunStatus, stats: &RunStats) -> error::Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "UPDATE runs SET status = ?1, finished_at = datetime('now'), \
             orders_read = ?2, duplicates_removed = ?3, records_accepted = ?4, \
             records_rejected = ?5, records_loaded = ?6, error_message = ?7 \
             WHERE id = ?8",
            rusqlite::params![
                status.as_str(),
                stored(stats.orders_read),
                stored(stats.duplicates_removed),
                stored(stats.records_accepted),
                stored(stats.records_rejected),
                stored(stats.records_loaded),
                stats.error_message,
                run_id,
            ],
        )?;
        Ok(())
    }

    fn insert_rejected_records(
        &self,
        pipeline: &PipelineId,
        run_id: i64,
        records: &[DeadLetterRecord],
    ) -> error::Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StateError::operation("insert_rejected_records: begin tx", e))?;
        let mut stmt = tx
            .prepare(
                "INSERT INTO rejected_records \
                 (pipeline, run_id, order_id, record_json, reason, failed_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .map_err(|e| StateError::operation("insert_rejected_records: prepare", e))?;

        let mut inserted = 0u64;
        for record in records {
            stmt.execute(rusqlite::params![
                pipeline.as_str(),
                run_id,
                record.order_id,
                record.record_json,
                record.reason,
                record.failed_at,
            ])
            .map_err(|e| StateError::operation("insert_rejected_records: execute", e))?;
            inserted += 1;
        }
        drop(stmt);
        tx.commit()
            .map_err(|e| StateError::operation("insert_rejected_records: commit", e))?;

        Ok(inserted)
    }

    fn run_record(&self, run_id: i64) -> error::Result<Option<RunRecord>> {
        let conn = self.lock_conn()?;
        let row = conn
            .query_row(
                "SELECT pipeline, status, started_at, finished_at, orders_read, \
                 duplicates_removed, records_accepted, records_rejected, records_loaded, \
                 error_message FROM runs WHERE id = ?1",
                [run_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        RunStats {
                            orders_read: count(row.get(4)?),
                            duplicates_removed: count(row.get(5)?),
                            records_accepted: count(row.get(6)?),
                            records_rejected: count(row.get(7)?),
                            records_loaded: count(row.get(8)?),
                            error_message: row.get(9)?,
                        },
                    ))
                },
            )
            .optional()?;

        let Some((pipeline, status, started_at, finished_at, stats)) = row else {
            return Ok(None);
        };
        let status = RunStatus::parse(&status)
            .ok_or_else(|| StateError::Corrupt(format!("run {run_id} has status '{status}'")))?;

        Ok(Some(RunRecord {
            run_id,
            pipeline: PipelineId::new(pipeline),
            status,
            started_at: Self::sqlite_to_iso8601(&started_at),
            finished_at: finished_at.as_deref().map(Self::sqlite_to_iso8601),
            stats,
        }))
    }

    fn rejected_records(&self, run_id: i64) -> error::Result<Vec<DeadLetterRecord>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT order_id, record_json, reason, failed_at FROM rejected_records \
             WHERE run_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([run_id], |row| {
            Ok(DeadLetterRecord {
                order_id: row.get(0)?,
                record_json: row.get(1)?,
                reason: row.get(2)?,
                failed_at: row.get(3)?,
            })
        })?;
        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}
