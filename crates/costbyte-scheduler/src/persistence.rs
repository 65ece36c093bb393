//! SQLite-backed log sink: worker logs and analytics samples.
//! Append-only: rows are inserted, never updated or deleted.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use costbyte_core::error::{CostByteError, Result};
use costbyte_core::traits::LogSink;
use costbyte_core::types::{MetricSample, WorkerLogEntry};
use rusqlite::{Connection, params};

/// Log store for `ai_helper_logs` and `analytics`.
pub struct SqliteSink {
    conn: Mutex<Connection>,
}

impl SqliteSink {
    /// Open or create the database, creating the parent directory if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).map_err(|e| CostByteError::Database(format!("DB open: {e}")))?;
        let sink = Self {
            conn: Mutex::new(conn),
        };
        sink.migrate()?;
        tracing::info!("🗄️ Log database ready: {}", path.display());
        Ok(sink)
    }

    /// Private in-memory database, used when no file should be touched.
    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| CostByteError::Database(format!("DB open: {e}")))?;
        let sink = Self {
            conn: Mutex::new(conn),
        };
        sink.migrate()?;
        Ok(sink)
    }

    fn migrate(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "
            -- Task runs and heartbeat recoveries
            CREATE TABLE IF NOT EXISTS ai_helper_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ai_helper TEXT NOT NULL,
                task TEXT NOT NULL,
                status TEXT NOT NULL,
                details TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_ai_helper_logs_helper ON ai_helper_logs(ai_helper);

            -- Telemetry samples
            CREATE TABLE IF NOT EXISTS analytics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                metric_name TEXT NOT NULL,
                metric_value REAL NOT NULL,
                metric_type TEXT NOT NULL,
                period TEXT NOT NULL,
                period_start TEXT NOT NULL,
                period_end TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_analytics_metric ON analytics(metric_name);
         ",
            )
            .map_err(|e| CostByteError::Database(format!("Migration: {e}")))
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CostByteError::Database(format!("connection lock poisoned: {e}")))?;
        f(&conn)
    }

    fn insert_log(&self, entry: &WorkerLogEntry) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO ai_helper_logs (ai_helper, task, status, details, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.worker,
                    entry.task,
                    entry.status,
                    entry.details,
                    entry.created_at.to_rfc3339()
                ],
            )
            .map(|_| ())
            .map_err(|e| CostByteError::SinkWrite(format!("ai_helper_logs insert: {e}")))
        })
    }

    fn insert_sample(&self, sample: &MetricSample) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO analytics (metric_name, metric_value, metric_type, period, period_start, period_end)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    sample.metric_name,
                    sample.metric_value,
                    sample.metric_type,
                    sample.period,
                    sample.period_start.to_rfc3339(),
                    sample.period_end.to_rfc3339()
                ],
            )
            .map(|_| ())
            .map_err(|e| CostByteError::SinkWrite(format!("analytics insert: {e}")))
        })
    }

    fn ping(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0))
                .map(|_| ())
                .map_err(|e| CostByteError::Database(e.to_string()))
        })
    }

    /// Most recent worker log rows, newest first.
    pub fn recent_logs(&self, limit: usize) -> Vec<WorkerLogEntry> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT ai_helper, task, status, details, created_at
                     FROM ai_helper_logs ORDER BY id DESC LIMIT ?1",
                )
                .map_err(|e| CostByteError::Database(e.to_string()))?;
            let rows = stmt
                .query_map([limit as i64], |row| {
                    let created: String = row.get(4)?;
                    Ok(WorkerLogEntry {
                        worker: row.get(0)?,
                        task: row.get(1)?,
                        status: row.get(2)?,
                        details: row.get(3)?,
                        created_at: parse_time(&created),
                    })
                })
                .map_err(|e| CostByteError::Database(e.to_string()))?;
            Ok(rows.filter_map(|r| r.ok()).collect())
        })
        .unwrap_or_default()
    }

    /// Number of telemetry samples stored.
    pub fn sample_count(&self) -> usize {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM analytics", [], |r| r.get::<_, i64>(0))
                .map_err(|e| CostByteError::Database(e.to_string()))
        })
        .unwrap_or(0) as usize
    }
}

fn parse_time(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}

#[async_trait]
impl LogSink for SqliteSink {
    async fn append_recovery_event(&self, event: &WorkerLogEntry) -> Result<()> {
        self.insert_log(event)
    }

    async fn append_task_log(&self, entry: &WorkerLogEntry) -> Result<()> {
        self.insert_log(entry)
    }

    async fn write_metric_sample(&self, sample: &MetricSample) -> Result<()> {
        self.insert_sample(sample)
    }

    async fn health_check(&self) -> Result<()> {
        self.ping()
    }
}
