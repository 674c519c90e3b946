//! SQLite-backed store gateway
//!
//! Fresh schema (no migrations), WAL journal mode, and a single pooled
//! connection behind a mutex. Ids are uuid v4 strings assigned here;
//! timestamps are RFC 3339 UTC.
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::arguments::is_debug_store_enabled;
use crate::errors::StoreError;
use crate::logger::{self, LogTag};

use super::models::{
    AgentStatusRecord, DecisionRecord, MemorySnapshotRecord, MetricRecord, NewDecision,
    NewMemorySnapshot, NewMetric, NewTrace, TraceRecord,
};
use super::StoreGateway;

/// Busy timeout for concurrent writers
const BUSY_TIMEOUT_MS: u64 = 30_000;

/// SQLite store gateway
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and initialize the schema
    ///
    /// `":memory:"` is supported for tests and zero-setup runs.
    pub fn open(path: &str) -> Result<Self> {
        if path != ":memory:" {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("failed to create data directory for {}", path))?;
                }
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite database at {}", path))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .context("failed to set journal mode")?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .context("failed to set synchronous mode")?;
        conn.busy_timeout(std::time::Duration::from_millis(BUSY_TIMEOUT_MS))
            .context("failed to set busy timeout")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;

        logger::log(
            LogTag::Store,
            "READY",
            &format!("sqlite store initialized at {}", path),
        );

        Ok(store)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS agents (
                agent_id    TEXT PRIMARY KEY,
                status      TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS traces (
                id          TEXT PRIMARY KEY,
                agent_id    TEXT NOT NULL,
                session_id  TEXT,
                action      TEXT NOT NULL,
                tool_name   TEXT,
                input       TEXT,
                output      TEXT,
                tokens_used INTEGER NOT NULL DEFAULT 0,
                cost        REAL NOT NULL DEFAULT 0,
                error       TEXT,
                duration_ms INTEGER NOT NULL DEFAULT 0,
                status      TEXT NOT NULL,
                timestamp   TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_traces_agent_time
                ON traces(agent_id, timestamp DESC);
            CREATE TABLE IF NOT EXISTS metrics (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                agent_id    TEXT NOT NULL,
                name        TEXT NOT NULL,
                value       REAL NOT NULL,
                timestamp   TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_metrics_agent_name
                ON metrics(agent_id, name, timestamp DESC);
            CREATE TABLE IF NOT EXISTS decisions (
                id            TEXT PRIMARY KEY,
                agent_id      TEXT NOT NULL,
                decision_type TEXT NOT NULL,
                reasoning     TEXT,
                result        TEXT,
                success       INTEGER NOT NULL DEFAULT 0,
                timestamp     TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_decisions_agent_time
                ON decisions(agent_id, timestamp DESC);
            CREATE TABLE IF NOT EXISTS memory_snapshots (
                id                 TEXT PRIMARY KEY,
                agent_id           TEXT NOT NULL,
                total_memory       INTEGER NOT NULL,
                used_memory        INTEGER NOT NULL,
                context_window     INTEGER NOT NULL,
                max_context_window INTEGER NOT NULL,
                timestamp          TEXT NOT NULL
            );",
        )
        .context("failed to initialize store schema")?;
        Ok(())
    }

    /// Row count helper for tests and the status endpoint
    pub fn count(&self, table: &str) -> Result<u64, StoreError> {
        // table names come from our own code, never from clients
        let conn = self.conn.lock();
        let count: u64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }
}

#[async_trait]
impl StoreGateway for SqliteStore {
    async fn create_trace(&self, new: NewTrace) -> Result<TraceRecord, StoreError> {
        let id = Uuid::new_v4().to_string();
        let timestamp = Utc::now();
        let input_json = new.input.as_ref().map(|v| v.to_string());
        let output_json = new.output.as_ref().map(|v| v.to_string());

        {
            let conn = self.conn.lock();
            conn.execute(
                "INSERT INTO traces (id, agent_id, session_id, action, tool_name, input, output,
                                     tokens_used, cost, error, duration_ms, status, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    id,
                    new.agent_id,
                    new.session_id,
                    new.action,
                    new.tool_name,
                    input_json,
                    output_json,
                    new.tokens_used,
                    new.cost,
                    new.error,
                    new.duration_ms,
                    new.status.as_str(),
                    timestamp.to_rfc3339(),
                ],
            )?;
        }

        if is_debug_store_enabled() {
            logger::debug(
                LogTag::Store,
                &format!("trace {} persisted for agent {}", id, new.agent_id),
            );
        }

        Ok(TraceRecord {
            id,
            agent_id: new.agent_id,
            session_id: new.session_id,
            action: new.action,
            tool_name: new.tool_name,
            input: new.input,
            output: new.output,
            tokens_used: new.tokens_used,
            cost: new.cost,
            error: new.error,
            duration_ms: new.duration_ms,
            status: new.status,
            timestamp,
        })
    }

    async fn create_metric(&self, new: NewMetric) -> Result<MetricRecord, StoreError> {
        let timestamp = Utc::now();
        {
            let conn = self.conn.lock();
            conn.execute(
                "INSERT INTO metrics (agent_id, name, value, timestamp) VALUES (?1, ?2, ?3, ?4)",
                params![new.agent_id, new.name, new.value, timestamp.to_rfc3339()],
            )?;
        }
        Ok(MetricRecord {
            agent_id: new.agent_id,
            name: new.name,
            value: new.value,
            timestamp,
        })
    }

    async fn create_decision(&self, new: NewDecision) -> Result<DecisionRecord, StoreError> {
        let id = Uuid::new_v4().to_string();
        let timestamp = Utc::now();
        {
            let conn = self.conn.lock();
            conn.execute(
                "INSERT INTO decisions (id, agent_id, decision_type, reasoning, result, success, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    new.agent_id,
                    new.kind.as_str(),
                    new.reasoning,
                    new.result,
                    new.success as i64,
                    timestamp.to_rfc3339(),
                ],
            )?;
        }
        Ok(DecisionRecord {
            id,
            agent_id: new.agent_id,
            kind: new.kind,
            reasoning: new.reasoning,
            result: new.result,
            success: new.success,
            timestamp,
        })
    }

    async fn create_memory_snapshot(
        &self,
        new: NewMemorySnapshot,
    ) -> Result<MemorySnapshotRecord, StoreError> {
        let id = Uuid::new_v4().to_string();
        let timestamp = Utc::now();
        {
            let conn = self.conn.lock();
            conn.execute(
                "INSERT INTO memory_snapshots
                    (id, agent_id, total_memory, used_memory, context_window, max_context_window, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    new.agent_id,
                    new.total_memory,
                    new.used_memory,
                    new.context_window,
                    new.max_context_window,
                    timestamp.to_rfc3339(),
                ],
            )?;
        }
        Ok(MemorySnapshotRecord {
            id,
            agent_id: new.agent_id,
            total_memory: new.total_memory,
            used_memory: new.used_memory,
            context_window: new.context_window,
            max_context_window: new.max_context_window,
            timestamp,
        })
    }

    async fn update_agent_status(
        &self,
        agent_id: &str,
        status: &str,
    ) -> Result<AgentStatusRecord, StoreError> {
        let updated_at = Utc::now();
        {
            let conn = self.conn.lock();
            conn.execute(
                "INSERT INTO agents (agent_id, status, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(agent_id) DO UPDATE SET status = ?2, updated_at = ?3",
                params![agent_id, status, updated_at.to_rfc3339()],
            )?;
        }
        if is_debug_store_enabled() {
            logger::debug(
                LogTag::Store,
                &format!("agent {} status set to {}", agent_id, status),
            );
        }
        Ok(AgentStatusRecord {
            agent_id: agent_id.to_string(),
            status: status.to_string(),
            updated_at,
        })
    }
}
