//! Durable store gateway
//!
//! The hub never talks to a database directly; it writes through the
//! [`StoreGateway`] trait and reads server-assigned ids and timestamps
//! from the returned records. Retry policy, if any, lives behind this
//! boundary; the router never retries.

pub mod models;
pub mod sqlite;

pub use models::{
    AgentStatusRecord, DecisionKind, DecisionRecord, MemorySnapshotRecord, MetricRecord,
    NewDecision, NewMemorySnapshot, NewMetric, NewTrace, TraceRecord, TraceStatus,
};
pub use sqlite::SqliteStore;

use crate::errors::StoreError;
use async_trait::async_trait;

/// Persistence boundary consumed by the hub
///
/// Every operation is idempotent at the gateway level and returns the
/// persisted record or a typed failure.
#[async_trait]
pub trait StoreGateway: Send + Sync {
    async fn create_trace(&self, new: NewTrace) -> Result<TraceRecord, StoreError>;

    async fn create_metric(&self, new: NewMetric) -> Result<MetricRecord, StoreError>;

    async fn create_decision(&self, new: NewDecision) -> Result<DecisionRecord, StoreError>;

    async fn create_memory_snapshot(
        &self,
        new: NewMemorySnapshot,
    ) -> Result<MemorySnapshotRecord, StoreError>;

    /// Upsert the agent's status; last write wins
    async fn update_agent_status(
        &self,
        agent_id: &str,
        status: &str,
    ) -> Result<AgentStatusRecord, StoreError>;
}
