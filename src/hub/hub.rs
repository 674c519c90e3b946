//! Central telemetry hub: router and broadcast engine
//!
//! Owns the connection registry, dispatches decoded envelopes to the
//! store gateway, and fans persisted records out to matching
//! subscribers. The contract throughout: an event is broadcast only
//! after its persistence call succeeded, and a failed write is reported
//! to the sender alone, never to observers.
//!
//! Envelope handling is serialized per connection (the connection task
//! awaits [`TelemetryHub::handle_envelope`] before reading its next
//! frame). Different connections proceed concurrently, so events from
//! two connections for the same agent broadcast in store-completion
//! order. The hub does not serialize by agent.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::arguments::is_debug_hub_enabled;
use crate::logger::{self, LogTag};
use crate::store::models::{NewDecision, NewMemorySnapshot, NewMetric, NewTrace};
use crate::store::StoreGateway;

use super::envelope::Envelope;
use super::message::{BroadcastScope, ServerMessage};
use super::metrics::HubMetrics;
use super::registry::{ConnectionId, ConnectionRegistry, SubscriptionFilter};

/// Agent status assumed when a heartbeat carries none
const DEFAULT_HEARTBEAT_STATUS: &str = "running";

/// Central telemetry hub
pub struct TelemetryHub {
    registry: ConnectionRegistry,
    store: Arc<dyn StoreGateway>,
    metrics: Arc<HubMetrics>,
    accepting: AtomicBool,
}

impl TelemetryHub {
    /// Create a new hub writing through `store`
    pub fn new(store: Arc<dyn StoreGateway>, buffer_size: usize) -> Arc<Self> {
        Arc::new(Self {
            registry: ConnectionRegistry::new(buffer_size),
            store,
            metrics: HubMetrics::new(),
            accepting: AtomicBool::new(true),
        })
    }

    /// Register a new connection; refused once shutdown has begun
    pub async fn connect(&self) -> Option<(ConnectionId, mpsc::Receiver<ServerMessage>)> {
        if !self.accepting.load(Ordering::SeqCst) {
            return None;
        }
        let (conn_id, rx) = self.registry.add().await;
        self.metrics.connection_opened();

        if is_debug_hub_enabled() {
            logger::debug(
                LogTag::Hub,
                &format!(
                    "connection {} registered (active={})",
                    conn_id,
                    self.registry.len().await
                ),
            );
        }

        Some((conn_id, rx))
    }

    /// Remove a connection; idempotent, safe on close-after-error races
    pub async fn disconnect(&self, conn_id: ConnectionId) {
        if self.registry.remove(conn_id).await {
            self.metrics.connection_closed();
            if is_debug_hub_enabled() {
                logger::debug(
                    LogTag::Hub,
                    &format!(
                        "connection {} unregistered (active={})",
                        conn_id,
                        self.registry.len().await
                    ),
                );
            }
        }
    }

    /// Route one decoded envelope
    ///
    /// Returns the reply for the originating connection, if this kind
    /// has one. Broadcasting happens inside, and only after the store
    /// call succeeded.
    pub async fn handle_envelope(
        &self,
        conn_id: ConnectionId,
        envelope: Envelope,
    ) -> Option<ServerMessage> {
        self.metrics.envelope_processed();

        match envelope {
            Envelope::Register {
                agent_id,
                session_id,
            } => {
                let filter = SubscriptionFilter {
                    agent_id,
                    session_id,
                };
                if !self.registry.set_filter(conn_id, filter).await {
                    // Connection already closed; the task is terminating
                    return None;
                }
                Some(ServerMessage::Registered { success: true })
            }

            Envelope::Trace {
                agent_id,
                session_id,
                action,
                tool_name,
                input,
                output,
                tokens_used,
                cost,
                error,
                duration_ms,
                status,
            } => {
                let new = NewTrace {
                    agent_id: agent_id.clone(),
                    session_id,
                    action,
                    tool_name,
                    input,
                    output,
                    tokens_used,
                    cost,
                    error,
                    duration_ms,
                    status,
                };
                match self.store.create_trace(new).await {
                    Ok(record) => {
                        let id = record.id.clone();
                        self.broadcast(
                            ServerMessage::Trace { data: record },
                            BroadcastScope::Agent(agent_id),
                        )
                        .await;
                        Some(ServerMessage::TraceSaved { id })
                    }
                    Err(e) => Some(self.store_failure("trace", &e.to_string())),
                }
            }

            Envelope::Metric {
                agent_id,
                name,
                value,
            } => {
                let new = NewMetric {
                    agent_id: agent_id.clone(),
                    name,
                    value,
                };
                match self.store.create_metric(new).await {
                    Ok(record) => {
                        self.broadcast(
                            ServerMessage::Metric { data: record },
                            BroadcastScope::Agent(agent_id),
                        )
                        .await;
                        None
                    }
                    Err(e) => Some(self.store_failure("metric", &e.to_string())),
                }
            }

            Envelope::Decision {
                agent_id,
                decision_type,
                reasoning,
                result,
                success,
            } => {
                let new = NewDecision {
                    agent_id: agent_id.clone(),
                    kind: decision_type,
                    reasoning,
                    result,
                    success,
                };
                match self.store.create_decision(new).await {
                    Ok(record) => {
                        self.broadcast(
                            ServerMessage::Decision { data: record },
                            BroadcastScope::Agent(agent_id),
                        )
                        .await;
                        None
                    }
                    Err(e) => Some(self.store_failure("decision", &e.to_string())),
                }
            }

            Envelope::MemorySnapshot {
                agent_id,
                total_memory,
                used_memory,
                context_window,
                max_context_window,
            } => {
                let new = NewMemorySnapshot {
                    agent_id: agent_id.clone(),
                    total_memory,
                    used_memory,
                    context_window,
                    max_context_window,
                };
                match self.store.create_memory_snapshot(new).await {
                    Ok(record) => {
                        self.broadcast(
                            ServerMessage::MemorySnapshot { data: record },
                            BroadcastScope::Agent(agent_id),
                        )
                        .await;
                        None
                    }
                    Err(e) => Some(self.store_failure("memory_snapshot", &e.to_string())),
                }
            }

            Envelope::Heartbeat { agent_id, status } => {
                let status = status.unwrap_or_else(|| DEFAULT_HEARTBEAT_STATUS.to_string());
                match self.store.update_agent_status(&agent_id, &status).await {
                    Ok(record) => {
                        self.broadcast(
                            ServerMessage::AgentStatus { data: record },
                            BroadcastScope::Agent(agent_id),
                        )
                        .await;
                        None
                    }
                    Err(e) => Some(self.store_failure("heartbeat", &e.to_string())),
                }
            }
        }
    }

    /// Deliver a message to every connection whose filter matches
    ///
    /// Iterates a registry snapshot; per-recipient order is the order
    /// messages were submitted here. Full or closed queues drop the
    /// message silently.
    pub async fn broadcast(&self, message: ServerMessage, scope: BroadcastScope) {
        let snapshot = self.registry.snapshot().await;
        if snapshot.is_empty() {
            return;
        }

        let mut sent = 0u64;
        let mut dropped = 0u64;

        for (conn_id, filter, sender) in snapshot {
            if !filter.matches(&scope) {
                continue;
            }
            match sender.try_send(message.clone()) {
                Ok(()) => {
                    sent += 1;
                    self.metrics.message_sent();
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    dropped += 1;
                    self.metrics.message_dropped();
                    if is_debug_hub_enabled() {
                        logger::debug(
                            LogTag::Hub,
                            &format!("message dropped for connection {} (queue full)", conn_id),
                        );
                    }
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    // Connection closed mid-broadcast; removal runs in its task
                    dropped += 1;
                    self.metrics.message_dropped();
                }
            }
        }

        if is_debug_hub_enabled() && (sent > 0 || dropped > 0) {
            logger::debug(
                LogTag::Hub,
                &format!(
                    "broadcast {} (sent={}, dropped={})",
                    message.kind(),
                    sent,
                    dropped
                ),
            );
        }
    }

    /// Stop accepting connections and drain the registry; connection
    /// tasks observe their queue closing and terminate. In-flight
    /// envelope handling finishes normally first.
    pub async fn shutdown(&self) {
        self.accepting.store(false, Ordering::SeqCst);
        self.registry.clear().await;
        logger::info(LogTag::Hub, "hub shut down; registry drained");
    }

    pub async fn active_connections(&self) -> usize {
        self.registry.len().await
    }

    pub fn metrics(&self) -> Arc<HubMetrics> {
        self.metrics.clone()
    }

    fn store_failure(&self, kind: &str, message: &str) -> ServerMessage {
        self.metrics.store_error();
        logger::error(
            LogTag::Hub,
            &format!("store write failed for {} envelope: {}", kind, message),
        );
        ServerMessage::Error {
            message: format!("failed to persist {}: {}", kind, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreError;
    use crate::hub::envelope::decode;
    use crate::store::models::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use uuid::Uuid;

    /// In-memory store double; can be switched into failure mode
    #[derive(Default)]
    struct MockStore {
        fail: AtomicBool,
        statuses: Mutex<HashMap<String, String>>,
    }

    impl MockStore {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn set_failing(&self, failing: bool) {
            self.fail.store(failing, Ordering::SeqCst);
        }

        fn check(&self) -> Result<(), StoreError> {
            if self.fail.load(Ordering::SeqCst) {
                Err(StoreError::Database("injected failure".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl StoreGateway for MockStore {
        async fn create_trace(&self, new: NewTrace) -> Result<TraceRecord, StoreError> {
            self.check()?;
            Ok(TraceRecord {
                id: Uuid::new_v4().to_string(),
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
                timestamp: Utc::now(),
            })
        }

        async fn create_metric(&self, new: NewMetric) -> Result<MetricRecord, StoreError> {
            self.check()?;
            Ok(MetricRecord {
                agent_id: new.agent_id,
                name: new.name,
                value: new.value,
                timestamp: Utc::now(),
            })
        }

        async fn create_decision(&self, new: NewDecision) -> Result<DecisionRecord, StoreError> {
            self.check()?;
            Ok(DecisionRecord {
                id: Uuid::new_v4().to_string(),
                agent_id: new.agent_id,
                kind: new.kind,
                reasoning: new.reasoning,
                result: new.result,
                success: new.success,
                timestamp: Utc::now(),
            })
        }

        async fn create_memory_snapshot(
            &self,
            new: NewMemorySnapshot,
        ) -> Result<MemorySnapshotRecord, StoreError> {
            self.check()?;
            Ok(MemorySnapshotRecord {
                id: Uuid::new_v4().to_string(),
                agent_id: new.agent_id,
                total_memory: new.total_memory,
                used_memory: new.used_memory,
                context_window: new.context_window,
                max_context_window: new.max_context_window,
                timestamp: Utc::now(),
            })
        }

        async fn update_agent_status(
            &self,
            agent_id: &str,
            status: &str,
        ) -> Result<AgentStatusRecord, StoreError> {
            self.check()?;
            self.statuses
                .lock()
                .insert(agent_id.to_string(), status.to_string());
            Ok(AgentStatusRecord {
                agent_id: agent_id.to_string(),
                status: status.to_string(),
                updated_at: Utc::now(),
            })
        }
    }

    fn test_hub(store: Arc<MockStore>) -> Arc<TelemetryHub> {
        TelemetryHub::new(store, 32)
    }

    async fn register(
        hub: &TelemetryHub,
        conn_id: ConnectionId,
        agent_id: Option<&str>,
    ) -> Option<ServerMessage> {
        hub.handle_envelope(
            conn_id,
            Envelope::Register {
                agent_id: agent_id.map(|s| s.to_string()),
                session_id: None,
            },
        )
        .await
    }

    #[tokio::test]
    async fn test_register_reply() {
        let hub = test_hub(MockStore::new());
        let (conn, _rx) = hub.connect().await.unwrap();

        let reply = register(&hub, conn, Some("1")).await;
        assert!(matches!(
            reply,
            Some(ServerMessage::Registered { success: true })
        ));
    }

    #[tokio::test]
    async fn test_trace_fanout_scenario() {
        // A filters on agent 1, B is global, C filters on agent 2.
        let hub = test_hub(MockStore::new());
        let (conn_a, mut rx_a) = hub.connect().await.unwrap();
        let (conn_b, mut rx_b) = hub.connect().await.unwrap();
        let (conn_c, mut rx_c) = hub.connect().await.unwrap();
        let (sender_conn, _rx_s) = hub.connect().await.unwrap();

        register(&hub, conn_a, Some("1")).await;
        register(&hub, conn_b, None).await;
        register(&hub, conn_c, Some("2")).await;
        // Drain register replies; they go straight back, not via queues
        assert!(rx_a.try_recv().is_err());

        let envelope = decode(
            r#"{"type":"trace","agentId":"1","action":"search_web","tokensUsed":500}"#,
        )
        .unwrap();
        let reply = hub.handle_envelope(sender_conn, envelope).await;

        // Sender gets the store-assigned id
        let saved_id = match reply {
            Some(ServerMessage::TraceSaved { id }) => id,
            other => panic!("unexpected reply: {:?}", other),
        };

        // A and B each receive exactly one trace broadcast
        for rx in [&mut rx_a, &mut rx_b] {
            match rx.try_recv() {
                Ok(ServerMessage::Trace { data }) => {
                    assert_eq!(data.id, saved_id);
                    assert_eq!(data.agent_id, "1");
                    assert_eq!(data.tokens_used, 500);
                }
                other => panic!("expected trace broadcast, got {:?}", other),
            }
            assert!(rx.try_recv().is_err());
        }

        // C is scoped to agent 2 and receives nothing
        assert!(rx_c.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_store_failure_reply_and_no_broadcast() {
        let store = MockStore::new();
        let hub = test_hub(store.clone());
        let (observer, mut rx_observer) = hub.connect().await.unwrap();
        let (sender_conn, _rx_s) = hub.connect().await.unwrap();
        register(&hub, observer, None).await;

        store.set_failing(true);
        let envelope =
            decode(r#"{"type":"trace","agentId":"1","action":"search_web"}"#).unwrap();
        let reply = hub.handle_envelope(sender_conn, envelope).await;

        // Exactly one error reply to the sender, zero broadcasts
        assert!(matches!(reply, Some(ServerMessage::Error { .. })));
        assert!(rx_observer.try_recv().is_err());
        assert_eq!(hub.metrics().snapshot().store_errors, 1);
    }

    #[tokio::test]
    async fn test_heartbeat_defaults_status_to_running() {
        let store = MockStore::new();
        let hub = test_hub(store.clone());
        let (observer, mut rx_observer) = hub.connect().await.unwrap();
        let (sender_conn, _rx_s) = hub.connect().await.unwrap();
        register(&hub, observer, None).await;

        let envelope = decode(r#"{"type":"heartbeat","agentId":"3"}"#).unwrap();
        let reply = hub.handle_envelope(sender_conn, envelope).await;

        // Heartbeats have no success reply
        assert!(reply.is_none());
        assert_eq!(
            store.statuses.lock().get("3").map(|s| s.as_str()),
            Some("running")
        );
        match rx_observer.try_recv() {
            Ok(ServerMessage::AgentStatus { data }) => {
                assert_eq!(data.agent_id, "3");
                assert_eq!(data.status, "running");
            }
            other => panic!("expected agent_status broadcast, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_per_connection_submission_order() {
        let hub = test_hub(MockStore::new());
        let (observer, mut rx_observer) = hub.connect().await.unwrap();
        let (sender_conn, _rx_s) = hub.connect().await.unwrap();
        register(&hub, observer, Some("1")).await;

        for raw in [
            r#"{"type":"trace","agentId":"1","action":"a"}"#,
            r#"{"type":"metric","agentId":"1","name":"m","value":1.0}"#,
            r#"{"type":"decision","agentId":"1","decisionType":"tactical"}"#,
        ] {
            hub.handle_envelope(sender_conn, decode(raw).unwrap()).await;
        }

        assert!(matches!(
            rx_observer.try_recv(),
            Ok(ServerMessage::Trace { .. })
        ));
        assert!(matches!(
            rx_observer.try_recv(),
            Ok(ServerMessage::Metric { .. })
        ));
        assert!(matches!(
            rx_observer.try_recv(),
            Ok(ServerMessage::Decision { .. })
        ));
    }

    #[tokio::test]
    async fn test_reregister_visible_to_next_broadcast() {
        let hub = test_hub(MockStore::new());
        let (conn, mut rx) = hub.connect().await.unwrap();
        let (sender_conn, _rx_s) = hub.connect().await.unwrap();
        register(&hub, conn, Some("1")).await;

        let for_agent_1 =
            || decode(r#"{"type":"metric","agentId":"1","name":"m","value":1.0}"#).unwrap();
        let for_agent_2 =
            || decode(r#"{"type":"metric","agentId":"2","name":"m","value":1.0}"#).unwrap();

        hub.handle_envelope(sender_conn, for_agent_1()).await;
        assert!(rx.try_recv().is_ok());

        // Replace the filter; the very next broadcast observes it
        register(&hub, conn, Some("2")).await;
        hub.handle_envelope(sender_conn, for_agent_1()).await;
        assert!(rx.try_recv().is_err());
        hub.handle_envelope(sender_conn, for_agent_2()).await;
        assert!(matches!(rx.try_recv(), Ok(ServerMessage::Metric { .. })));
    }

    #[tokio::test]
    async fn test_memory_snapshot_broadcast() {
        let hub = test_hub(MockStore::new());
        let (observer, mut rx) = hub.connect().await.unwrap();
        let (sender_conn, _rx_s) = hub.connect().await.unwrap();
        register(&hub, observer, None).await;

        let envelope = decode(
            r#"{"type":"memory_snapshot","agentId":"1","totalMemory":1024,"usedMemory":256,"contextWindow":4000,"maxContextWindow":128000}"#,
        )
        .unwrap();
        let reply = hub.handle_envelope(sender_conn, envelope).await;

        assert!(reply.is_none());
        match rx.try_recv() {
            Ok(ServerMessage::MemorySnapshot { data }) => {
                assert_eq!(data.used_memory, 256);
                assert!(!data.id.is_empty());
            }
            other => panic!("expected memory_snapshot broadcast, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_duplicate_disconnect_is_harmless() {
        let hub = test_hub(MockStore::new());
        let (conn_a, _rx_a) = hub.connect().await.unwrap();
        let (_conn_b, mut rx_b) = hub.connect().await.unwrap();

        hub.disconnect(conn_a).await;
        hub.disconnect(conn_a).await;
        assert_eq!(hub.active_connections().await, 1);

        // The other connection still receives broadcasts
        hub.broadcast(
            ServerMessage::Registered { success: true },
            BroadcastScope::Global,
        )
        .await;
        assert!(rx_b.try_recv().is_ok());
        assert_eq!(hub.metrics().snapshot().connections_closed, 1);
    }

    #[tokio::test]
    async fn test_shutdown_refuses_new_connections() {
        let hub = test_hub(MockStore::new());
        let (_conn, mut rx) = hub.connect().await.unwrap();

        hub.shutdown().await;

        assert!(hub.connect().await.is_none());
        assert_eq!(hub.active_connections().await, 0);
        // Queue closed: the connection task would observe None and exit
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn test_full_queue_drops_silently() {
        let store = MockStore::new();
        let hub = TelemetryHub::new(store, 1);
        let (observer, _rx) = hub.connect().await.unwrap();
        register(&hub, observer, None).await;

        hub.broadcast(
            ServerMessage::Registered { success: true },
            BroadcastScope::Global,
        )
        .await;
        hub.broadcast(
            ServerMessage::Registered { success: true },
            BroadcastScope::Global,
        )
        .await;

        let snapshot = hub.metrics().snapshot();
        assert_eq!(snapshot.messages_sent, 1);
        assert_eq!(snapshot.messages_dropped, 1);
    }
}
