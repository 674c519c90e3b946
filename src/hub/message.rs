//! Outbound message schema
//!
//! Everything the hub sends to a client takes one of these forms: a
//! direct reply to the originating connection (`registered`,
//! `trace_saved`, `error`) or a broadcast frame `{type, data}` carrying
//! a persisted or derived record.
use serde::Serialize;

use crate::store::models::{
    AgentStatusRecord, DecisionRecord, MemorySnapshotRecord, MetricRecord, TraceRecord,
};

/// Server-to-client messages
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Reply to a register envelope (sender only)
    Registered { success: bool },

    /// Reply carrying the store-assigned trace id (sender only)
    TraceSaved { id: String },

    /// Error reply (sender only; observers never see failed writes)
    Error { message: String },

    // Broadcast forms: persisted/derived records fanned out to matching
    // subscribers
    Trace { data: TraceRecord },
    Metric { data: MetricRecord },
    Decision { data: DecisionRecord },
    MemorySnapshot { data: MemorySnapshotRecord },
    AgentStatus { data: AgentStatusRecord },
}

impl ServerMessage {
    /// Serialize to JSON text for the wire
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Tag string, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Registered { .. } => "registered",
            ServerMessage::TraceSaved { .. } => "trace_saved",
            ServerMessage::Error { .. } => "error",
            ServerMessage::Trace { .. } => "trace",
            ServerMessage::Metric { .. } => "metric",
            ServerMessage::Decision { .. } => "decision",
            ServerMessage::MemorySnapshot { .. } => "memory_snapshot",
            ServerMessage::AgentStatus { .. } => "agent_status",
        }
    }
}

/// Broadcast scope: everything, or one agent's stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastScope {
    Global,
    Agent(String),
}

impl BroadcastScope {
    pub fn agent_id(&self) -> Option<&str> {
        match self {
            BroadcastScope::Global => None,
            BroadcastScope::Agent(id) => Some(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_registered_reply_shape() {
        let json = ServerMessage::Registered { success: true }.to_json().unwrap();
        assert_eq!(json, r#"{"type":"registered","success":true}"#);
    }

    #[test]
    fn test_trace_saved_reply_shape() {
        let json = ServerMessage::TraceSaved {
            id: "abc".to_string(),
        }
        .to_json()
        .unwrap();
        assert_eq!(json, r#"{"type":"trace_saved","id":"abc"}"#);
    }

    #[test]
    fn test_agent_status_broadcast_shape() {
        let msg = ServerMessage::AgentStatus {
            data: AgentStatusRecord {
                agent_id: "3".to_string(),
                status: "running".to_string(),
                updated_at: Utc::now(),
            },
        };
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "agent_status");
        assert_eq!(value["data"]["agentId"], "3");
        assert_eq!(value["data"]["status"], "running");
    }

    #[test]
    fn test_error_reply_shape() {
        let value: serde_json::Value = serde_json::from_str(
            &ServerMessage::Error {
                message: "Failed to process message".to_string(),
            }
            .to_json()
            .unwrap(),
        )
        .unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["message"], "Failed to process message");
    }
}
