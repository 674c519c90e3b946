//! Persisted record types and their creation inputs
//!
//! Records serialize with camelCase field names because they travel to
//! dashboard clients verbatim inside broadcast frames. Every record
//! except agent status is immutable once created.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ENUMS
// =============================================================================

/// Outcome of a traced action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceStatus {
    #[default]
    Success,
    Error,
    Pending,
}

impl TraceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceStatus::Success => "success",
            TraceStatus::Error => "error",
            TraceStatus::Pending => "pending",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "success" => Some(TraceStatus::Success),
            "error" => Some(TraceStatus::Error),
            "pending" => Some(TraceStatus::Pending),
            _ => None,
        }
    }
}

/// Decision level reported by an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionKind {
    Strategic,
    Tactical,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionKind::Strategic => "strategic",
            DecisionKind::Tactical => "tactical",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "strategic" => Some(DecisionKind::Strategic),
            "tactical" => Some(DecisionKind::Tactical),
            _ => None,
        }
    }
}

// =============================================================================
// TRACES
// =============================================================================

/// Trace creation input (validated fields from a decoded envelope)
#[derive(Debug, Clone)]
pub struct NewTrace {
    pub agent_id: String,
    pub session_id: Option<String>,
    pub action: String,
    pub tool_name: Option<String>,
    pub input: Option<serde_json::Value>,
    pub output: Option<serde_json::Value>,
    pub tokens_used: i64,
    pub cost: f64,
    pub error: Option<String>,
    pub duration_ms: i64,
    pub status: TraceStatus,
}

/// Stored trace with server-assigned id and timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceRecord {
    pub id: String,
    pub agent_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    pub tokens_used: i64,
    pub cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: i64,
    pub status: TraceStatus,
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// METRICS
// =============================================================================

#[derive(Debug, Clone)]
pub struct NewMetric {
    pub agent_id: String,
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricRecord {
    pub agent_id: String,
    pub name: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// DECISIONS
// =============================================================================

#[derive(Debug, Clone)]
pub struct NewDecision {
    pub agent_id: String,
    pub kind: DecisionKind,
    pub reasoning: Option<String>,
    pub result: Option<String>,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRecord {
    pub id: String,
    pub agent_id: String,
    // The wire uses "type"; "decisionType" is only for the inbound
    // envelope where the tag already occupies that key.
    #[serde(rename = "type")]
    pub kind: DecisionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// MEMORY SNAPSHOTS
// =============================================================================

#[derive(Debug, Clone)]
pub struct NewMemorySnapshot {
    pub agent_id: String,
    pub total_memory: i64,
    pub used_memory: i64,
    pub context_window: i64,
    pub max_context_window: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySnapshotRecord {
    pub id: String,
    pub agent_id: String,
    pub total_memory: i64,
    pub used_memory: i64,
    pub context_window: i64,
    pub max_context_window: i64,
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// AGENT STATUS
// =============================================================================

/// Last-write-wins agent status; the hub keeps no history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatusRecord {
    pub agent_id: String,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_record_wire_shape() {
        let record = TraceRecord {
            id: "t-1".to_string(),
            agent_id: "agent-1".to_string(),
            session_id: None,
            action: "search_web".to_string(),
            tool_name: Some("browser".to_string()),
            input: None,
            output: None,
            tokens_used: 500,
            cost: 0.01,
            error: None,
            duration_ms: 1200,
            status: TraceStatus::Success,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["agentId"], "agent-1");
        assert_eq!(json["tokensUsed"], 500);
        assert_eq!(json["status"], "success");
        assert!(json.get("sessionId").is_none());
    }

    #[test]
    fn test_decision_record_uses_type_key() {
        let record = DecisionRecord {
            id: "d-1".to_string(),
            agent_id: "agent-1".to_string(),
            kind: DecisionKind::Strategic,
            reasoning: None,
            result: None,
            success: true,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "strategic");
    }
}
