//! Envelope codec for inbound telemetry messages
//!
//! Every inbound frame decodes into exactly one [`Envelope`] variant or a
//! typed [`DecodeError`]. Decoding is pure and synchronous: it never
//! touches the registry or the store, and a failure never tears down the
//! connection. Adding a kind here is a compile-time-checked change since
//! the router matches exhaustively.
use serde::Deserialize;

use crate::errors::DecodeError;
use crate::store::models::{DecisionKind, TraceStatus};

/// Message kinds accepted on the wire
pub const KNOWN_KINDS: &[&str] = &[
    "register",
    "trace",
    "metric",
    "decision",
    "memory_snapshot",
    "heartbeat",
];

/// One inbound telemetry message, tagged by kind
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// Subscription filter update; agentId omitted means "everything"
    #[serde(rename_all = "camelCase")]
    Register {
        #[serde(default)]
        agent_id: Option<String>,
        #[serde(default)]
        session_id: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    Trace {
        agent_id: String,
        #[serde(default)]
        session_id: Option<String>,
        action: String,
        #[serde(default)]
        tool_name: Option<String>,
        #[serde(default)]
        input: Option<serde_json::Value>,
        #[serde(default)]
        output: Option<serde_json::Value>,
        #[serde(default)]
        tokens_used: i64,
        #[serde(default)]
        cost: f64,
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        duration_ms: i64,
        #[serde(default)]
        status: TraceStatus,
    },

    #[serde(rename_all = "camelCase")]
    Metric {
        agent_id: String,
        name: String,
        value: f64,
    },

    // "type" is taken by the envelope tag, so the decision level arrives
    // as "decisionType" (same wire format as the original backend)
    #[serde(rename_all = "camelCase")]
    Decision {
        agent_id: String,
        decision_type: DecisionKind,
        #[serde(default)]
        reasoning: Option<String>,
        #[serde(default)]
        result: Option<String>,
        #[serde(default)]
        success: bool,
    },

    #[serde(rename_all = "camelCase")]
    MemorySnapshot {
        agent_id: String,
        #[serde(default)]
        total_memory: i64,
        #[serde(default)]
        used_memory: i64,
        #[serde(default)]
        context_window: i64,
        #[serde(default)]
        max_context_window: i64,
    },

    #[serde(rename_all = "camelCase")]
    Heartbeat {
        agent_id: String,
        #[serde(default)]
        status: Option<String>,
    },
}

impl Envelope {
    /// Kind string for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::Register { .. } => "register",
            Envelope::Trace { .. } => "trace",
            Envelope::Metric { .. } => "metric",
            Envelope::Decision { .. } => "decision",
            Envelope::MemorySnapshot { .. } => "memory_snapshot",
            Envelope::Heartbeat { .. } => "heartbeat",
        }
    }
}

/// Decode a raw text frame into an envelope
///
/// Distinguishes malformed JSON, a missing tag, an unknown kind, and a
/// kind-specific payload error so the caller can report precisely.
pub fn decode(raw: &str) -> Result<Envelope, DecodeError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let kind = value
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or(DecodeError::MissingType)?;

    if !KNOWN_KINDS.contains(&kind) {
        return Err(DecodeError::UnknownKind(kind.to_string()));
    }

    let kind = kind.to_string();
    serde_json::from_value(value).map_err(|e| DecodeError::InvalidPayload {
        kind,
        reason: e.to_string(),
    })
}
