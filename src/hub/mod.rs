//! Telemetry ingestion and broadcast hub
//!
//! One persistent WebSocket connection per agent or dashboard client,
//! multiplexing six envelope kinds over a single endpoint.
//!
//! ## Key Components
//! - `envelope`: inbound codec (tagged sum type, typed decode errors)
//! - `message`: outbound reply and broadcast schemas
//! - `registry`: live connections + subscription filters, snapshot reads
//! - `hub`: routing from envelope through store to broadcast fan-out
//! - `metrics`: hub-level counters for monitoring

pub mod envelope;
pub mod hub;
pub mod message;
pub mod metrics;
pub mod registry;

pub use envelope::{decode, Envelope};
pub use hub::TelemetryHub;
pub use message::{BroadcastScope, ServerMessage};
pub use metrics::{HubMetrics, HubMetricsSnapshot};
pub use registry::{ConnectionId, ConnectionRegistry, SubscriptionFilter};
