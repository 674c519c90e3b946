//! SCOPE telemetry hub library
//!
//! Ingests execution telemetry from autonomous-agent processes over
//! persistent WebSocket connections, persists it through the store
//! gateway, and fans it out to subscribed observers in real time.

pub mod arguments;
pub mod config;
pub mod errors;
pub mod hub;
pub mod logger;
pub mod store;
pub mod webserver;
