/// Shared application state for the webserver
///
/// Carries the hub reference and startup time into route handlers.
use std::sync::Arc;

use crate::hub::TelemetryHub;

#[derive(Clone)]
pub struct AppState {
    /// Central telemetry hub
    pub hub: Arc<TelemetryHub>,

    /// Server startup time
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(hub: Arc<TelemetryHub>) -> Self {
        Self {
            hub,
            startup_time: chrono::Utc::now(),
        }
    }

    /// Server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        (chrono::Utc::now() - self.startup_time).num_seconds().max(0) as u64
    }
}
