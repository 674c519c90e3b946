//! Structured logging for the telemetry hub
//!
//! Provides a small, ergonomic logging API:
//! - Standard log levels (Error/Warning/Info/Debug)
//! - Per-module debug control via --debug-<module> flags
//! - Colored console output with aligned tags
//!
//! ## Usage
//!
//! ```rust
//! use scopehub::logger::{self, LogTag};
//!
//! logger::info(LogTag::Hub, "connection registered");
//! logger::error(LogTag::Store, "persistence failed");
//! logger::debug(LogTag::Webserver, "frame received"); // only with --debug-webserver
//! ```

mod format;
mod levels;
mod tags;

pub use levels::LogLevel;
pub use tags::LogTag;

use crate::arguments::has_arg;

/// Check if a log message should be displayed
///
/// Rules:
/// 1. Errors are always shown
/// 2. Debug level requires the --debug-<module> flag for that tag
/// 3. Everything else is shown
pub fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    if level == LogLevel::Error {
        return true;
    }
    if level == LogLevel::Debug {
        return has_arg(&format!("--debug-{}", tag.to_debug_key()));
    }
    true
}

/// Log with an explicit level string (READY, etc. allowed for milestones)
pub fn log(tag: LogTag, log_type: &str, message: &str) {
    let level = LogLevel::from_str(log_type).unwrap_or(LogLevel::Info);
    if !should_log(&tag, level) {
        return;
    }
    format::format_and_log(tag, log_type, message);
}

/// Log at ERROR level (always shown)
pub fn error(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level
pub fn warning(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level
pub fn info(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level (requires --debug-<module>)
pub fn debug(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Debug, message);
}

fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&tag, level) {
        return;
    }
    format::format_and_log(tag, level.as_str(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_always_log() {
        assert!(should_log(&LogTag::Hub, LogLevel::Error));
        assert!(should_log(&LogTag::Store, LogLevel::Info));
    }

    #[test]
    fn test_debug_gated_by_flag() {
        // No --debug-config flag set in the test harness
        assert!(!should_log(&LogTag::Config, LogLevel::Debug));
    }
}
