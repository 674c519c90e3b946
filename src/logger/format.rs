//! Log formatting and console output with ANSI colors
//!
//! Handles colorized output with aligned tag and level columns and a
//! dimmed timestamp prefix. Broken pipes (piped commands) are swallowed
//! instead of panicking.
use super::tags::LogTag;
use chrono::Local;
use colored::*;
use std::io::{stdout, ErrorKind, Write};

/// Format and output a log message
pub fn format_and_log(tag: LogTag, log_type: &str, message: &str) {
    let now = Local::now();
    let time = now.format("%H:%M:%S").to_string();
    let prefix = format!("{} ", time).dimmed().to_string();

    let tag_str = tag.to_colored_string();
    let log_type_str = format_log_type(log_type);

    let line = format!("{}[{}] [{}] {}", prefix, tag_str, log_type_str, message);
    print_stdout_safe(&line);
}

/// Colorize the level column
fn format_log_type(log_type: &str) -> String {
    match log_type {
        "ERROR" => log_type.red().bold().to_string(),
        "WARNING" | "WARN" => log_type.yellow().bold().to_string(),
        "INFO" => log_type.bright_white().to_string(),
        "DEBUG" => log_type.purple().to_string(),
        "READY" => log_type.green().bold().to_string(),
        other => other.normal().to_string(),
    }
}

/// Print to stdout, tolerating broken pipes
fn print_stdout_safe(line: &str) {
    let mut out = stdout();
    if let Err(e) = writeln!(out, "{}", line) {
        if e.kind() == ErrorKind::BrokenPipe {
            return;
        }
    }
    let _ = out.flush();
}
