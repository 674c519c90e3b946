/// Centralized argument handling for the telemetry hub
///
/// Consolidates command-line argument parsing and debug flag checking so
/// every module gates its diagnostic output the same way.
///
/// Features:
/// - Thread-safe CMD_ARGS storage (overridable in tests)
/// - Per-module debug flags (--debug-hub, --debug-webserver, --debug-store)
/// - Flag/value lookup utilities
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Sets the global command-line arguments
/// Used by tests to override the default env::args() collection
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => env::args().collect(),
    }
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Gets the value following a flag, if any
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    for (i, arg) in args.iter().enumerate() {
        if arg == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

// =============================================================================
// DEBUG FLAG CHECKING FUNCTIONS
// =============================================================================

/// Hub module debug mode (registry, routing, broadcast)
pub fn is_debug_hub_enabled() -> bool {
    has_arg("--debug-hub")
}

/// Webserver module debug mode (connections, upgrades)
pub fn is_debug_webserver_enabled() -> bool {
    has_arg("--debug-webserver")
}

/// Store gateway debug mode (persistence calls)
pub fn is_debug_store_enabled() -> bool {
    has_arg("--debug-store")
}

/// Help requested
pub fn is_help_requested() -> bool {
    has_arg("--help") || has_arg("-h")
}

/// Print command-line help
pub fn print_help() {
    println!("scopehub - agent telemetry ingestion and broadcast hub");
    println!();
    println!("USAGE:");
    println!("  scopehub [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  --config <path>      Config file path (default: config.json)");
    println!("  --debug-hub          Verbose hub diagnostics (routing, broadcast)");
    println!("  --debug-webserver    Verbose webserver diagnostics (connections)");
    println!("  --debug-store        Verbose store gateway diagnostics");
    println!("  -h, --help           Show this help");
}
