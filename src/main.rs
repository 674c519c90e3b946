use std::sync::Arc;

use scopehub::{
    arguments::{self, is_help_requested, print_help},
    config::{self, Config, DEFAULT_CONFIG_PATH},
    hub::TelemetryHub,
    logger::{self, LogTag},
    store::SqliteStore,
    webserver::{self, state::AppState},
};

/// Main entry point for the telemetry hub
///
/// Loads configuration, opens the store, wires the hub into the
/// webserver, and runs until Ctrl-C. Shutdown stops accepting new
/// connections, lets in-flight store calls complete, and closes all
/// connections before the process exits.
#[tokio::main]
async fn main() {
    if is_help_requested() {
        print_help();
        std::process::exit(0);
    }

    logger::info(LogTag::System, "scopehub starting up...");

    let config_path =
        arguments::get_arg_value("--config").unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let loaded = match Config::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            logger::error(LogTag::Config, &format!("{:#}", e));
            std::process::exit(1);
        }
    };
    config::init(loaded);

    let store = config::with_config(|cfg| SqliteStore::open(&cfg.database.path));
    let store = match store {
        Ok(store) => Arc::new(store),
        Err(e) => {
            logger::error(LogTag::Store, &format!("{:#}", e));
            std::process::exit(1);
        }
    };

    let buffer_size = config::with_config(|cfg| cfg.websocket.client_buffer_size);
    let hub = TelemetryHub::new(store, buffer_size);
    let state = Arc::new(AppState::new(hub));

    // Ctrl-C triggers graceful shutdown
    if let Err(e) = ctrlc::set_handler(webserver::shutdown) {
        logger::warning(
            LogTag::System,
            &format!("failed to install signal handler: {}", e),
        );
    }

    if let Err(e) = webserver::start_server(state).await {
        logger::error(LogTag::Webserver, &format!("{:#}", e));
        std::process::exit(1);
    }

    logger::info(LogTag::System, "scopehub stopped");
}
