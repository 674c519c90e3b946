mod server;

pub mod routes;
pub mod state;

// Public API for starting/stopping the webserver
pub use server::{shutdown, start_server};
