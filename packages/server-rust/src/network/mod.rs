//! Networking: configuration, connection registry, shutdown control, HTTP
//! handlers and the server lifecycle.

pub mod config;
pub mod connection;
pub mod handlers;
pub mod middleware;
pub mod module;
pub mod shutdown;

pub use config::*;
pub use connection::*;
pub use handlers::{AppState, Services};
pub use module::NetworkModule;
pub use shutdown::*;
