pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod relay;
pub mod routes;

use std::sync::Arc;

use config::Config;
use relay::router::Relay;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    pub config: Arc<Config>,
}
