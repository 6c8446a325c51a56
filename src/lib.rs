pub mod api;
pub mod config;
pub mod db;
pub mod startup;

pub use db::DbPool;

use config::Config;

/// Shared state handed to every handler through the router
pub struct AppState {
    pub config: Config,
    pub db: DbPool,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        Self { config, db }
    }
}
