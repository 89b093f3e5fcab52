pub mod app;
pub mod config;
mod error;
pub mod notify_client;
pub mod store;
pub mod web;

pub use app::{serve, App, AppState};
pub use error::{Error, Result};
pub use notify_client::{Notifier, NotifyClient};
pub use store::{MemoryStore, PgStore, SignupStore};

use tracing_subscriber::EnvFilter;

/// Human readable, compact logging used for debug builds and tests.
pub fn init_dbg_tracing() {
    tracing_subscriber::fmt()
        .without_time()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("waitlist=debug,tower_http=debug")),
        )
        .compact()
        .init();
}

/// JSON logging for release builds so log lines can be shipped as-is.
pub fn init_production_tracing() {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("waitlist=info,tower_http=info")),
        )
        .init();
}
