//! Builds the `AppConfig` with `figment`.
//!
//! Sources are merged in order, later ones overriding earlier ones:
//! `config/base.toml`, `config/{APP_ENVIRONMENT}.toml`, `APP_`-prefixed environment
//! variables (`__` separates nested keys), the flat deployment variables
//! (`STORE_TABLE`, `STORE_REGION`, `NOTIFY_*`) and in production `DATABASE_URL`.

mod error;
mod types;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use tracing::info;

pub use error::{ConfigError, ConfigResult};
pub use types::{
    AppConfig, CountConfig, CountView, DbConfig, Environment, NetConfig, NotifyConfig,
    SslRequire, StoreBackend, StoreConfig,
};

pub const CONFIG_DIR: &str = "config";

impl AppConfig {
    /// Loads the configuration for the environment named by `APP_ENVIRONMENT` (defaults to `local`).
    pub fn load() -> ConfigResult<Self> {
        let environment: Environment = std::env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "local".into())
            .try_into()?;

        Self::load_for(environment)
    }

    pub fn load_for(environment: Environment) -> ConfigResult<Self> {
        info!(
            "{:<20} - Initializing the configuration for: {}",
            "load_config",
            environment.as_ref()
        );

        let mut config: AppConfig = Self::figment(environment).extract()?;

        if environment == Environment::Production {
            if let Ok(database_url) = std::env::var("DATABASE_URL") {
                config.db_config = Some(DbConfig::try_from(database_url.as_str())?);
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn figment(environment: Environment) -> Figment {
        let environment_file = format!(
            "{CONFIG_DIR}/{}.toml",
            environment.as_ref().to_lowercase()
        );

        Figment::new()
            .merge(Toml::file(format!("{CONFIG_DIR}/base.toml")))
            .merge(Toml::file(environment_file))
            .merge(Env::prefixed("APP_").split("__"))
            .merge(Env::raw().filter_map(|key| {
                let mapped = match key.as_str().to_ascii_uppercase().as_str() {
                    "STORE_TABLE" => "store_config.table",
                    "STORE_REGION" => "store_config.region",
                    "NOTIFY_TOPIC" => "notify_config.topic",
                    "NOTIFY_URL" => "notify_config.url",
                    "NOTIFY_AUTH_TOKEN" => "notify_config.auth_token",
                    _ => return None,
                };
                Some(mapped.into())
            }))
    }
}
