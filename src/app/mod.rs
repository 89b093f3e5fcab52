pub mod serve;

// re-export
pub use serve::serve;

use std::{net::SocketAddr, sync::Arc};

use derive_more::Deref;
use tokio::net::TcpListener;
use tracing::info;

use crate::{
    config::{AppConfig, ConfigError, CountView, StoreBackend},
    notify_client::{Notifier, NotifyClient},
    store::{MemoryStore, PgStore, SignupStore},
    Result,
};

// ###################################
// ->  Structs
// ###################################
pub struct App {
    pub app_state: AppState,
    pub listener: TcpListener,
}
impl App {
    pub fn new(app_state: AppState, listener: TcpListener) -> Self {
        App {
            app_state,
            listener,
        }
    }

    /// Builds the store and notifier once and binds the listener.
    pub async fn build_from_config(config: AppConfig) -> Result<Self> {
        let store_config = &config.store_config;
        let store: Arc<dyn SignupStore> = match store_config.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Postgres => {
                let db_config = config
                    .db_config
                    .as_ref()
                    .ok_or(ConfigError::MissingDbConfig)?;
                Arc::new(PgStore::init(db_config, &store_config.table).await?)
            }
        };
        info!(
            "{:<20} - {:?} store, table: {}, region: {}",
            "Store:", store_config.backend, store_config.table, store_config.region
        );

        let notifier = match &config.notify_config {
            Some(notify_config) => {
                let client = NotifyClient::new(
                    &notify_config.url,
                    notify_config.topic.clone(),
                    notify_config.auth_token.clone(),
                    notify_config.timeout(),
                )?;
                info!("{:<20} - topic: {}", "Notifications:", client.topic);
                Some(Arc::new(client) as Arc<dyn Notifier>)
            }
            None => {
                info!("{:<20} - disabled", "Notifications:");
                None
            }
        };

        let app_state = AppState::new(
            store,
            notifier,
            config.count_config.view,
            config.store_config.region,
        );

        let addr = SocketAddr::from((config.net_config.host, config.net_config.app_port));
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        info!("{:<20} - {}", "Listening on:", addr);

        let app = App::new(app_state, listener);
        Ok(app)
    }
}

pub struct InternalState {
    pub store: Arc<dyn SignupStore>,
    pub notifier: Option<Arc<dyn Notifier>>,
    pub count_view: CountView,
    pub region: String,
}

/// Application state containing all global data.
/// It implements `Deref` to easily access the fields on `InternalState`
/// Uses an `Arc` so it can be cloned around.
#[derive(Clone, Deref)]
pub struct AppState(Arc<InternalState>);

impl AppState {
    pub fn new(
        store: Arc<dyn SignupStore>,
        notifier: Option<Arc<dyn Notifier>>,
        count_view: CountView,
        region: String,
    ) -> Self {
        AppState(Arc::new(InternalState {
            store,
            notifier,
            count_view,
            region,
        }))
    }
}
