use crate::{app, config, notify_client, store};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("notify client error: {0}")]
    NotifyClient(#[from] notify_client::Error),
    #[error("store error: {0}")]
    Store(#[from] store::StoreError),
    #[error("serving error: {0}")]
    Serve(#[from] app::serve::ServeError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
