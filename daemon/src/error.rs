use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] tsl_store_lmdb::LmdbError),

    #[error(transparent)]
    Resolution(#[from] tsl_resolution::ResolutionError),

    #[error("sweeper task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<toml::de::Error> for DaemonError {
    fn from(e: toml::de::Error) -> Self {
        DaemonError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for DaemonError {
    fn from(e: toml::ser::Error) -> Self {
        DaemonError::Config(e.to_string())
    }
}

impl From<tsl_types::TypesError> for DaemonError {
    fn from(e: tsl_types::TypesError) -> Self {
        DaemonError::Config(e.to_string())
    }
}
