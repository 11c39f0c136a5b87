use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GuardError>;

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidConfig {
        key: String,
        value: String,
        reason: String,
    },

    #[error("failed to parse guard config")]
    ConfigParse {
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to read guard config {path:?}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("sigaction(SIGSYS) failed: {source}")]
    SignalAction {
        #[source]
        source: std::io::Error,
    },
}
