//! Error types for repo-migrate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid source: {0}")]
    InvalidSource(String),

    #[error("invalid project path! [{0}]")]
    InvalidProject(String),

    #[error("{0} is not a valid project!")]
    NotAProject(String),

    #[error("wait_idle called from the worker thread")]
    WaitOnWorker,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad history manifest: {0}")]
    Manifest(#[from] toml::de::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
