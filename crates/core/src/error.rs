use std::io;
use std::path::PathBuf;

/// Errors that can occur during wasm-runner operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Build failed:\n{0}")]
    BuildFailed(String),

    #[error("Prebuilt test bundle is missing or unreadable: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("WebDriver unavailable: {0}")]
    DriverUnavailable(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for wasm-runner operations
pub type Result<T> = std::result::Result<T, Error>;
