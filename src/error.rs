//! Error types for the Lookout gateway

use thiserror::Error;

/// Result type alias for Lookout operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Lookout gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Capture device missing, vanished, or failed to initialize.
    /// Non-fatal to a session: the pipeline proceeds image-less.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Image encoding or persistence failure.
    /// Non-fatal to a session: treated identically to the image-less case.
    #[error("encode error: {0}")]
    Encode(String),

    /// Face analysis service failure (transport, status, or decode).
    /// Non-fatal to a session: treated as zero detected faces.
    #[error("analysis error: {0}")]
    Analysis(String),

    /// Host-initiated session cancellation
    #[error("session cancelled")]
    Cancelled,

    /// Assistant host protocol error
    #[error("host error: {0}")]
    Host(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
