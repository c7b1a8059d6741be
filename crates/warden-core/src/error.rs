use thiserror::Error;

/// Top-level error type for Warden.
#[derive(Debug, Error)]
pub enum WardenError {
    /// Error from the messaging transport.
    #[error("channel error: {0}")]
    Channel(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// A duration token that does not match `<n><m|h|d|w>`.
    #[error("invalid duration: {0:?}")]
    InvalidDuration(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
