use thiserror::Error;

/// Top-level error type for Fiscus.
#[derive(Debug, Error)]
pub enum FiscusError {
    /// Error from an AI responder.
    #[error("provider error: {0}")]
    Provider(String),

    /// Exchange-rate lookup error.
    #[error("rate error: {0}")]
    Rate(String),

    /// Transaction categorization error.
    #[error("categorize error: {0}")]
    Categorize(String),

    /// Bank-statement extraction error.
    #[error("statement error: {0}")]
    Statement(String),

    /// Remote calendar mirror error.
    #[error("calendar error: {0}")]
    Calendar(String),

    /// Storage error.
    #[error("store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
