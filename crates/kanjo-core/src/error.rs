//! Error types for kanjo

/// Result type alias using kanjo's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for kanjo operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The classification model could not be constructed
    #[error("model initialization error: {0}")]
    ModelInit(String),

    /// The classification model failed or returned an unusable result
    #[error("inference error: {0}")]
    Inference(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new model initialization error
    pub fn model_init(msg: impl Into<String>) -> Self {
        Self::ModelInit(msg.into())
    }

    /// Create a new inference error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short stable name of the error kind, used as a metric label
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ModelInit(_) => "model_init",
            Self::Inference(_) => "inference",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Internal(_) => "internal",
        }
    }
}
