// src/error.rs

//! Unified error handling for the crawler application.

use std::fmt;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Feed XML could not be read
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// MongoDB driver error
    #[cfg(feature = "mongo")]
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Bulk feed could not be downloaded or decoded
    #[error("Feed error: {0}")]
    Feed(String),

    /// A response or record did not have the expected structure
    #[error("Unexpected shape in {context}: {message}")]
    Shape { context: String, message: String },

    /// Persistence backend rejected an operation
    #[error("Store error: {0}")]
    Store(String),
}

/// Coarse classification of a per-item failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Transport failure or non-success status
    Network,
    /// Body could not be decoded
    Parse,
    /// Body decoded but lacked the expected fields
    Shape,
    /// Persistence backend failure
    Store,
    /// Anything else (configuration, feed)
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Network => "network",
            FailureKind::Parse => "parse",
            FailureKind::Shape => "shape",
            FailureKind::Store => "store",
            FailureKind::Other => "other",
        };
        f.write_str(name)
    }
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a feed error.
    pub fn feed(message: impl fmt::Display) -> Self {
        Self::Feed(message.to_string())
    }

    /// Create a shape error with context.
    pub fn shape(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Shape {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a store error.
    pub fn store(message: impl fmt::Display) -> Self {
        Self::Store(message.to_string())
    }

    /// Classify this error for per-item failure accounting.
    pub fn kind(&self) -> FailureKind {
        match self {
            AppError::Http(e) if e.is_decode() => FailureKind::Parse,
            AppError::Http(_) | AppError::Status { .. } => FailureKind::Network,
            AppError::Json(_) | AppError::Xml(_) | AppError::Toml(_) | AppError::Url(_) => {
                FailureKind::Parse
            }
            AppError::Shape { .. } => FailureKind::Shape,
            AppError::Io(_) | AppError::Store(_) => FailureKind::Store,
            #[cfg(feature = "mongo")]
            AppError::Mongo(_) => FailureKind::Store,
            AppError::Config(_) | AppError::Validation(_) | AppError::Feed(_) => {
                FailureKind::Other
            }
        }
    }

    /// Whether this error should end the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Config(_) | AppError::Validation(_) | AppError::Feed(_)
        )
    }
}
