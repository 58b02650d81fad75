//! Error types for termlint-core.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur when working with configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors reported by a segmentation or embedding backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The backend failed to respond or produce a result.
    #[error("{service} unavailable: {message}")]
    Unavailable {
        /// Which service failed (`segmentation` or `embedding`).
        service: &'static str,
        /// Backend-provided detail.
        message: String,
    },
}

impl ServiceError {
    /// Shorthand for a segmentation backend failure.
    pub fn segmentation(message: impl Into<String>) -> Self {
        Self::Unavailable {
            service: "segmentation",
            message: message.into(),
        }
    }

    /// Shorthand for an embedding backend failure.
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Unavailable {
            service: "embedding",
            message: message.into(),
        }
    }
}

/// Result type alias using [`ServiceError`].
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors that abort a matching run.
#[derive(Error, Debug)]
pub enum MatchError {
    /// A matching option is out of range. Raised before any matching starts.
    #[error("invalid configuration: {field} {reason}")]
    InvalidConfig {
        /// Name of the offending option.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A backend failed and the run is configured to abort on service errors.
    #[error("{service} service unavailable: {message}")]
    ServiceUnavailable {
        /// Which service failed.
        service: &'static str,
        /// Backend-provided detail.
        message: String,
    },
}

impl From<ServiceError> for MatchError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable { service, message } => {
                Self::ServiceUnavailable { service, message }
            }
        }
    }
}

/// Result type alias using [`MatchError`].
pub type MatchResult<T> = Result<T, MatchError>;

/// Errors from reading phrase lists or writing reports.
#[derive(Error, Debug)]
pub enum InputError {
    /// A file could not be read or written.
    #[error("failed to access {path}: {source}")]
    Io {
        /// The path involved.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Malformed CSV, or a CSV write failure.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unrecognized report format name.
    #[error("unknown report format: {0}. Use: csv, json")]
    UnknownFormat(String),
}

/// Result type alias using [`InputError`].
pub type InputResult<T> = Result<T, InputError>;
