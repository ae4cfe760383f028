//! Error types and handling for Tarifa
//!
//! This module defines the error type used throughout the crate. Upstream
//! failures arrive pre-classified (rate-limited, unauthorized, network,
//! other) and keep that classification all the way to the caller.

use thiserror::Error;

/// Result type alias for Tarifa operations
pub type Result<T> = std::result::Result<T, TarifaError>;

/// Classification of a failed upstream request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Daily quota exhausted; retry tomorrow
    RateLimited,
    /// Token rejected or missing
    Unauthorized,
    /// Transport-level failure
    Network,
    /// Anything else the provider returned
    Other,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate-limited",
            Self::Unauthorized => "unauthorized",
            Self::Network => "network",
            Self::Other => "other",
        }
    }
}

/// Main error type for Tarifa
#[derive(Debug, Error)]
pub enum TarifaError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Upstream refused the request because the daily quota is spent
    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    /// Upstream rejected the credentials
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Network-related errors
    #[error("Network error: {message}")]
    Network { message: String },

    /// Unclassified upstream API errors
    #[error("API error: {message}")]
    Api { message: String },

    /// Local cache errors (never fatal to a retrieval)
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl TarifaError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        TarifaError::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        TarifaError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        TarifaError::Io {
            message: message.into(),
        }
    }

    /// Create a new rate-limit error
    pub fn rate_limited<S: Into<String>>(message: S) -> Self {
        TarifaError::RateLimited {
            message: message.into(),
        }
    }

    /// Create a new unauthorized error
    pub fn unauthorized<S: Into<String>>(message: S) -> Self {
        TarifaError::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        TarifaError::Network {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        TarifaError::Api {
            message: message.into(),
        }
    }

    /// Create a new cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        TarifaError::Cache {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        TarifaError::Generic {
            message: message.into(),
        }
    }

    /// Build an upstream error of the given kind
    pub fn upstream<S: Into<String>>(kind: FailureKind, message: S) -> Self {
        match kind {
            FailureKind::RateLimited => Self::rate_limited(message),
            FailureKind::Unauthorized => Self::unauthorized(message),
            FailureKind::Network => Self::network(message),
            FailureKind::Other => Self::api(message),
        }
    }

    /// Upstream failure classification, `None` for local errors
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            TarifaError::RateLimited { .. } => Some(FailureKind::RateLimited),
            TarifaError::Unauthorized { .. } => Some(FailureKind::Unauthorized),
            TarifaError::Network { .. } => Some(FailureKind::Network),
            TarifaError::Api { .. } => Some(FailureKind::Other),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.failure_kind() == Some(FailureKind::RateLimited)
    }
}

impl From<std::io::Error> for TarifaError {
    fn from(err: std::io::Error) -> Self {
        TarifaError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for TarifaError {
    fn from(err: serde_yaml::Error) -> Self {
        TarifaError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for TarifaError {
    fn from(err: serde_json::Error) -> Self {
        TarifaError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for TarifaError {
    fn from(err: reqwest::Error) -> Self {
        TarifaError::network(err.to_string())
    }
}

impl From<chrono::ParseError> for TarifaError {
    fn from(err: chrono::ParseError) -> Self {
        TarifaError::validation("datetime", err.to_string().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = TarifaError::config("test config error");
        assert!(matches!(err, TarifaError::Config { .. }));

        let err = TarifaError::rate_limited("quota");
        assert!(matches!(err, TarifaError::RateLimited { .. }));

        let err = TarifaError::validation("field", "test validation error");
        assert!(matches!(err, TarifaError::Validation { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = TarifaError::config("test error");
        let error_string = format!("{}", err);
        assert_eq!(error_string, "Configuration error: test error");

        let err = TarifaError::validation("test_field", "invalid value");
        let error_string = format!("{}", err);
        assert_eq!(error_string, "Validation error: test_field - invalid value");
    }

    #[test]
    fn test_failure_kind_mapping() {
        for kind in [
            FailureKind::RateLimited,
            FailureKind::Unauthorized,
            FailureKind::Network,
            FailureKind::Other,
        ] {
            assert_eq!(TarifaError::upstream(kind, "x").failure_kind(), Some(kind));
        }
        assert_eq!(TarifaError::cache("full").failure_kind(), None);
        assert_eq!(TarifaError::io("disk").failure_kind(), None);
    }
}
