//! Error types and handling for ei-insights
//!
//! This module defines the error types used throughout the crate, giving
//! every step of the login walk and data fetch a consistent failure shape.

use thiserror::Error;

/// Result type alias for ei-insights operations
pub type Result<T> = std::result::Result<T, InsightsError>;

/// Main error type for ei-insights
#[derive(Debug, Error)]
pub enum InsightsError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Transport failures and non-success HTTP statuses
    #[error("Network error: {message}")]
    Network { message: String },

    /// Usage API answered but reported a failure or an unexpected shape
    #[error("API error: {message}")]
    Api { message: String },

    /// Login or token exchange rejected
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Expected markup (form field, cookie, script payload) was not found
    #[error("Scrape error: {message}")]
    Scrape { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl InsightsError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new auth error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a new scrape error
    pub fn scrape<S: Into<String>>(message: S) -> Self {
        Self::Scrape {
            message: message.into(),
        }
    }

    /// Create a new serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<F: Into<String>, S: Into<String>>(field: F, message: S) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for InsightsError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for InsightsError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<serde_json::Error> for InsightsError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<reqwest::Error> for InsightsError {
    fn from(err: reqwest::Error) -> Self {
        Self::network(err.to_string())
    }
}

impl From<chrono::ParseError> for InsightsError {
    fn from(err: chrono::ParseError) -> Self {
        Self::validation("datetime", err.to_string())
    }
}

impl From<csv::Error> for InsightsError {
    fn from(err: csv::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = InsightsError::config("test config error");
        assert!(matches!(err, InsightsError::Config { .. }));

        let err = InsightsError::scrape("no rvt cookie");
        assert!(matches!(err, InsightsError::Scrape { .. }));

        let err = InsightsError::validation("field", "test validation error");
        assert!(matches!(err, InsightsError::Validation { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = InsightsError::config("test error");
        assert_eq!(format!("{}", err), "Configuration error: test error");

        let err = InsightsError::validation("account_number", "account_number_exists");
        assert_eq!(
            format!("{}", err),
            "Validation error: account_number - account_number_exists"
        );
    }
}
