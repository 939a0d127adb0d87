//! Centralized error types for Nimbus.
//!
//! Each service crate keeps its own precise error enum; everything that reaches
//! the screen is converted into [`AppError`] first so the UI has a single place
//! to pull user-facing text from.

use thiserror::Error;

/// Top-level application error type.
///
/// Use `user_message()` for a short, non-technical hint and `Display` for the
/// detailed message.
#[derive(Debug, Error)]
pub enum AppError {
    /// Location failures abort the whole fetch cycle.
    #[error("{0}")]
    Location(String),

    #[error("Geocode Error: {0}")]
    Geocode(String),

    #[error("Weather Error: {0}")]
    Weather(String),
}

impl AppError {
    /// Returns a user-friendly message suitable for display in the UI.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Location(_) => "Your location could not be determined. Pull to refresh to retry.",
            AppError::Geocode(_) => "The place name for your location is unavailable.",
            AppError::Weather(_) => "The forecast is unavailable. Pull to refresh to retry.",
        }
    }

    /// True if the error stops the whole fetch cycle rather than a single panel.
    pub fn aborts_cycle(&self) -> bool {
        matches!(self, AppError::Location(_))
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}
