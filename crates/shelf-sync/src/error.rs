//! # Sync Error Types
//!
//! ## Failure Taxonomy
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  Transport errors   │ connection drop/error on the push channel -   │
//! │                     │ recovered internally by ChannelClient via     │
//! │                     │ reconnect, never surfaced to callers          │
//! ├─────────────────────┼───────────────────────────────────────────────┤
//! │  Decode errors      │ malformed frame - logged and dropped, never   │
//! │                     │ fatal, never reaches the event handler        │
//! ├─────────────────────┼───────────────────────────────────────────────┤
//! │  Request failures   │ CRUD call non-success (ApiError) - surfaced   │
//! │                     │ to the initiating flow as a typed signal;     │
//! │                     │ the controller never returns errors across    │
//! │                     │ its public boundary                           │
//! ├─────────────────────┼───────────────────────────────────────────────┤
//! │  Config errors      │ SyncError - the only errors a caller handles  │
//! │                     │ directly, at construction time                │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

// =============================================================================
// Sync Error
// =============================================================================

/// Errors from configuration and client construction.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A URL could not be parsed or has the wrong scheme.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to load the config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save the config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    /// HTTP client construction failed.
    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

// =============================================================================
// API Error
// =============================================================================

/// Result type alias for CRUD API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// A non-success outcome of a CRUD request.
///
/// These never cross the controller's public boundary directly; the
/// controller folds them into signals (load-failed, save-failed, ...)
/// and recovers with a reload or a user notification.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP 400 with per-field validation messages.
    #[error("Validation failed: {}", format_field_errors(.0))]
    Validation(HashMap<String, String>),

    /// HTTP 404 - the entity is gone on the server.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success status.
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// Network-level failure (DNS, refused connection, timeout, ...).
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not the JSON we expected.
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Field-level validation messages, if this is a validation failure.
    pub fn field_errors(&self) -> Option<&HashMap<String, String>> {
        match self {
            ApiError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

fn format_field_errors(errors: &HashMap<String, String>) -> String {
    let mut fields: Vec<&str> = errors.keys().map(String::as_str).collect();
    fields.sort_unstable();
    fields.join(", ")
}
