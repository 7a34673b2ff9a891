//! Error types for Vantage.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for Vantage operations.
#[derive(Error, Debug)]
pub enum VantageError {
    /// Malformed input (unparsable parameter bindings, bad CLI values, etc.)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Caller or target lacks the rights for the requested operation.
    #[error("Permission error: {0}")]
    Permission(String),

    /// Unknown or inactive query configuration or user.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The query itself failed at run time (bad field reference, access denial).
    #[error("Execution error: {0}")]
    Execution(String),

    /// Poll attempt cap exceeded without a terminal state.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Transport-level gateway errors (endpoint unreachable, non-2xx, bad JSON).
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl VantageError {
    /// Creates a validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a permission error with the given message.
    pub fn permission(msg: impl Into<String>) -> Self {
        Self::Permission(msg.into())
    }

    /// Creates a not-found error with the given message.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Creates a timeout error with the given message.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Creates a gateway error with the given message.
    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::Gateway(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Validation Error",
            Self::Permission(_) => "Permission Error",
            Self::NotFound(_) => "Not Found",
            Self::Execution(_) => "Execution Error",
            Self::Timeout(_) => "Timeout",
            Self::Gateway(_) => "Gateway Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using VantageError.
pub type Result<T> = std::result::Result<T, VantageError>;
