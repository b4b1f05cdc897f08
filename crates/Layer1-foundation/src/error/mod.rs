//! Error types for Savepoint
//!
//! Central error taxonomy shared by every layer above the foundation.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Savepoint error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Secrets
    // ========================================================================
    #[error("Secret store error: {0}")]
    Secret(String),

    #[error("No credential stored for provider: {0}")]
    SecretNotFound(String),

    // ========================================================================
    // Executable discovery
    // ========================================================================
    #[error("Shell probe failed: {0}")]
    ShellProbe(String),

    // ========================================================================
    // Version control
    // ========================================================================
    #[error("VCS error: {0}")]
    Vcs(String),

    // ========================================================================
    // Provider
    // ========================================================================
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    // ========================================================================
    // Execution
    // ========================================================================
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,

    // ========================================================================
    // General
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // External conversions
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // Misc
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a retry could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout(_) | Error::Provider(_))
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
