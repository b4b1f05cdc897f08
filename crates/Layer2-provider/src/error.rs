//! Provider-specific error types

use thiserror::Error;

/// Errors that can occur while generating a commit message
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// No enabled provider exists at all
    #[error("No AI provider is enabled")]
    NoProviderConfigured,

    /// Selected provider cannot run (missing credentials or CLI binary)
    #[error("Provider '{provider}' unavailable: {reason}")]
    Unavailable { provider: String, reason: String },

    /// The request lost the race against the timeout
    #[error("Provider '{provider}' timed out after {after_ms}ms")]
    Timeout { provider: String, after_ms: u64 },

    /// Vendor-side failure (HTTP error, CLI non-zero exit, network)
    #[error("Provider '{provider}' request failed: {message}")]
    RequestFailed { provider: String, message: String },

    /// Response arrived but could not be interpreted
    #[error("Provider '{provider}' returned an invalid response: {message}")]
    InvalidResponse { provider: String, message: String },

    /// CLI-backed provider whose executable is not on this machine
    #[error("Executable '{tool}' for provider '{provider}' not found")]
    ExecutableNotFound { provider: String, tool: String },
}

impl ProviderError {
    /// Selection/availability failures happen before any request is made
    /// and are not worth retrying; request-stage failures are.
    pub fn is_request_failure(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout { .. }
                | ProviderError::RequestFailed { .. }
                | ProviderError::InvalidResponse { .. }
        )
    }
}

impl From<ProviderError> for savepoint_foundation::Error {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NoProviderConfigured => {
                savepoint_foundation::Error::ProviderNotFound("none enabled".to_string())
            }
            ProviderError::Timeout { provider, after_ms } => savepoint_foundation::Error::Timeout(
                format!("{} after {}ms", provider, after_ms),
            ),
            other => savepoint_foundation::Error::Provider(other.to_string()),
        }
    }
}
