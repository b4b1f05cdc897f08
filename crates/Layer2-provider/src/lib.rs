//! # savepoint-provider
//!
//! AI provider abstraction for Savepoint. A closed set of backends
//! {Claude, OpenAI, Copilot} behind one trait, a registry that resolves
//! which backend serves a request, and the message generator that turns a
//! staged diff into a single-line commit message with timeout, retry, and
//! timestamp fallback.

pub mod error;
pub mod generator;
pub mod prompt;
pub mod providers;
pub mod registry;
pub mod retry;
mod r#trait;

pub use error::ProviderError;
pub use generator::{
    fallback_message, normalize_message, truncate_diff, MessageGenerator, MIN_REQUEST_TIMEOUT_MS,
    TRUNCATION_MARKER,
};
pub use providers::{cli_tool, ClaudeProvider, CopilotProvider, OpenAiProvider, ProviderAuth};
pub use r#trait::{GenerateOptions, ModelInfo, ProviderBackend, ProviderDescriptor};
pub use registry::ProviderRegistry;
pub use retry::{with_retry, RetryConfig};
