//! Provider trait and common types

use crate::error::ProviderError;
use async_trait::async_trait;
use savepoint_foundation::{MessageLength, MessageStyle};
use serde::{Deserialize, Serialize};

/// Model information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model ID (e.g., "claude-3-5-haiku-20241022")
    pub id: String,

    /// Provider id (e.g., "claude")
    pub provider: String,

    /// Display name
    pub display_name: String,
}

impl ModelInfo {
    pub fn new(id: impl Into<String>, provider: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            provider: provider.into(),
        }
    }
}

/// Identity and selection state of a provider, as shown to the host UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Provider id (e.g., "claude")
    pub id: String,

    /// Display name (e.g., "Claude")
    pub display_name: String,

    /// Participates in selection and fallback
    pub enabled: bool,

    /// Currently selected provider
    pub active: bool,

    /// Resolved model: global override > provider setting > provider default
    pub model: String,
}

/// Options for one message generation request
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Message style; `Custom` hands full control to the instructions
    pub style: MessageStyle,

    /// Target length
    pub length: MessageLength,

    /// Custom instructions; with style = custom they replace the
    /// structural rules entirely
    pub custom_instructions: Option<String>,

    /// Ask for a leading emoji
    pub use_emojis: bool,

    /// Resolved model id
    pub model: String,
}

/// A commit message generation backend.
///
/// Implemented by the tagged set of vendors {Claude, OpenAI, Copilot};
/// dispatch is by id, not structural typing.
#[async_trait]
pub trait ProviderBackend: Send + Sync {
    /// Stable provider id
    fn id(&self) -> &'static str;

    /// Display name
    fn display_name(&self) -> &'static str;

    /// Model used when neither a global nor a provider model is set
    fn default_model(&self) -> &'static str;

    /// Whether this provider can serve a request right now
    /// (credentials present, CLI binary locatable)
    async fn is_available(&self) -> bool;

    /// Turn a staged diff into a commit message. Output is raw provider
    /// text; normalization happens in the generator.
    async fn generate_commit_message(
        &self,
        diff: &str,
        options: &GenerateOptions,
    ) -> Result<String, ProviderError>;

    /// Known models, for the model picker. Optional.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        Ok(Vec::new())
    }
}
