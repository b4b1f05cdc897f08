//! Copilot provider
//!
//! CLI-only backend over the `copilot` executable; authentication is
//! whatever the CLI's own sign-in state says it is.

use super::{locate_cli, run_cli};
use crate::error::ProviderError;
use crate::prompt::build_prompt;
use crate::r#trait::{GenerateOptions, ModelInfo, ProviderBackend};
use async_trait::async_trait;
use savepoint_foundation::ExecutableLocator;
use tracing::debug;

const CLI_TOOL: &str = "copilot";

/// Copilot commit message backend
pub struct CopilotProvider;

impl CopilotProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CopilotProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderBackend for CopilotProvider {
    fn id(&self) -> &'static str {
        "copilot"
    }

    fn display_name(&self) -> &'static str {
        "GitHub Copilot"
    }

    fn default_model(&self) -> &'static str {
        "gpt-4o"
    }

    async fn is_available(&self) -> bool {
        ExecutableLocator::locate(CLI_TOOL).await.is_some()
    }

    async fn generate_commit_message(
        &self,
        diff: &str,
        options: &GenerateOptions,
    ) -> Result<String, ProviderError> {
        debug!("Generating commit message via Copilot CLI");
        let resolution = locate_cli(self.id(), CLI_TOOL).await?;
        let prompt = build_prompt(diff, options);
        let args = ["-p", prompt.as_str()];
        run_cli(self.id(), &resolution, &args).await
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        // the CLI picks its own model; expose the default for the UI only
        Ok(vec![ModelInfo::new(self.default_model(), self.id())])
    }
}
