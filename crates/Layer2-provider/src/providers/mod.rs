//! Provider implementations
//!
//! The tagged vendor set. Claude and OpenAI speak HTTP when an API key is
//! present and fall back to their vendor CLIs under cli-login auth;
//! Copilot is CLI-only.

pub mod claude;
pub mod copilot;
pub mod openai;

pub use claude::ClaudeProvider;
pub use copilot::CopilotProvider;
pub use openai::OpenAiProvider;

use crate::error::ProviderError;
use savepoint_foundation::{ExecutableLocator, ExecutableResolution};
use tracing::debug;

/// CLI tool name backing each provider's cli-login mode
pub fn cli_tool(provider_id: &str) -> Option<&'static str> {
    match provider_id {
        "claude" => Some("claude"),
        "openai" => Some("codex"),
        "copilot" => Some("copilot"),
        _ => None,
    }
}

/// Resolved authentication for a provider instance
#[derive(Debug, Clone)]
pub enum ProviderAuth {
    /// API key from the secret store or environment; `None` when nothing
    /// is stored, which makes the provider unavailable
    ApiKey(Option<String>),

    /// Authenticated vendor CLI located on this machine
    CliLogin,
}

/// Locate a vendor CLI, mapping a miss to the provider error space
pub(crate) async fn locate_cli(
    provider: &'static str,
    tool: &'static str,
) -> Result<ExecutableResolution, ProviderError> {
    ExecutableLocator::locate(tool)
        .await
        .ok_or(ProviderError::ExecutableNotFound {
            provider: provider.to_string(),
            tool: tool.to_string(),
        })
}

/// Run a located vendor CLI and capture its stdout.
///
/// The child is killed if the invocation future is dropped, so a timeout
/// race cannot leak orphaned CLI processes.
pub(crate) async fn run_cli(
    provider: &'static str,
    resolution: &ExecutableResolution,
    args: &[&str],
) -> Result<String, ProviderError> {
    debug!(provider, tool = %resolution.path.display(), "Invoking vendor CLI");

    let output = tokio::process::Command::new(&resolution.path)
        .args(args)
        .env("PATH", &resolution.path_env)
        .stdin(std::process::Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ProviderError::RequestFailed {
            provider: provider.to_string(),
            message: format!("failed to run {}: {}", resolution.name, e),
        })?;

    if !output.status.success() {
        return Err(ProviderError::RequestFailed {
            provider: provider.to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() {
        return Err(ProviderError::InvalidResponse {
            provider: provider.to_string(),
            message: "CLI produced no output".to_string(),
        });
    }

    Ok(stdout)
}
