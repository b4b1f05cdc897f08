//! Claude provider
//!
//! api-key auth talks to the Anthropic Messages API; cli-login auth runs
//! the locally installed `claude` CLI, located through the executable
//! discovery chain.

use super::{locate_cli, run_cli, ProviderAuth};
use crate::error::ProviderError;
use crate::prompt::build_prompt;
use crate::r#trait::{GenerateOptions, ModelInfo, ProviderBackend};
use async_trait::async_trait;
use reqwest::Client;
use savepoint_foundation::ExecutableLocator;
use serde::{Deserialize, Serialize};
use tracing::debug;

const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const CLI_TOOL: &str = "claude";
const MAX_RESPONSE_TOKENS: u32 = 256;

/// Claude commit message backend
pub struct ClaudeProvider {
    client: Client,
    auth: ProviderAuth,
}

impl ClaudeProvider {
    pub fn new(auth: ProviderAuth) -> Self {
        Self {
            client: Client::new(),
            auth,
        }
    }

    async fn generate_http(
        &self,
        api_key: &str,
        diff: &str,
        options: &GenerateOptions,
    ) -> Result<String, ProviderError> {
        let request = MessagesRequest {
            model: options.model.clone(),
            max_tokens: MAX_RESPONSE_TOKENS,
            system: "You write git commit messages.".to_string(),
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: build_prompt(diff, options),
            }],
        };

        let response = self
            .client
            .post(CLAUDE_API_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed {
                provider: self.id().to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::RequestFailed {
                provider: self.id().to_string(),
                message: format!("HTTP {}: {}", status.as_u16(), body),
            });
        }

        let parsed: MessagesResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse {
                    provider: self.id().to_string(),
                    message: e.to_string(),
                })?;

        parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .map(|block| block.text)
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: self.id().to_string(),
                message: "response carried no text block".to_string(),
            })
    }

    async fn generate_cli(
        &self,
        diff: &str,
        options: &GenerateOptions,
    ) -> Result<String, ProviderError> {
        let resolution = locate_cli(self.id(), CLI_TOOL).await?;
        let prompt = build_prompt(diff, options);
        let args = ["-p", prompt.as_str(), "--model", options.model.as_str()];
        run_cli(self.id(), &resolution, &args).await
    }
}

#[async_trait]
impl ProviderBackend for ClaudeProvider {
    fn id(&self) -> &'static str {
        "claude"
    }

    fn display_name(&self) -> &'static str {
        "Claude"
    }

    fn default_model(&self) -> &'static str {
        "claude-3-5-haiku-20241022"
    }

    async fn is_available(&self) -> bool {
        match &self.auth {
            ProviderAuth::ApiKey(key) => key.is_some(),
            ProviderAuth::CliLogin => ExecutableLocator::locate(CLI_TOOL).await.is_some(),
        }
    }

    async fn generate_commit_message(
        &self,
        diff: &str,
        options: &GenerateOptions,
    ) -> Result<String, ProviderError> {
        debug!(model = %options.model, "Generating commit message via Claude");
        match &self.auth {
            ProviderAuth::ApiKey(Some(key)) => self.generate_http(key, diff, options).await,
            ProviderAuth::ApiKey(None) => Err(ProviderError::Unavailable {
                provider: self.id().to_string(),
                reason: "no API key stored".to_string(),
            }),
            ProviderAuth::CliLogin => self.generate_cli(diff, options).await,
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        Ok(vec![
            ModelInfo::new("claude-sonnet-4-20250514", self.id()),
            ModelInfo::new("claude-3-5-haiku-20241022", self.id()),
        ])
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<ApiMessage>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_api_key_availability() {
        let with_key = ClaudeProvider::new(ProviderAuth::ApiKey(Some("sk-test".into())));
        assert!(with_key.is_available().await);

        let without_key = ClaudeProvider::new(ProviderAuth::ApiKey(None));
        assert!(!without_key.is_available().await);
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_any_request() {
        let provider = ClaudeProvider::new(ProviderAuth::ApiKey(None));
        let options = GenerateOptions {
            style: savepoint_foundation::MessageStyle::Simple,
            length: savepoint_foundation::MessageLength::Standard,
            custom_instructions: None,
            use_emojis: false,
            model: provider.default_model().to_string(),
        };
        let result = provider.generate_commit_message("+x", &options).await;
        assert!(matches!(result, Err(ProviderError::Unavailable { .. })));
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"content":[{"type":"text","text":"fix: handle empty diff"}]}"#;
        let parsed: MessagesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.content[0].text, "fix: handle empty diff");
    }
}
