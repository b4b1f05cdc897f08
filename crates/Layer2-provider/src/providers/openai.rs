//! OpenAI provider
//!
//! api-key auth talks to the Chat Completions API; cli-login auth runs the
//! locally installed `codex` CLI.

use super::{locate_cli, run_cli, ProviderAuth};
use crate::error::ProviderError;
use crate::prompt::build_prompt;
use crate::r#trait::{GenerateOptions, ModelInfo, ProviderBackend};
use async_trait::async_trait;
use reqwest::Client;
use savepoint_foundation::ExecutableLocator;
use serde::{Deserialize, Serialize};
use tracing::debug;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const CLI_TOOL: &str = "codex";
const MAX_RESPONSE_TOKENS: u32 = 256;

/// OpenAI commit message backend
pub struct OpenAiProvider {
    client: Client,
    auth: ProviderAuth,
}

impl OpenAiProvider {
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
        let request = ChatRequest {
            model: options.model.clone(),
            max_tokens: MAX_RESPONSE_TOKENS,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "You write git commit messages.".to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: build_prompt(diff, options),
                },
            ],
        };

        let response = self
            .client
            .post(OPENAI_API_URL)
            .bearer_auth(api_key)
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

        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse {
                    provider: self.id().to_string(),
                    message: e.to_string(),
                })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: self.id().to_string(),
                message: "response carried no choices".to_string(),
            })
    }

    async fn generate_cli(
        &self,
        diff: &str,
        options: &GenerateOptions,
    ) -> Result<String, ProviderError> {
        let resolution = locate_cli(self.id(), CLI_TOOL).await?;
        let prompt = build_prompt(diff, options);
        let args = ["exec", "--model", options.model.as_str(), prompt.as_str()];
        run_cli(self.id(), &resolution, &args).await
    }
}

#[async_trait]
impl ProviderBackend for OpenAiProvider {
    fn id(&self) -> &'static str {
        "openai"
    }

    fn display_name(&self) -> &'static str {
        "OpenAI"
    }

    fn default_model(&self) -> &'static str {
        "gpt-4o-mini"
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
        debug!(model = %options.model, "Generating commit message via OpenAI");
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
            ModelInfo::new("gpt-4o", self.id()),
            ModelInfo::new("gpt-4o-mini", self.id()),
        ])
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_api_key_availability() {
        let provider = OpenAiProvider::new(ProviderAuth::ApiKey(Some("sk-test".into())));
        assert!(provider.is_available().await);
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"docs: update readme"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.choices[0].message.content, "docs: update readme");
    }
}
