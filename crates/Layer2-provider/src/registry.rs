//! Provider registry
//!
//! Holds the tagged provider set in a fixed id order and resolves which
//! backend serves a request. When the configured provider is disabled the
//! selection falls back through the ordered enabled list; the substitution
//! is logged rather than failing the cycle.

use crate::error::ProviderError;
use crate::providers::{ClaudeProvider, CopilotProvider, OpenAiProvider, ProviderAuth};
use crate::r#trait::{ProviderBackend, ProviderDescriptor};
use savepoint_foundation::{AiConfig, AuthMethod, SavepointConfig, SecretKind, SecretStore};
use std::sync::Arc;
use tracing::warn;

/// Registry over the fixed provider set
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn ProviderBackend>>,
}

impl ProviderRegistry {
    /// Build the production set from configuration and the secret store
    pub fn from_config(config: &SavepointConfig, secrets: &SecretStore) -> Self {
        let claude_auth = resolve_auth(
            config,
            secrets,
            "claude",
            AuthMethod::ApiKey,
            "ANTHROPIC_API_KEY",
        );
        let openai_auth = resolve_auth(
            config,
            secrets,
            "openai",
            AuthMethod::ApiKey,
            "OPENAI_API_KEY",
        );

        Self {
            providers: vec![
                Arc::new(ClaudeProvider::new(claude_auth)),
                Arc::new(OpenAiProvider::new(openai_auth)),
                Arc::new(CopilotProvider::new()),
            ],
        }
    }

    /// Build a registry over explicit backends (tests, embedding hosts)
    pub fn with_providers(providers: Vec<Arc<dyn ProviderBackend>>) -> Self {
        Self { providers }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn ProviderBackend>> {
        self.providers.iter().find(|p| p.id() == id).cloned()
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Resolve the provider that should serve the next request.
    ///
    /// The configured provider wins when it is enabled; otherwise the
    /// ordered list of enabled providers is tried. No enabled provider at
    /// all is `NoProviderConfigured`.
    pub fn select_active(&self, ai: &AiConfig) -> Result<Arc<dyn ProviderBackend>, ProviderError> {
        if let Some(configured) = ai.provider.as_deref() {
            match self.get(configured) {
                Some(provider) if ai.provider_enabled(configured) => return Ok(provider),
                Some(_) => {
                    warn!(
                        provider = configured,
                        "Configured provider is disabled; falling back through enabled providers"
                    );
                }
                None => {
                    warn!(provider = configured, "Configured provider id is unknown");
                }
            }
        }

        for provider in &self.providers {
            if ai.provider_enabled(provider.id()) {
                if ai.provider.as_deref() != Some(provider.id()) {
                    warn!(substituted = provider.id(), "Using fallback provider");
                }
                return Ok(provider.clone());
            }
        }

        Err(ProviderError::NoProviderConfigured)
    }

    /// Model precedence: global override > provider setting > provider default
    pub fn resolve_model(&self, ai: &AiConfig, provider: &dyn ProviderBackend) -> String {
        ai.model
            .clone()
            .or_else(|| ai.provider_model(provider.id()).map(str::to_string))
            .unwrap_or_else(|| provider.default_model().to_string())
    }

    /// Descriptors for the provider management UI
    pub fn descriptors(&self, ai: &AiConfig) -> Vec<ProviderDescriptor> {
        let active_id = self.select_active(ai).ok().map(|p| p.id());

        self.providers
            .iter()
            .map(|p| ProviderDescriptor {
                id: p.id().to_string(),
                display_name: p.display_name().to_string(),
                enabled: ai.provider_enabled(p.id()),
                active: active_id == Some(p.id()),
                model: self.resolve_model(ai, p.as_ref()),
            })
            .collect()
    }
}

/// Effective auth for one provider: config resolution, then credentials
fn resolve_auth(
    config: &SavepointConfig,
    secrets: &SecretStore,
    provider_id: &str,
    provider_default: AuthMethod,
    env_var: &str,
) -> ProviderAuth {
    match config.auth.resolve(provider_id, provider_default) {
        AuthMethod::CliLogin => ProviderAuth::CliLogin,
        _ => ProviderAuth::ApiKey(secrets.get_with_env(provider_id, SecretKind::ApiKey, env_var)),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::r#trait::GenerateOptions;
    use async_trait::async_trait;
    use savepoint_foundation::AiProviderConfig;

    struct StubProvider {
        id: &'static str,
    }

    #[async_trait]
    impl ProviderBackend for StubProvider {
        fn id(&self) -> &'static str {
            self.id
        }
        fn display_name(&self) -> &'static str {
            self.id
        }
        fn default_model(&self) -> &'static str {
            "stub-default"
        }
        async fn is_available(&self) -> bool {
            true
        }
        async fn generate_commit_message(
            &self,
            _diff: &str,
            _options: &GenerateOptions,
        ) -> Result<String, ProviderError> {
            Ok("stub message".to_string())
        }
    }

    fn registry() -> ProviderRegistry {
        ProviderRegistry::with_providers(vec![
            Arc::new(StubProvider { id: "claude" }),
            Arc::new(StubProvider { id: "openai" }),
            Arc::new(StubProvider { id: "copilot" }),
        ])
    }

    fn disabled(id: &str, ai: &mut AiConfig) {
        ai.providers.insert(
            id.to_string(),
            AiProviderConfig {
                enabled: false,
                model: None,
            },
        );
    }

    #[test]
    fn test_configured_provider_wins() {
        let ai = AiConfig {
            provider: Some("openai".to_string()),
            ..AiConfig::default()
        };
        let selected = registry().select_active(&ai).unwrap();
        assert_eq!(selected.id(), "openai");
    }

    #[test]
    fn test_disabled_configured_provider_falls_back_in_order() {
        let mut ai = AiConfig {
            provider: Some("claude".to_string()),
            ..AiConfig::default()
        };
        disabled("claude", &mut ai);

        let selected = registry().select_active(&ai).unwrap();
        assert_eq!(selected.id(), "openai");
    }

    #[test]
    fn test_no_enabled_provider() {
        let mut ai = AiConfig::default();
        disabled("claude", &mut ai);
        disabled("openai", &mut ai);
        disabled("copilot", &mut ai);

        let result = registry().select_active(&ai);
        assert!(matches!(result, Err(ProviderError::NoProviderConfigured)));
    }

    #[test]
    fn test_model_precedence() {
        let reg = registry();
        let provider = reg.get("claude").unwrap();

        let mut ai = AiConfig::default();
        assert_eq!(reg.resolve_model(&ai, provider.as_ref()), "stub-default");

        ai.providers.insert(
            "claude".to_string(),
            AiProviderConfig {
                enabled: true,
                model: Some("provider-model".to_string()),
            },
        );
        assert_eq!(reg.resolve_model(&ai, provider.as_ref()), "provider-model");

        ai.model = Some("global-model".to_string());
        assert_eq!(reg.resolve_model(&ai, provider.as_ref()), "global-model");
    }

    #[test]
    fn test_descriptors_mark_active() {
        let ai = AiConfig {
            provider: Some("copilot".to_string()),
            ..AiConfig::default()
        };
        let descriptors = registry().descriptors(&ai);
        assert_eq!(descriptors.len(), 3);
        let active: Vec<_> = descriptors.iter().filter(|d| d.active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "copilot");
    }
}
