//! Commit message generation
//!
//! Orchestrates one generation request: provider selection, availability,
//! option building, diff truncation, the timeout race, bounded retries,
//! and the deterministic timestamp fallback. All provider output passes
//! through `normalize_message`, which guarantees a single physical line.

use crate::error::ProviderError;
use crate::r#trait::GenerateOptions;
use crate::registry::ProviderRegistry;
use crate::retry::{with_retry, RetryConfig};
use savepoint_foundation::AiConfig;
use std::time::Duration;
use tracing::{debug, warn};

/// Floor for the configured request timeout
pub const MIN_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Appended when the diff exceeds the configured character cap
pub const TRUNCATION_MARKER: &str = "\n[diff truncated]";

// ============================================================================
// MessageGenerator
// ============================================================================

/// Produces a single-line commit message for a staged change set
pub struct MessageGenerator {
    registry: ProviderRegistry,
}

impl MessageGenerator {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Generate a message for `diff` under the given AI configuration.
    ///
    /// Exhausted retries degrade to the timestamp message unless fallback
    /// is disabled, in which case the error propagates and the caller
    /// aborts the commit.
    pub async fn generate(&self, diff: &str, ai: &AiConfig) -> Result<String, ProviderError> {
        let provider = self.registry.select_active(ai)?;

        if !provider.is_available().await {
            let err = ProviderError::Unavailable {
                provider: provider.id().to_string(),
                reason: "credentials missing or CLI not found".to_string(),
            };
            if ai.fallback_on_failure {
                warn!("{}; using timestamp message", err);
                return Ok(fallback_message());
            }
            return Err(err);
        }

        let options = GenerateOptions {
            style: ai.style,
            length: ai.length,
            custom_instructions: ai.custom_instructions.clone(),
            use_emojis: ai.use_emojis,
            model: self.registry.resolve_model(ai, provider.as_ref()),
        };

        let (diff, truncated) = truncate_diff(diff, ai.max_diff_chars);
        if truncated {
            debug!(cap = ai.max_diff_chars, "Diff truncated for provider");
        }

        let timeout = Duration::from_millis(ai.request_timeout.max(MIN_REQUEST_TIMEOUT_MS));
        let retry = RetryConfig {
            max_attempts: ai.retry_attempts,
            delay: Duration::from_millis(ai.retry_delay),
        };

        let provider_id = provider.id();
        let result = with_retry(&retry, "generate_commit_message", || {
            let provider = provider.clone();
            let options = options.clone();
            let diff = diff.clone();
            async move {
                // Race the provider call against the timeout. The loser is
                // abandoned, not killed; CLI children are reaped on drop.
                match tokio::time::timeout(timeout, provider.generate_commit_message(&diff, &options))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout {
                        provider: provider_id.to_string(),
                        after_ms: timeout.as_millis() as u64,
                    }),
                }
            }
        })
        .await;

        match result {
            Ok(raw) => {
                let normalized = normalize_message(&raw);
                if normalized.is_empty() {
                    warn!("Provider returned an empty message; using timestamp message");
                    Ok(fallback_message())
                } else {
                    Ok(normalized)
                }
            }
            Err(e) if ai.fallback_on_failure => {
                warn!("Message generation failed ({}); using timestamp message", e);
                Ok(fallback_message())
            }
            Err(e) => Err(e),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Deterministic non-AI commit message
pub fn fallback_message() -> String {
    chrono::Local::now()
        .format("%b %-d, %Y, %-I:%M %p")
        .to_string()
}

/// Cap the diff at `max_chars`, appending the truncation marker when cut
pub fn truncate_diff(diff: &str, max_chars: usize) -> (String, bool) {
    if max_chars == 0 || diff.chars().count() <= max_chars {
        return (diff.to_string(), false);
    }

    let mut truncated: String = diff.chars().take(max_chars).collect();
    truncated.push_str(TRUNCATION_MARKER);
    (truncated, true)
}

/// Normalize provider output into a single physical line.
///
/// Strips markdown code fences, surrounding backtick/quote layers, and
/// collapses whitespace runs to single spaces. Idempotent.
pub fn normalize_message(raw: &str) -> String {
    let text = strip_code_fences(raw);
    let mut text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    loop {
        let stripped = strip_quote_layer(&text);
        if stripped == text {
            break;
        }
        text = stripped;
    }

    text
}

fn strip_code_fences(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().collect();
    let mut start = 0;
    let mut end = lines.len();

    while start < end && lines[start].trim().is_empty() {
        start += 1;
    }
    while end > start && lines[end - 1].trim().is_empty() {
        end -= 1;
    }

    // a fence needs its own line; single-line backtick wrapping is the
    // quote stripper's job
    if end - start >= 2 && lines[start].trim_start().starts_with("```") {
        start += 1;
        if end > start && lines[end - 1].trim_start().starts_with("```") {
            end -= 1;
        }
    }

    lines[start..end].join("\n")
}

fn strip_quote_layer(text: &str) -> String {
    let trimmed = text.trim();
    let mut chars = trimmed.chars();
    let (first, last) = (chars.next(), chars.next_back());

    match (first, last) {
        (Some(f), Some(l)) if f == l && matches!(f, '`' | '"' | '\'') => {
            trimmed[f.len_utf8()..trimmed.len() - l.len_utf8()].trim().to_string()
        }
        _ => trimmed.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::r#trait::ProviderBackend;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    // ------------------------------------------------------------------------
    // Normalization
    // ------------------------------------------------------------------------

    #[test]
    fn test_normalize_examples() {
        assert_eq!(normalize_message("\"fix bug\""), "fix bug");
        assert_eq!(normalize_message("`fix bug`"), "fix bug");
        assert_eq!(normalize_message("fix   bug\n"), "fix bug");
    }

    #[test]
    fn test_normalize_code_fence() {
        assert_eq!(
            normalize_message("```\nfeat: add parser\n```"),
            "feat: add parser"
        );
        assert_eq!(
            normalize_message("```text\nfeat: add parser\n```"),
            "feat: add parser"
        );
    }

    #[test]
    fn test_normalize_inline_backtick_wrapping() {
        assert_eq!(normalize_message("```feat: add parser```"), "feat: add parser");
    }

    #[test]
    fn test_normalize_multiline_collapses() {
        assert_eq!(
            normalize_message("feat: add parser\n\nwith a body"),
            "feat: add parser with a body"
        );
    }

    #[test]
    fn test_normalize_idempotent() {
        let inputs = [
            "\"fix bug\"",
            "``nested``",
            "'\"double wrapped\"'",
            "```\n`quoted`\n```",
            "  spaced   out  ",
            "plain message",
            "",
        ];
        for input in inputs {
            let once = normalize_message(input);
            assert_eq!(normalize_message(&once), once, "input: {:?}", input);
        }
    }

    #[test]
    fn test_normalize_keeps_interior_quotes() {
        assert_eq!(
            normalize_message("fix \"empty\" case"),
            "fix \"empty\" case"
        );
    }

    // ------------------------------------------------------------------------
    // Truncation
    // ------------------------------------------------------------------------

    #[test]
    fn test_truncate_under_cap_untouched() {
        let (diff, truncated) = truncate_diff("short diff", 100);
        assert_eq!(diff, "short diff");
        assert!(!truncated);
    }

    #[test]
    fn test_truncate_over_cap_marked() {
        let (diff, truncated) = truncate_diff(&"x".repeat(50), 10);
        assert!(truncated);
        assert_eq!(diff, format!("{}{}", "x".repeat(10), TRUNCATION_MARKER));
    }

    // ------------------------------------------------------------------------
    // Retry / fallback
    // ------------------------------------------------------------------------

    struct FailingProvider {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl ProviderBackend for FailingProvider {
        fn id(&self) -> &'static str {
            "claude"
        }
        fn display_name(&self) -> &'static str {
            "Claude"
        }
        fn default_model(&self) -> &'static str {
            "test-model"
        }
        async fn is_available(&self) -> bool {
            true
        }
        async fn generate_commit_message(
            &self,
            _diff: &str,
            _options: &GenerateOptions,
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::RequestFailed {
                provider: "claude".to_string(),
                message: "always fails".to_string(),
            })
        }
    }

    struct HangingProvider;

    #[async_trait]
    impl ProviderBackend for HangingProvider {
        fn id(&self) -> &'static str {
            "claude"
        }
        fn display_name(&self) -> &'static str {
            "Claude"
        }
        fn default_model(&self) -> &'static str {
            "test-model"
        }
        async fn is_available(&self) -> bool {
            true
        }
        async fn generate_commit_message(
            &self,
            _diff: &str,
            _options: &GenerateOptions,
        ) -> Result<String, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("never".to_string())
        }
    }

    fn generator_with(provider: Arc<dyn ProviderBackend>) -> MessageGenerator {
        MessageGenerator::new(ProviderRegistry::with_providers(vec![provider]))
    }

    fn ai_config(attempts: u32, fallback: bool) -> AiConfig {
        AiConfig {
            enabled: true,
            retry_attempts: attempts,
            retry_delay: 10,
            fallback_on_failure: fallback,
            ..AiConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_fallback() {
        let calls = Arc::new(AtomicU32::new(0));
        let generator = generator_with(Arc::new(FailingProvider {
            calls: calls.clone(),
        }));

        let message = generator.generate("+x", &ai_config(3, true)).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // timestamp fallback carries the current year
        let year = chrono::Local::now().format("%Y").to_string();
        assert!(message.contains(&year), "got: {}", message);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_abort_when_fallback_disabled() {
        let calls = Arc::new(AtomicU32::new(0));
        let generator = generator_with(Arc::new(FailingProvider {
            calls: calls.clone(),
        }));

        let result = generator.generate("+x", &ai_config(2, false)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(result, Err(ProviderError::RequestFailed { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_loses_race_and_falls_back() {
        let generator = generator_with(Arc::new(HangingProvider));

        let mut ai = ai_config(1, true);
        ai.request_timeout = 1; // clamped up to the floor

        let message = generator.generate("+x", &ai).await.unwrap();
        let year = chrono::Local::now().format("%Y").to_string();
        assert!(message.contains(&year));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_propagates_without_fallback() {
        let generator = generator_with(Arc::new(HangingProvider));

        let mut ai = ai_config(1, false);
        ai.request_timeout = 1;

        let result = generator.generate("+x", &ai).await;
        assert!(matches!(result, Err(ProviderError::Timeout { after_ms, .. })
            if after_ms == MIN_REQUEST_TIMEOUT_MS));
    }

    #[tokio::test]
    async fn test_no_enabled_provider_propagates_regardless_of_fallback() {
        let generator = generator_with(Arc::new(FailingProvider {
            calls: Arc::new(AtomicU32::new(0)),
        }));

        let mut ai = ai_config(1, true);
        ai.providers.insert(
            "claude".to_string(),
            savepoint_foundation::AiProviderConfig {
                enabled: false,
                model: None,
            },
        );

        let result = generator.generate("+x", &ai).await;
        assert!(matches!(result, Err(ProviderError::NoProviderConfigured)));
    }
}
