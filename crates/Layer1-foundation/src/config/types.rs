//! Configuration types
//!
//! Savepoint settings schema. Field names are camelCase on disk so the
//! settings files read the same as the host editor's contributions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// SavepointConfig - unified settings
// ============================================================================

/// Savepoint unified configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavepointConfig {
    // ========================================================================
    // Engine
    // ========================================================================
    /// Master on/off switch
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Debounce delay between the last save and the commit attempt (ms)
    #[serde(default = "default_commit_delay")]
    pub auto_commit_delay: u64,

    /// Interval between periodic pushes when autoPush is afterDelay (ms)
    #[serde(default = "default_sync_delay")]
    pub auto_push_delay: u64,

    /// Interval between periodic pulls when autoPull is afterDelay (ms)
    #[serde(default = "default_sync_delay")]
    pub auto_pull_delay: u64,

    /// When to push
    #[serde(default)]
    pub auto_push: AutoPushMode,

    /// When to pull
    #[serde(default)]
    pub auto_pull: AutoPullMode,

    /// Glob filter applied to changed paths before staging
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,

    /// Branches on which saves never trigger a commit
    #[serde(default)]
    pub exclude_branches: Vec<String>,

    /// Diagnostic severity that blocks a commit
    #[serde(default)]
    pub commit_validation_level: ValidationLevel,

    /// How `git push` is invoked
    #[serde(default)]
    pub push_mode: PushMode,

    /// Pull once when the engine is enabled
    #[serde(default = "default_true")]
    pub pull_on_open: bool,

    /// Run a final commit cycle on shutdown
    #[serde(default = "default_true")]
    pub commit_on_close: bool,

    // ========================================================================
    // Change-volume thresholds
    // ========================================================================
    /// Minimum changed files for a cycle to proceed (0 = disabled)
    #[serde(default)]
    pub min_changed_files: usize,

    /// Minimum changed lines for a cycle to proceed (0 = disabled)
    #[serde(default)]
    pub min_changed_lines: usize,

    /// Apply the thresholds even when changes were pre-staged by the user
    #[serde(default)]
    pub enforce_thresholds_for_staged: bool,

    // ========================================================================
    // AI message generation
    // ========================================================================
    /// AI settings
    #[serde(default)]
    pub ai: AiConfig,

    // ========================================================================
    // Authentication
    // ========================================================================
    /// Auth settings
    #[serde(default)]
    pub auth: AuthConfig,
}

fn default_true() -> bool {
    true
}

fn default_commit_delay() -> u64 {
    30_000
}

fn default_sync_delay() -> u64 {
    30_000
}

fn default_file_pattern() -> String {
    "**/*".to_string()
}

impl Default for SavepointConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_commit_delay: default_commit_delay(),
            auto_push_delay: default_sync_delay(),
            auto_pull_delay: default_sync_delay(),
            auto_push: AutoPushMode::default(),
            auto_pull: AutoPullMode::default(),
            file_pattern: default_file_pattern(),
            exclude_branches: Vec::new(),
            commit_validation_level: ValidationLevel::default(),
            push_mode: PushMode::default(),
            pull_on_open: true,
            commit_on_close: true,
            min_changed_files: 0,
            min_changed_lines: 0,
            enforce_thresholds_for_staged: false,
            ai: AiConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl SavepointConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a branch name is excluded from triggering
    pub fn is_branch_excluded(&self, branch: &str) -> bool {
        self.exclude_branches.iter().any(|b| b == branch)
    }
}

// ============================================================================
// Sync modes
// ============================================================================

/// When pushes happen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AutoPushMode {
    /// Push immediately after every commit
    #[default]
    OnCommit,

    /// Push on a periodic timer
    AfterDelay,

    /// Never push automatically
    Off,
}

/// When pulls happen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AutoPullMode {
    /// Pull immediately after every successful push
    #[default]
    OnPush,

    /// Pull on a periodic timer
    AfterDelay,

    /// Never pull automatically
    Off,
}

/// Push invocation style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PushMode {
    /// Plain `git push`
    #[default]
    Push,

    /// `git push --force`
    ForcePush,

    /// `git push --force-with-lease`
    ForcePushWithLease,
}

impl PushMode {
    /// Extra flags for `git push`
    pub fn flags(&self) -> &'static [&'static str] {
        match self {
            PushMode::Push => &[],
            PushMode::ForcePush => &["--force"],
            PushMode::ForcePushWithLease => &["--force-with-lease"],
        }
    }
}

/// Diagnostic severity gate for commits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationLevel {
    /// Block when the saved document has errors
    #[default]
    Error,

    /// Block when the saved document has warnings or errors
    Warning,

    /// Never block
    None,
}

// ============================================================================
// AI configuration
// ============================================================================

/// Commit message style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageStyle {
    /// Plain descriptive message
    #[default]
    Simple,

    /// Conventional commits (feat:, fix:, etc.)
    Conventional,

    /// Gitmoji-prefixed message
    Emoji,

    /// Custom instructions replace the structural rules entirely
    Custom,
}

/// Target message length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageLength {
    /// ~50 characters
    Short,

    /// ~72 characters
    #[default]
    Standard,

    /// ~100 characters
    Detailed,
}

impl MessageLength {
    /// Character budget communicated to the provider
    pub fn max_chars(&self) -> usize {
        match self {
            MessageLength::Short => 50,
            MessageLength::Standard => 72,
            MessageLength::Detailed => 100,
        }
    }
}

/// Per-provider AI settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiProviderConfig {
    /// Whether this provider participates in selection and fallback
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Provider-specific model, overridden by the global `ai.model`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// AI message generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    /// Use AI-generated messages at all
    #[serde(default)]
    pub enabled: bool,

    /// Configured active provider id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Global model override (takes precedence over per-provider model)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Message style
    #[serde(default)]
    pub style: MessageStyle,

    /// Target message length
    #[serde(default)]
    pub length: MessageLength,

    /// Custom instructions; when set with style = custom they replace the
    /// structural style rules instead of augmenting them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,

    /// Ask the provider to prefix the message with an emoji
    #[serde(default)]
    pub use_emojis: bool,

    /// Diff character cap sent to the provider
    #[serde(default = "default_max_diff_chars")]
    pub max_diff_chars: usize,

    /// Provider request timeout (ms), clamped to a floor at use time
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Total provider attempts before giving up
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Fixed delay between attempts (ms)
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,

    /// Substitute the timestamp message when every attempt fails;
    /// when false the whole commit is aborted instead
    #[serde(default = "default_true")]
    pub fallback_on_failure: bool,

    /// Per-provider settings, keyed by provider id
    #[serde(default)]
    pub providers: HashMap<String, AiProviderConfig>,
}

fn default_max_diff_chars() -> usize {
    20_000
}

fn default_request_timeout() -> u64 {
    30_000
}

fn default_retry_attempts() -> u32 {
    2
}

fn default_retry_delay() -> u64 {
    1_000
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: None,
            model: None,
            style: MessageStyle::default(),
            length: MessageLength::default(),
            custom_instructions: None,
            use_emojis: false,
            max_diff_chars: default_max_diff_chars(),
            request_timeout: default_request_timeout(),
            retry_attempts: default_retry_attempts(),
            retry_delay: default_retry_delay(),
            fallback_on_failure: true,
            providers: HashMap::new(),
        }
    }
}

impl AiConfig {
    /// Whether a provider id is enabled (absent entries default to enabled)
    pub fn provider_enabled(&self, id: &str) -> bool {
        self.providers.get(id).map(|p| p.enabled).unwrap_or(true)
    }

    /// Per-provider model setting, if any
    pub fn provider_model(&self, id: &str) -> Option<&str> {
        self.providers.get(id).and_then(|p| p.model.as_deref())
    }
}

// ============================================================================
// Authentication configuration
// ============================================================================

/// How a provider authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthMethod {
    /// API key from the secret store or environment
    ApiKey,

    /// Authenticated vendor CLI located on this machine
    CliLogin,

    /// Use the global `auth.method`
    Inherit,
}

/// Auth settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /// Global auth method
    #[serde(default = "default_auth_method")]
    pub method: AuthMethod,

    /// Per-provider overrides, keyed by provider id
    #[serde(default)]
    pub providers: HashMap<String, AuthMethod>,
}

fn default_auth_method() -> AuthMethod {
    AuthMethod::ApiKey
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            method: default_auth_method(),
            providers: HashMap::new(),
        }
    }
}

impl AuthConfig {
    /// Resolve the effective method for a provider id.
    ///
    /// Precedence: per-provider override > global method. `inherit` at
    /// either level falls through to the next; a global `inherit` resolves
    /// to the given provider default.
    pub fn resolve(&self, provider_id: &str, provider_default: AuthMethod) -> AuthMethod {
        let from_override = self
            .providers
            .get(provider_id)
            .copied()
            .filter(|m| *m != AuthMethod::Inherit);

        from_override.unwrap_or(match self.method {
            AuthMethod::Inherit => provider_default,
            other => other,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SavepointConfig::default();
        assert!(config.enabled);
        assert_eq!(config.auto_commit_delay, 30_000);
        assert_eq!(config.auto_push, AutoPushMode::OnCommit);
        assert_eq!(config.auto_pull, AutoPullMode::OnPush);
        assert_eq!(config.file_pattern, "**/*");
        assert!(!config.ai.enabled);
        assert!(config.ai.fallback_on_failure);
    }

    #[test]
    fn test_camel_case_round_trip() {
        let json = r#"{
            "enabled": false,
            "autoCommitDelay": 5000,
            "autoPush": "afterDelay",
            "pushMode": "forcePushWithLease",
            "commitValidationLevel": "warning",
            "excludeBranches": ["main", "release"],
            "ai": { "enabled": true, "provider": "claude", "length": "short" }
        }"#;

        let config: SavepointConfig = serde_json::from_str(json).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.auto_commit_delay, 5000);
        assert_eq!(config.auto_push, AutoPushMode::AfterDelay);
        assert_eq!(config.push_mode, PushMode::ForcePushWithLease);
        assert_eq!(config.commit_validation_level, ValidationLevel::Warning);
        assert!(config.is_branch_excluded("main"));
        assert!(!config.is_branch_excluded("dev"));
        assert!(config.ai.enabled);
        assert_eq!(config.ai.provider.as_deref(), Some("claude"));
        assert_eq!(config.ai.length.max_chars(), 50);
    }

    #[test]
    fn test_push_mode_flags() {
        assert!(PushMode::Push.flags().is_empty());
        assert_eq!(PushMode::ForcePush.flags(), &["--force"]);
        assert_eq!(PushMode::ForcePushWithLease.flags(), &["--force-with-lease"]);
    }

    #[test]
    fn test_auth_resolution() {
        let mut auth = AuthConfig::default();
        assert_eq!(auth.resolve("claude", AuthMethod::ApiKey), AuthMethod::ApiKey);

        auth.providers.insert("claude".into(), AuthMethod::CliLogin);
        assert_eq!(auth.resolve("claude", AuthMethod::ApiKey), AuthMethod::CliLogin);

        // inherit at the provider level falls through to the global method
        auth.providers.insert("openai".into(), AuthMethod::Inherit);
        assert_eq!(auth.resolve("openai", AuthMethod::CliLogin), AuthMethod::ApiKey);

        // inherit at the global level resolves to the provider default
        auth.method = AuthMethod::Inherit;
        assert_eq!(auth.resolve("copilot", AuthMethod::CliLogin), AuthMethod::CliLogin);
    }

    #[test]
    fn test_provider_enablement_defaults() {
        let mut ai = AiConfig::default();
        assert!(ai.provider_enabled("claude"));

        ai.providers.insert(
            "claude".into(),
            AiProviderConfig {
                enabled: false,
                model: Some("claude-3-5-haiku-20241022".into()),
            },
        );
        assert!(!ai.provider_enabled("claude"));
        assert_eq!(ai.provider_model("claude"), Some("claude-3-5-haiku-20241022"));
    }
}
