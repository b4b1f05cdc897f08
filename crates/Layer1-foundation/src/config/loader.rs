//! Configuration loader
//!
//! Layered settings resolution for the `.savepoint` folder:
//!
//! 1. User-level: `~/.savepoint/settings.json`
//! 2. Project-level: `.savepoint/settings.json`
//! 3. Local (gitignored): `.savepoint/settings.local.json`
//!
//! Each level overrides the previous one. Files are merged as JSON values
//! before deserialization so a partial file only overrides the keys it
//! actually sets.

use super::types::SavepointConfig;
use crate::{Error, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Settings folder name
pub const CONFIG_DIR_NAME: &str = ".savepoint";

// ============================================================================
// ConfigLoader
// ============================================================================

/// Layered settings loader
pub struct ConfigLoader {
    /// Search paths, lowest priority first
    search_paths: Vec<ConfigPath>,
}

#[derive(Debug, Clone)]
struct ConfigPath {
    path: PathBuf,
    priority: u8,
    description: &'static str,
}

impl ConfigLoader {
    /// Create a loader with the default search paths
    pub fn new(working_dir: &Path) -> Self {
        let mut paths = Vec::new();

        // 1. User-level (lowest priority)
        if let Some(home) = dirs::home_dir() {
            paths.push(ConfigPath {
                path: home.join(CONFIG_DIR_NAME).join("settings.json"),
                priority: 10,
                description: "User settings",
            });
        }

        // 2. Project-level
        paths.push(ConfigPath {
            path: working_dir.join(CONFIG_DIR_NAME).join("settings.json"),
            priority: 20,
            description: "Project settings",
        });

        // 3. Local (gitignored, highest priority)
        paths.push(ConfigPath {
            path: working_dir.join(CONFIG_DIR_NAME).join("settings.local.json"),
            priority: 30,
            description: "Local settings",
        });

        paths.sort_by_key(|p| p.priority);

        Self { search_paths: paths }
    }

    /// Create a loader over explicit paths, in override order
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        let search_paths = paths
            .into_iter()
            .enumerate()
            .map(|(i, path)| ConfigPath {
                path,
                priority: i as u8,
                description: "Custom",
            })
            .collect();

        Self { search_paths }
    }

    /// Load and merge every layer that exists
    pub fn load_all(&self) -> Result<SavepointConfig> {
        let mut merged = Value::Object(serde_json::Map::new());

        for config_path in &self.search_paths {
            if !config_path.path.exists() {
                continue;
            }
            match load_json_value(&config_path.path) {
                Ok(value) => {
                    info!(
                        "Loaded {} from: {}",
                        config_path.description,
                        config_path.path.display()
                    );
                    merge_values(&mut merged, value);
                }
                Err(e) => {
                    warn!(
                        "Failed to load settings from {}: {}",
                        config_path.path.display(),
                        e
                    );
                }
            }
        }

        let config: SavepointConfig = serde_json::from_value(merged)
            .map_err(|e| Error::Config(format!("Invalid merged settings: {}", e)))?;

        debug!(
            enabled = config.enabled,
            ai_enabled = config.ai.enabled,
            "Resolved configuration"
        );

        Ok(config)
    }

    /// Settings files that exist on disk, lowest priority first
    pub fn existing_files(&self) -> Vec<PathBuf> {
        self.search_paths
            .iter()
            .filter(|p| p.path.exists())
            .map(|p| p.path.clone())
            .collect()
    }
}

// ============================================================================
// Utilities
// ============================================================================

/// Load a single settings file as a JSON value
fn load_json_value(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;

    // settings.json may carry comments (JSONC)
    let content = strip_json_comments(&content);

    serde_json::from_str(&content)
        .map_err(|e| Error::InvalidInput(format!("Invalid settings.json at {}: {}", path.display(), e)))
}

/// Deep-merge `later` into `base`: objects merge recursively, everything
/// else is replaced by the later value
fn merge_values(base: &mut Value, later: Value) {
    match (base, later) {
        (Value::Object(base_map), Value::Object(later_map)) => {
            for (key, value) in later_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base_slot, later_value) => *base_slot = later_value,
    }
}

/// Remove `//` and `/* */` comments outside of string literals
fn strip_json_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' => match chars.peek() {
                Some('/') => {
                    for c2 in chars.by_ref() {
                        if c2 == '\n' {
                            out.push('\n');
                            break;
                        }
                    }
                }
                Some('*') => {
                    chars.next();
                    let mut prev = '\0';
                    for c2 in chars.by_ref() {
                        if prev == '*' && c2 == '/' {
                            break;
                        }
                        prev = c2;
                    }
                }
                _ => out.push(c),
            },
            _ => out.push(c),
        }
    }

    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::AutoPushMode;
    use std::fs;

    #[test]
    fn test_missing_files_yield_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::with_paths(vec![dir.path().join("none.json")]);
        let config = loader.load_all().unwrap();
        assert!(config.enabled);
        assert_eq!(config.auto_commit_delay, 30_000);
    }

    #[test]
    fn test_layer_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("user.json");
        let project = dir.path().join("project.json");

        fs::write(
            &user,
            r#"{ "autoCommitDelay": 10000, "autoPush": "off", "ai": { "enabled": true } }"#,
        )
        .unwrap();
        fs::write(&project, r#"{ "autoCommitDelay": 5000 }"#).unwrap();

        let loader = ConfigLoader::with_paths(vec![user, project]);
        let config = loader.load_all().unwrap();

        // project overrides only the key it sets
        assert_eq!(config.auto_commit_delay, 5000);
        assert_eq!(config.auto_push, AutoPushMode::Off);
        assert!(config.ai.enabled);
    }

    #[test]
    fn test_nested_merge_keeps_sibling_keys() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");

        fs::write(&a, r#"{ "ai": { "enabled": true, "provider": "claude" } }"#).unwrap();
        fs::write(&b, r#"{ "ai": { "provider": "openai" } }"#).unwrap();

        let loader = ConfigLoader::with_paths(vec![a, b]);
        let config = loader.load_all().unwrap();

        assert!(config.ai.enabled);
        assert_eq!(config.ai.provider.as_deref(), Some("openai"));
    }

    #[test]
    fn test_jsonc_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            "{\n  // debounce\n  \"autoCommitDelay\": 1234, /* inline */ \"filePattern\": \"**/*.rs\"\n}",
        )
        .unwrap();

        let loader = ConfigLoader::with_paths(vec![path]);
        let config = loader.load_all().unwrap();
        assert_eq!(config.auto_commit_delay, 1234);
        assert_eq!(config.file_pattern, "**/*.rs");
    }

    #[test]
    fn test_strip_comments_preserves_strings() {
        let input = r#"{ "filePattern": "a//b" }"#;
        assert_eq!(strip_json_comments(input), input);
    }
}
