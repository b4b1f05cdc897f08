//! Provider, model, and auth management commands
//!
//! These edit the project-level settings file in place (creating it when
//! missing) and the user-level secret store. Credentials never touch the
//! settings files.

use anyhow::{bail, Context};
use savepoint_foundation::{
    AiConfig, ConfigLoader, JsonStore, SavepointConfig, SecretKind, SecretStore,
};
use savepoint_foundation::ExecutableLocator;
use savepoint_provider::{cli_tool, ProviderRegistry};
use serde_json::{json, Value};
use std::path::Path;

const SETTINGS_FILE: &str = "settings.json";

/// Read-modify-write on the project settings file
fn update_settings(workspace: &Path, apply: impl FnOnce(&mut Value)) -> anyhow::Result<()> {
    let store = JsonStore::project(workspace);
    let mut value: Value = if store.exists(SETTINGS_FILE) {
        store
            .load(SETTINGS_FILE)
            .context("settings.json is not valid JSON")?
    } else {
        json!({})
    };

    apply(&mut value);
    store.save(SETTINGS_FILE, &value)?;
    Ok(())
}

fn known_provider(registry: &ProviderRegistry, id: &str) -> anyhow::Result<()> {
    if registry.get(id).is_none() {
        bail!(
            "Unknown provider '{}'; known providers: {}",
            id,
            registry.ids().join(", ")
        );
    }
    Ok(())
}

fn load_config(workspace: &Path) -> anyhow::Result<SavepointConfig> {
    Ok(ConfigLoader::new(workspace).load_all()?)
}

// ============================================================================
// provider
// ============================================================================

pub async fn provider_list(workspace: &Path, registry: &ProviderRegistry) -> anyhow::Result<()> {
    let config = load_config(workspace)?;

    for descriptor in registry.descriptors(&config.ai) {
        let active = if descriptor.active { "*" } else { " " };
        let enabled = if descriptor.enabled { "enabled" } else { "disabled" };
        let available = match registry.get(&descriptor.id) {
            Some(provider) if provider.is_available().await => "available",
            _ => "unavailable",
        };
        println!(
            "{} {:<10} {:<22} [{}] [{}] model: {}",
            active, descriptor.id, descriptor.display_name, enabled, available, descriptor.model
        );
    }

    Ok(())
}

pub fn provider_select(
    workspace: &Path,
    registry: &ProviderRegistry,
    id: &str,
) -> anyhow::Result<()> {
    known_provider(registry, id)?;
    update_settings(workspace, |settings| {
        settings["ai"]["provider"] = json!(id);
    })?;
    println!("Active provider set to '{}'", id);
    Ok(())
}

pub fn provider_set_enabled(
    workspace: &Path,
    registry: &ProviderRegistry,
    id: &str,
    enabled: bool,
) -> anyhow::Result<()> {
    known_provider(registry, id)?;
    update_settings(workspace, |settings| {
        settings["ai"]["providers"][id]["enabled"] = json!(enabled);
    })?;
    println!(
        "Provider '{}' {}",
        id,
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

// ============================================================================
// model
// ============================================================================

pub fn model_set(
    workspace: &Path,
    registry: &ProviderRegistry,
    model: &str,
    provider: Option<&str>,
) -> anyhow::Result<()> {
    match provider {
        Some(id) => {
            known_provider(registry, id)?;
            update_settings(workspace, |settings| {
                settings["ai"]["providers"][id]["model"] = json!(model);
            })?;
            println!("Model for '{}' set to '{}'", id, model);
        }
        None => {
            update_settings(workspace, |settings| {
                settings["ai"]["model"] = json!(model);
            })?;
            println!("Global model override set to '{}'", model);
        }
    }
    Ok(())
}

// ============================================================================
// auth
// ============================================================================

pub async fn auth_set_key(
    registry: &ProviderRegistry,
    secrets: &SecretStore,
    id: &str,
) -> anyhow::Result<()> {
    known_provider(registry, id)?;

    eprintln!("Paste the API key for '{}' and press enter:", id);
    let mut key = String::new();
    tokio::io::AsyncBufReadExt::read_line(
        &mut tokio::io::BufReader::new(tokio::io::stdin()),
        &mut key,
    )
    .await?;

    secrets.set(id, SecretKind::ApiKey, key.trim())?;
    println!("API key for '{}' stored", id);
    Ok(())
}

pub async fn auth_login(workspace: &Path, registry: &ProviderRegistry, id: &str) -> anyhow::Result<()> {
    known_provider(registry, id)?;

    let tool = cli_tool(id).context("provider has no CLI backend")?;
    match ExecutableLocator::locate(tool).await {
        Some(resolution) => {
            println!(
                "Found '{}' at {} ({:?})",
                resolution.name,
                resolution.path.display(),
                resolution.provenance
            );
            update_settings(workspace, |settings| {
                settings["auth"]["providers"][id] = json!("cliLogin");
            })?;
            println!("Provider '{}' switched to CLI login", id);
            Ok(())
        }
        None => bail!(
            "No CLI for '{}' found on this machine; sign in with the vendor CLI first",
            id
        ),
    }
}

// ============================================================================
// status
// ============================================================================

pub async fn status(workspace: &Path, registry: &ProviderRegistry) -> anyhow::Result<()> {
    let config = load_config(workspace)?;

    println!("enabled:        {}", config.enabled);
    println!("commit delay:   {}ms", config.auto_commit_delay);
    println!("file pattern:   {}", config.file_pattern);
    println!("auto push:      {:?} ({:?})", config.auto_push, config.push_mode);
    println!("auto pull:      {:?}", config.auto_pull);
    if !config.exclude_branches.is_empty() {
        println!("excluded:       {}", config.exclude_branches.join(", "));
    }
    println!("ai messages:    {}", config.ai.enabled);
    if config.ai.enabled {
        print_ai_summary(&config.ai, registry);
    }

    Ok(())
}

fn print_ai_summary(ai: &AiConfig, registry: &ProviderRegistry) {
    match registry.select_active(ai) {
        Ok(provider) => println!(
            "ai provider:    {} (model: {})",
            provider.id(),
            registry.resolve_model(ai, provider.as_ref())
        ),
        Err(e) => println!("ai provider:    {}", e),
    }
    println!("ai style:       {:?} / {:?}", ai.style, ai.length);
    println!(
        "ai retry:       {} attempts, {}ms delay, fallback: {}",
        ai.retry_attempts, ai.retry_delay, ai.fallback_on_failure
    );
}
