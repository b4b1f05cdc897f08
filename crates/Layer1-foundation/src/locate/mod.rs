//! Executable discovery
//!
//! Resolves a logical tool name ("claude", "codex", "copilot") to something
//! invokable, across heterogeneous shell/PATH environments. Strategies run
//! in order and short-circuit on the first hit:
//!
//! 1. Direct invocation of the bare name with a probe flag
//! 2. `which`-style lookup against the merged PATH
//! 3. Scan of known install directories and version-manager bin directories
//!
//! Misses are never cached; a tool installed mid-session is found on the
//! next lookup.

mod shell_path;

pub use shell_path::{login_shell_path, merge_path_strings};

use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, trace};

// ============================================================================
// Resolution types
// ============================================================================

/// Which strategy produced a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Bare name ran directly
    Direct,

    /// Found by PATH lookup
    Which,

    /// Found by scanning a known install directory
    KnownDir,

    /// Found in a version manager's per-version bin directory
    VersionManager,
}

/// A verified mapping from logical tool name to invokable path
#[derive(Debug, Clone)]
pub struct ExecutableResolution {
    /// Logical name that was asked for
    pub name: String,

    /// Absolute path, or the bare name when direct invocation worked
    pub path: PathBuf,

    /// Strategy that found it
    pub provenance: Provenance,

    /// Merged PATH to supply when spawning it
    pub path_env: String,
}

// ============================================================================
// Locator
// ============================================================================

/// Executable locator over the merged login-shell/process PATH
pub struct ExecutableLocator;

impl ExecutableLocator {
    /// Resolve a tool name. `None` means not found anywhere; that outcome
    /// is not cached.
    pub async fn locate(name: &str) -> Option<ExecutableResolution> {
        let path_env = merged_path_env().await;

        // 1. Direct invocation
        if try_direct(name, &path_env).await {
            debug!(tool = name, "Resolved by direct invocation");
            return Some(ExecutableResolution {
                name: name.to_string(),
                path: PathBuf::from(name),
                provenance: Provenance::Direct,
                path_env,
            });
        }

        // 2. which lookup
        if let Some(found) = try_which(name, &path_env) {
            debug!(tool = name, path = %found.display(), "Resolved by which");
            return Some(ExecutableResolution {
                name: name.to_string(),
                path: found,
                provenance: Provenance::Which,
                path_env,
            });
        }

        // 3. Directory scans
        if let Some((found, provenance)) = scan_directories(name) {
            debug!(tool = name, path = %found.display(), ?provenance, "Resolved by scan");
            return Some(ExecutableResolution {
                name: name.to_string(),
                path: found,
                provenance,
                path_env,
            });
        }

        debug!(tool = name, "Not found by any strategy");
        None
    }
}

/// Merged PATH: login-shell PATH, process PATH, then the known-dir list.
/// De-duplicated preserving first-seen order; probe memoized per process.
pub async fn merged_path_env() -> String {
    let mut sources = Vec::new();
    if let Some(shell_path) = login_shell_path().await {
        sources.push(shell_path);
    }
    if let Ok(process_path) = std::env::var("PATH") {
        sources.push(process_path);
    }
    for dir in known_install_dirs() {
        sources.push(dir.to_string_lossy().into_owned());
    }
    merge_path_strings(sources)
}

// ============================================================================
// Strategies
// ============================================================================

/// Run the bare name with a probe flag. "File not found" is a miss; any
/// other outcome (including an old binary rejecting the flag with a
/// non-zero exit) proves the command is invokable.
async fn try_direct(name: &str, path_env: &str) -> bool {
    let result = Command::new(name)
        .arg("--version")
        .env("PATH", path_env)
        .output()
        .await;

    match result {
        Ok(_) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            trace!(tool = name, "Direct probe errored but command exists: {}", e);
            true
        }
    }
}

fn try_which(name: &str, path_env: &str) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    which::which_in(name, Some(path_env), cwd).ok()
}

fn scan_directories(name: &str) -> Option<(PathBuf, Provenance)> {
    scan_dir_lists(name, &known_install_dirs(), &version_manager_dirs())
}

fn scan_dir_lists(
    name: &str,
    known: &[PathBuf],
    version_manager: &[PathBuf],
) -> Option<(PathBuf, Provenance)> {
    for dir in known {
        if let Some(found) = find_in_dir(dir, name) {
            return Some((found, Provenance::KnownDir));
        }
    }
    for dir in version_manager {
        if let Some(found) = find_in_dir(dir, name) {
            return Some((found, Provenance::VersionManager));
        }
    }
    None
}

/// Look for a platform filename variant of `name` inside `dir`
fn find_in_dir(dir: &Path, name: &str) -> Option<PathBuf> {
    for variant in filename_variants(name) {
        let candidate = dir.join(&variant);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

fn filename_variants(name: &str) -> Vec<String> {
    if cfg!(windows) {
        vec![
            format!("{name}.exe"),
            format!("{name}.cmd"),
            format!("{name}.bat"),
            name.to_string(),
        ]
    } else {
        vec![name.to_string()]
    }
}

// ============================================================================
// Directory lists
// ============================================================================

/// Fixed list of common install locations
fn known_install_dirs() -> Vec<PathBuf> {
    let mut dirs_out = Vec::new();
    let home = dirs::home_dir();

    if cfg!(windows) {
        if let Ok(local) = std::env::var("LOCALAPPDATA") {
            dirs_out.push(PathBuf::from(&local).join("Programs"));
        }
        if let Ok(appdata) = std::env::var("APPDATA") {
            dirs_out.push(PathBuf::from(&appdata).join("npm"));
        }
    } else {
        dirs_out.push(PathBuf::from("/usr/local/bin"));
        dirs_out.push(PathBuf::from("/opt/homebrew/bin"));
    }

    if let Some(home) = home {
        dirs_out.push(home.join(".local/bin"));
        dirs_out.push(home.join("bin"));
        dirs_out.push(home.join(".npm-global/bin"));
        dirs_out.push(home.join(".yarn/bin"));
        dirs_out.push(home.join(".bun/bin"));
        // claude's standalone installer target
        dirs_out.push(home.join(".claude/local"));
    }

    dirs_out
}

/// Per-version bin directories of the common version managers, enumerated
/// dynamically so newly installed versions are picked up.
fn version_manager_dirs() -> Vec<PathBuf> {
    let mut dirs_out = Vec::new();
    let Some(home) = dirs::home_dir() else {
        return dirs_out;
    };

    // nvm: ~/.nvm/versions/node/<version>/bin
    push_subdirs(&mut dirs_out, &home.join(".nvm/versions/node"), "bin");

    // fnm: <data>/fnm/node-versions/<version>/installation/bin
    for base in [
        home.join(".local/share/fnm/node-versions"),
        home.join(".fnm/node-versions"),
        home.join("Library/Application Support/fnm/node-versions"),
    ] {
        push_subdirs(&mut dirs_out, &base, "installation/bin");
    }

    // asdf: ~/.asdf/installs/<tool>/<version>/bin
    if let Ok(tools) = std::fs::read_dir(home.join(".asdf/installs")) {
        for tool in tools.flatten() {
            push_subdirs(&mut dirs_out, &tool.path(), "bin");
        }
    }

    // volta and n keep a single stable bin
    dirs_out.push(home.join(".volta/bin"));
    dirs_out.push(home.join("n/bin"));

    dirs_out
}

/// Append `<base>/<entry>/<suffix>` for every subdirectory of `base`
fn push_subdirs(out: &mut Vec<PathBuf>, base: &Path, suffix: &str) {
    let Ok(entries) = std::fs::read_dir(base) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path().join(suffix);
        if path.is_dir() {
            out.push(path);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[cfg(unix)]
    fn make_executable(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_find_in_dir_hits_plain_name() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("mytool");
        fs::write(&tool, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        make_executable(&tool);

        assert_eq!(find_in_dir(dir.path(), "mytool"), Some(tool));
        assert_eq!(find_in_dir(dir.path(), "othertool"), None);
    }

    #[test]
    fn test_push_subdirs_enumerates_versions() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("versions");
        fs::create_dir_all(base.join("v20.1.0/bin")).unwrap();
        fs::create_dir_all(base.join("v22.0.0/bin")).unwrap();
        // files and bin-less versions are skipped
        fs::write(base.join("alias"), "v22").unwrap();
        fs::create_dir_all(base.join("v18.0.0")).unwrap();

        let mut out = Vec::new();
        push_subdirs(&mut out, &base, "bin");
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|p| p.ends_with("bin")));
    }

    #[test]
    fn test_scan_provenance_prefers_known_dirs() {
        let known = tempfile::tempdir().unwrap();
        let vm = tempfile::tempdir().unwrap();

        let tool = known.path().join("sometool");
        fs::write(&tool, "").unwrap();
        fs::write(vm.path().join("sometool"), "").unwrap();

        let (found, provenance) = scan_dir_lists(
            "sometool",
            &[known.path().to_path_buf()],
            &[vm.path().to_path_buf()],
        )
        .unwrap();
        assert_eq!(found, tool);
        assert_eq!(provenance, Provenance::KnownDir);
    }

    #[test]
    fn test_scan_falls_through_to_version_manager_dirs() {
        let known = tempfile::tempdir().unwrap();
        let vm = tempfile::tempdir().unwrap();
        fs::write(vm.path().join("sometool"), "").unwrap();

        let (found, provenance) = scan_dir_lists(
            "sometool",
            &[known.path().to_path_buf()],
            &[vm.path().to_path_buf()],
        )
        .unwrap();
        assert_eq!(found, vm.path().join("sometool"));
        assert_eq!(provenance, Provenance::VersionManager);
    }

    #[tokio::test]
    async fn test_locate_missing_tool_is_none_not_error() {
        let resolution = ExecutableLocator::locate("definitely-not-a-real-tool-xyzzy").await;
        assert!(resolution.is_none());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_locate_finds_sh_directly() {
        // `sh` exists on any unix host; direct invocation should win
        let resolution = ExecutableLocator::locate("sh").await.unwrap();
        assert_eq!(resolution.provenance, Provenance::Direct);
        assert_eq!(resolution.path, PathBuf::from("sh"));
        assert!(!resolution.path_env.is_empty());
    }
}
