//! Login-shell PATH probe
//!
//! CLI tools installed by version managers are often only on the PATH a
//! user's interactive shell builds from its rc files, which a GUI-launched
//! process never sees. We ask the user's shell for its PATH once per
//! process and merge it into every lookup.

use std::time::Duration;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Probe timeout; a shell stuck in rc-file prompts must not hang lookups
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

static SHELL_PATH: OnceCell<Option<String>> = OnceCell::const_new();

/// PATH as reported by the user's interactive shell, memoized per process.
///
/// Returns `None` on Windows, when `$SHELL` is unset, or when the probe
/// fails; lookups then fall back to the process PATH alone.
pub async fn login_shell_path() -> Option<String> {
    SHELL_PATH
        .get_or_init(|| async { probe_shell_path().await })
        .await
        .clone()
}

async fn probe_shell_path() -> Option<String> {
    if cfg!(windows) {
        return None;
    }

    let shell = std::env::var("SHELL").ok().filter(|s| !s.is_empty())?;

    // Interactive (-i) so rc files run, but not a login shell; profile
    // files that only login shells read are out of scope for the probe.
    let result = tokio::time::timeout(
        PROBE_TIMEOUT,
        Command::new(&shell)
            .args(["-i", "-c", "echo $PATH"])
            .output(),
    )
    .await;

    match result {
        Ok(Ok(output)) if output.status.success() => {
            let path = String::from_utf8_lossy(&output.stdout)
                .lines()
                .last()
                .unwrap_or_default()
                .trim()
                .to_string();
            if path.is_empty() {
                warn!(shell = %shell, "Shell PATH probe returned nothing");
                None
            } else {
                debug!(shell = %shell, "Captured login-shell PATH");
                Some(path)
            }
        }
        Ok(Ok(output)) => {
            warn!(
                shell = %shell,
                status = ?output.status.code(),
                "Shell PATH probe exited non-zero"
            );
            None
        }
        Ok(Err(e)) => {
            warn!(shell = %shell, "Shell PATH probe failed to spawn: {}", e);
            None
        }
        Err(_) => {
            warn!(shell = %shell, "Shell PATH probe timed out");
            None
        }
    }
}

/// Join PATH-like strings, de-duplicating entries while preserving
/// first-seen order.
pub fn merge_path_strings<I, S>(sources: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let separator = if cfg!(windows) { ';' } else { ':' };
    let mut seen = std::collections::HashSet::new();
    let mut merged = Vec::new();

    for source in sources {
        for entry in source.as_ref().split(separator) {
            if entry.is_empty() {
                continue;
            }
            if seen.insert(entry.to_string()) {
                merged.push(entry.to_string());
            }
        }
    }

    merged.join(&separator.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_dedupes_preserving_order() {
        let merged = merge_path_strings(["/a:/b:/c", "/b:/d", "/a:/e"]);
        assert_eq!(merged, "/a:/b:/c:/d:/e");
    }

    #[test]
    fn test_merge_skips_empty_entries() {
        let merged = merge_path_strings(["/a::/b", "", ":/c"]);
        assert_eq!(merged, "/a:/b:/c");
    }
}
