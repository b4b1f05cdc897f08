//! Filesystem save events
//!
//! Bridges `notify` into the engine: write/create events under the watched
//! workspace become save events, with the repository's own bookkeeping
//! paths filtered out so commits cannot re-trigger themselves.

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use savepoint_foundation::CONFIG_DIR_NAME;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Paths that must never count as saves
fn is_internal(path: &Path) -> bool {
    path.components().any(|c| {
        let name = c.as_os_str();
        name == ".git" || name == CONFIG_DIR_NAME
    })
}

fn is_save_event(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

/// Watch a workspace recursively. The returned watcher must stay alive for
/// events to keep flowing.
pub fn watch_workspace(
    root: &Path,
) -> anyhow::Result<(RecommendedWatcher, mpsc::UnboundedReceiver<PathBuf>)> {
    let (tx, rx) = mpsc::unbounded_channel();

    let mut watcher = notify::recommended_watcher(move |result: Result<Event, notify::Error>| {
        match result {
            Ok(event) if is_save_event(&event.kind) => {
                for path in event.paths {
                    if is_internal(&path) {
                        continue;
                    }
                    debug!(path = %path.display(), "Save event");
                    let _ = tx.send(path);
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Watcher error: {}", e),
        }
    })?;

    watcher.watch(root, RecursiveMode::Recursive)?;
    Ok((watcher, rx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_paths_filtered() {
        assert!(is_internal(Path::new("/repo/.git/index.lock")));
        assert!(is_internal(Path::new("/repo/.savepoint/settings.json")));
        assert!(!is_internal(Path::new("/repo/src/lib.rs")));
        assert!(!is_internal(Path::new("/repo/src/gitlab.rs")));
    }

    #[test]
    fn test_event_kinds() {
        assert!(is_save_event(&EventKind::Create(notify::event::CreateKind::File)));
        assert!(is_save_event(&EventKind::Modify(notify::event::ModifyKind::Any)));
        assert!(!is_save_event(&EventKind::Remove(notify::event::RemoveKind::File)));
        assert!(!is_save_event(&EventKind::Access(notify::event::AccessKind::Any)));
    }
}
