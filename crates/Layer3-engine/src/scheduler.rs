//! Save-event scheduling
//!
//! Every qualifying save (re)arms a single debounce timer; bursts coalesce
//! into one commit attempt keyed to the state after the last save. The
//! qualification gates run in order and any failure suppresses arming
//! silently - a save that doesn't qualify is simply not the engine's
//! business.

use crate::diagnostics::passes_validation;
use crate::engine::EngineInner;
use glob::Pattern;
use savepoint_core::{repository_root, GitGateway};
use savepoint_foundation::ValidationLevel;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// The single armed debounce timer and its target repository.
/// Superseded (aborted and replaced) by each new qualifying save.
pub(crate) struct PendingCommit {
    pub(crate) handle: JoinHandle<()>,
    pub(crate) repo: PathBuf,
}

impl EngineInner {
    /// Entry point for one save event
    pub(crate) async fn handle_save(&self, path: &Path) {
        // (a) engine enabled
        if !self.state.is_enabled() {
            return;
        }

        let config = self.config_snapshot();

        // (b) the saved path's repository resolves; failure is a no-op
        let Some(repo) = repository_root(path) else {
            debug!(path = %path.display(), "Save outside any repository; ignoring");
            return;
        };

        // preferred context is last-write-wins across save events
        *self.preferred_repo.lock() = Some(repo.clone());

        // (c) glob filter on the repo-relative path
        let relative = path.strip_prefix(&repo).unwrap_or(path);
        let pattern = match Pattern::new(&config.file_pattern) {
            Ok(pattern) => pattern,
            Err(e) => {
                warn!(pattern = %config.file_pattern, "Invalid file pattern: {}", e);
                return;
            }
        };
        if !pattern.matches_path(relative) {
            return;
        }

        // (d) branch exclusion
        let gateway = GitGateway::new(self.runner.clone(), &repo);
        match gateway.current_branch().await {
            Ok(branch) if config.is_branch_excluded(&branch) => {
                debug!(branch = %branch, "Branch excluded; not arming");
                return;
            }
            Ok(_) => {}
            Err(e) => {
                debug!("Could not resolve branch; not arming: {}", e);
                return;
            }
        }

        // (e) diagnostics gate
        if config.commit_validation_level != ValidationLevel::None {
            let worst = self.diagnostics.max_severity(path).await;
            if !passes_validation(config.commit_validation_level, worst) {
                debug!(path = %path.display(), "Diagnostics block this save");
                return;
            }
        }

        self.arm_commit_timer(repo, config.auto_commit_delay);
    }

    /// Cancel any pending timer and arm a fresh one
    pub(crate) fn arm_commit_timer(&self, repo: PathBuf, delay_ms: u64) {
        let Some(inner) = self.self_handle() else {
            return;
        };

        let mut timers = self.timers.lock();

        if let Some(pending) = timers.pending_commit.take() {
            pending.handle.abort();
        }

        let target = repo.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            // consume the pending slot; a save arriving mid-cycle arms anew
            inner.timers.lock().pending_commit = None;
            let _ = inner.run_cycle(&target).await;
        });

        timers.pending_commit = Some(PendingCommit { handle, repo });
    }

    /// Abort the pending debounce timer, if any
    pub(crate) fn clear_commit_timer(&self) {
        if let Some(pending) = self.timers.lock().pending_commit.take() {
            debug!(repo = %pending.repo.display(), "Cleared pending commit timer");
            pending.handle.abort();
        }
    }
}
