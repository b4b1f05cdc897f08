//! Commit cycle
//!
//! One debounce fire produces one cycle: guard the committing flag, stage
//! the matching changes, turn the staged diff into a message, commit, and
//! hand off to the push continuation when configured. Fatal errors abort
//! the cycle and surface an error status; the engine stays enabled for the
//! next trigger.

use crate::engine::EngineInner;
use crate::state::Operation;
use savepoint_core::{
    ChangeStager, GitError, GitGateway, SkipReason, StageOutcome, StagePolicy, StagingError,
    VcsRunner,
};
use savepoint_foundation::{AutoPushMode, EngineStatus, SavepointConfig, StatusEvent};
use savepoint_provider::{fallback_message, ProviderError};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

// ============================================================================
// Errors and outcome
// ============================================================================

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("No repository resolved for this operation")]
    NoRepository,

    #[error("Staging failed: {0}")]
    Staging(#[from] StagingError),

    #[error("Could not read the staged diff: {0}")]
    Diff(GitError),

    #[error("Staged diff is empty; no message can be generated")]
    EmptyDiff,

    #[error("Message generation failed: {0}")]
    Message(#[from] ProviderError),

    #[error("Commit failed: {0}")]
    Commit(GitError),

    #[error("Sync failed: {0}")]
    Sync(GitError),
}

/// Result of one commit cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A commit was created
    Committed {
        hash: String,
        message: String,
        files: usize,
    },

    /// Nothing to commit; not an error
    Skipped(SkipReason),

    /// Another cycle held the committing flag; this attempt was dropped
    AlreadyRunning,
}

// ============================================================================
// Cycle
// ============================================================================

impl EngineInner {
    /// Run one commit cycle against `repo`
    pub(crate) async fn run_cycle(
        &self,
        repo: &Path,
    ) -> Result<CommitOutcome, EngineError> {
        // at-most-one commit in flight; concurrent attempts drop here,
        // before any staging or VCS side effects
        let Some(_guard) = self.state.try_begin(Operation::Committing) else {
            debug!("Commit already in flight; dropping attempt");
            return Ok(CommitOutcome::AlreadyRunning);
        };

        let config = self.config_snapshot();
        self.status
            .publish(StatusEvent::with_detail(EngineStatus::Syncing, "commit"));

        let gateway = GitGateway::new(self.runner.clone(), repo);
        let result = self.commit_once(&gateway, &config).await;

        match &result {
            Ok(CommitOutcome::Committed { hash, .. }) => {
                self.status.publish(StatusEvent::with_detail(
                    EngineStatus::Enabled,
                    format!("committed {}", hash),
                ));
            }
            Ok(_) => self.status.publish_status(EngineStatus::Enabled),
            Err(e) => self.fail(e.to_string()),
        }

        // push continuation belongs to the same logical cycle
        if let Ok(CommitOutcome::Committed { .. }) = &result {
            if config.auto_push == AutoPushMode::OnCommit {
                let _ = self.run_push(&gateway, &config).await;
            }
        }

        result
    }

    async fn commit_once(
        &self,
        gateway: &GitGateway<Arc<dyn VcsRunner>>,
        config: &SavepointConfig,
    ) -> Result<CommitOutcome, EngineError> {
        let policy = StagePolicy {
            pattern: config.file_pattern.clone(),
            min_changed_files: config.min_changed_files,
            min_changed_lines: config.min_changed_lines,
            enforce_thresholds_for_staged: config.enforce_thresholds_for_staged,
        };

        let files = match ChangeStager::new(gateway).stage_changes(&policy).await? {
            StageOutcome::Skipped(reason) => {
                debug!(?reason, "Cycle skipped");
                return Ok(CommitOutcome::Skipped(reason));
            }
            StageOutcome::Ready { files, .. } => files,
        };

        let message = if config.ai.enabled {
            let diff = gateway.staged_diff().await.map_err(EngineError::Diff)?;
            if diff.is_empty() {
                return Err(EngineError::EmptyDiff);
            }
            self.generator.generate(&diff, &config.ai).await?
        } else {
            fallback_message()
        };

        let hash = gateway.commit(&message).await.map_err(EngineError::Commit)?;
        info!(hash = %hash, files = files.len(), "Committed: {}", message);

        Ok(CommitOutcome::Committed {
            hash,
            message,
            files: files.len(),
        })
    }
}
