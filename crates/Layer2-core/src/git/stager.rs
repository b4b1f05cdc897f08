//! Change staging
//!
//! Discovers changed paths, intersects them with the configured glob
//! filter, and stages the survivors one path at a time. Per-path staging
//! failures are classified: some are expected in a live working tree
//! (submodule-internal paths, ignored files, vanished pathspecs) and only
//! skip that path; anything else aborts the cycle.

use super::gateway::{GitError, GitGateway, VcsRunner};
use glob::Pattern;
use thiserror::Error;
use tracing::{debug, warn};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("Invalid file pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error(transparent)]
    Vcs(#[from] GitError),
}

/// Why a per-path `git add` failure does not abort the cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkippableFailure {
    /// Path lives inside a submodule's internal tree
    SubmoduleInternal,

    /// Path is excluded by ignore rules
    Ignored,

    /// Pathspec resolved to no match (e.g. file vanished since status)
    NoPathspecMatch,
}

fn classify_stage_failure(stderr: &str) -> Option<SkippableFailure> {
    if stderr.contains("in submodule") {
        Some(SkippableFailure::SubmoduleInternal)
    } else if stderr.contains("ignored by one of your .gitignore files") {
        Some(SkippableFailure::Ignored)
    } else if stderr.contains("did not match any files") {
        Some(SkippableFailure::NoPathspecMatch)
    } else {
        None
    }
}

// ============================================================================
// Policy and outcome
// ============================================================================

/// Per-cycle staging policy, built from the configuration snapshot
#[derive(Debug, Clone)]
pub struct StagePolicy {
    /// Glob applied to changed paths
    pub pattern: String,

    /// Minimum changed files (0 = disabled)
    pub min_changed_files: usize,

    /// Minimum changed lines (0 = disabled)
    pub min_changed_lines: usize,

    /// Apply the thresholds even to a pre-staged change set
    pub enforce_thresholds_for_staged: bool,
}

impl StagePolicy {
    pub fn match_all() -> Self {
        Self {
            pattern: "**/*".to_string(),
            min_changed_files: 0,
            min_changed_lines: 0,
            enforce_thresholds_for_staged: false,
        }
    }
}

/// Why a cycle ended without a commit attempt; none of these are errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Working tree is clean
    NoChanges,

    /// Changes exist but none match the file pattern
    NoMatches,

    /// Matched fewer files than the configured minimum
    BelowFileThreshold { matched: usize, minimum: usize },

    /// Fewer changed lines than the configured minimum
    BelowLineThreshold { changed: usize, minimum: usize },

    /// Every matched path failed staging for a skippable reason
    NothingStaged,
}

/// Result of a staging pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Commit should proceed against these staged paths
    Ready {
        files: Vec<String>,
        /// The set was staged by the user before the save arrived
        pre_staged: bool,
    },

    /// Cycle should be skipped
    Skipped(SkipReason),
}

// ============================================================================
// ChangeStager
// ============================================================================

/// Stages the matching subset of working-tree changes for one cycle
pub struct ChangeStager<'a, R: VcsRunner> {
    gateway: &'a GitGateway<R>,
}

impl<'a, R: VcsRunner> ChangeStager<'a, R> {
    pub fn new(gateway: &'a GitGateway<R>) -> Self {
        Self { gateway }
    }

    /// Run the staging pipeline for one commit cycle
    pub async fn stage_changes(&self, policy: &StagePolicy) -> Result<StageOutcome, StagingError> {
        let pattern = Pattern::new(&policy.pattern).map_err(|e| StagingError::InvalidPattern {
            pattern: policy.pattern.clone(),
            message: e.to_string(),
        })?;

        // Pre-staged changes take the short path: commit what the user
        // staged, with thresholds bypassed unless explicitly enforced.
        let pre_staged = self.gateway.staged_paths().await?;
        if !pre_staged.is_empty() {
            if policy.enforce_thresholds_for_staged {
                if let Some(reason) = self.check_thresholds(policy, pre_staged.len()).await? {
                    return Ok(StageOutcome::Skipped(reason));
                }
            }
            debug!(files = pre_staged.len(), "Proceeding with pre-staged changes");
            return Ok(StageOutcome::Ready {
                files: pre_staged,
                pre_staged: true,
            });
        }

        let changed = self.gateway.changed_paths().await?;
        if changed.is_empty() {
            return Ok(StageOutcome::Skipped(SkipReason::NoChanges));
        }

        let matched: Vec<String> = changed
            .iter()
            .filter(|c| pattern.matches(&c.path))
            .map(|c| c.path.clone())
            .collect();

        if matched.is_empty() {
            return Ok(StageOutcome::Skipped(SkipReason::NoMatches));
        }

        if let Some(reason) = self.check_thresholds(policy, matched.len()).await? {
            return Ok(StageOutcome::Skipped(reason));
        }

        // Stage one path at a time so one bad path cannot poison the rest
        let mut staged = Vec::new();
        for path in &matched {
            match self.gateway.stage(path).await {
                Ok(()) => staged.push(path.clone()),
                Err(e) => {
                    let stderr = e.stderr().unwrap_or_default();
                    match classify_stage_failure(stderr) {
                        Some(reason) => {
                            warn!(path = %path, ?reason, "Skipping unstageable path");
                        }
                        None => return Err(StagingError::Vcs(e)),
                    }
                }
            }
        }

        if staged.is_empty() {
            return Ok(StageOutcome::Skipped(SkipReason::NothingStaged));
        }

        debug!(files = staged.len(), "Staged changes");
        Ok(StageOutcome::Ready {
            files: staged,
            pre_staged: false,
        })
    }

    async fn check_thresholds(
        &self,
        policy: &StagePolicy,
        matched_files: usize,
    ) -> Result<Option<SkipReason>, StagingError> {
        if policy.min_changed_files > 0 && matched_files < policy.min_changed_files {
            return Ok(Some(SkipReason::BelowFileThreshold {
                matched: matched_files,
                minimum: policy.min_changed_files,
            }));
        }

        if policy.min_changed_lines > 0 {
            let changed = self.gateway.changed_line_count().await?;
            if changed < policy.min_changed_lines {
                return Ok(Some(SkipReason::BelowLineThreshold {
                    changed,
                    minimum: policy.min_changed_lines,
                }));
            }
        }

        Ok(None)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::path::Path;
    use std::sync::Arc;

    /// Scripted runner: maps a command prefix to a canned response
    struct ScriptedRunner {
        responses: Vec<(&'static str, Result<String, (String, String)>)>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedRunner {
        fn new(responses: Vec<(&'static str, Result<String, (String, String)>)>) -> Self {
            Self {
                responses,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn call_log(&self) -> Arc<Mutex<Vec<String>>> {
            self.calls.clone()
        }
    }

    #[async_trait]
    impl VcsRunner for ScriptedRunner {
        async fn run(&self, args: &[&str], _cwd: &Path) -> Result<String, GitError> {
            let joined = args.join(" ");
            self.calls.lock().push(joined.clone());
            for (prefix, response) in &self.responses {
                if joined.starts_with(prefix) {
                    return match response {
                        Ok(stdout) => Ok(stdout.clone()),
                        Err((command, stderr)) => Err(GitError::CommandFailed {
                            command: command.clone(),
                            stderr: stderr.clone(),
                        }),
                    };
                }
            }
            Ok(String::new())
        }
    }

    fn gateway(runner: ScriptedRunner) -> GitGateway<ScriptedRunner> {
        GitGateway::new(runner, "/repo")
    }

    #[tokio::test]
    async fn test_clean_tree_skips() {
        let runner = ScriptedRunner::new(vec![
            ("diff --cached --name-only", Ok(String::new())),
            ("status", Ok(String::new())),
        ]);
        let gw = gateway(runner);
        let outcome = ChangeStager::new(&gw)
            .stage_changes(&StagePolicy::match_all())
            .await
            .unwrap();
        assert_eq!(outcome, StageOutcome::Skipped(SkipReason::NoChanges));
    }

    #[tokio::test]
    async fn test_filter_mismatch_skips() {
        let runner = ScriptedRunner::new(vec![
            ("diff --cached --name-only", Ok(String::new())),
            ("status", Ok(" M notes.txt".to_string())),
        ]);
        let gw = gateway(runner);
        let policy = StagePolicy {
            pattern: "**/*.rs".to_string(),
            ..StagePolicy::match_all()
        };
        let outcome = ChangeStager::new(&gw).stage_changes(&policy).await.unwrap();
        assert_eq!(outcome, StageOutcome::Skipped(SkipReason::NoMatches));
    }

    #[tokio::test]
    async fn test_stages_matching_paths_individually() {
        let runner = ScriptedRunner::new(vec![
            ("diff --cached --name-only", Ok(String::new())),
            ("status", Ok(" M src/lib.rs\n?? src/new.rs\n M notes.txt".to_string())),
            ("add", Ok(String::new())),
        ]);
        let call_log = runner.call_log();
        let gw = gateway(runner);
        let policy = StagePolicy {
            pattern: "**/*.rs".to_string(),
            ..StagePolicy::match_all()
        };
        let outcome = ChangeStager::new(&gw).stage_changes(&policy).await.unwrap();

        assert_eq!(
            outcome,
            StageOutcome::Ready {
                files: vec!["src/lib.rs".to_string(), "src/new.rs".to_string()],
                pre_staged: false,
            }
        );
        let adds: Vec<_> = call_log
            .lock()
            .iter()
            .filter(|c| c.starts_with("add"))
            .cloned()
            .collect();
        assert_eq!(adds, vec!["add -- src/lib.rs", "add -- src/new.rs"]);
    }

    #[tokio::test]
    async fn test_ignored_path_is_skippable() {
        let runner = ScriptedRunner::new(vec![
            ("diff --cached --name-only", Ok(String::new())),
            ("status", Ok(" M src/lib.rs\n?? build.log".to_string())),
            (
                "add -- build.log",
                Err((
                    "add -- build.log".to_string(),
                    "The following paths are ignored by one of your .gitignore files:\nbuild.log".to_string(),
                )),
            ),
            ("add", Ok(String::new())),
        ]);
        let gw = gateway(runner);
        let outcome = ChangeStager::new(&gw)
            .stage_changes(&StagePolicy::match_all())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            StageOutcome::Ready {
                files: vec!["src/lib.rs".to_string()],
                pre_staged: false,
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_stage_failure_is_fatal() {
        let runner = ScriptedRunner::new(vec![
            ("diff --cached --name-only", Ok(String::new())),
            ("status", Ok(" M src/lib.rs".to_string())),
            (
                "add",
                Err(("add -- src/lib.rs".to_string(), "fatal: index is locked".to_string())),
            ),
        ]);
        let gw = gateway(runner);
        let result = ChangeStager::new(&gw)
            .stage_changes(&StagePolicy::match_all())
            .await;
        assert!(matches!(result, Err(StagingError::Vcs(_))));
    }

    #[tokio::test]
    async fn test_all_paths_skippable_means_skipped_cycle() {
        let runner = ScriptedRunner::new(vec![
            ("diff --cached --name-only", Ok(String::new())),
            ("status", Ok("?? vendor/file.rs".to_string())),
            (
                "add",
                Err((
                    "add -- vendor/file.rs".to_string(),
                    "fatal: Pathspec 'vendor/file.rs' is in submodule 'vendor'".to_string(),
                )),
            ),
        ]);
        let gw = gateway(runner);
        let outcome = ChangeStager::new(&gw)
            .stage_changes(&StagePolicy::match_all())
            .await
            .unwrap();
        assert_eq!(outcome, StageOutcome::Skipped(SkipReason::NothingStaged));
    }

    #[tokio::test]
    async fn test_pre_staged_bypasses_thresholds() {
        let runner = ScriptedRunner::new(vec![(
            "diff --cached --name-only",
            Ok("src/lib.rs".to_string()),
        )]);
        let gw = gateway(runner);
        let policy = StagePolicy {
            min_changed_files: 10,
            ..StagePolicy::match_all()
        };
        let outcome = ChangeStager::new(&gw).stage_changes(&policy).await.unwrap();
        assert_eq!(
            outcome,
            StageOutcome::Ready {
                files: vec!["src/lib.rs".to_string()],
                pre_staged: true,
            }
        );
    }

    #[tokio::test]
    async fn test_pre_staged_thresholds_enforced_when_configured() {
        let runner = ScriptedRunner::new(vec![(
            "diff --cached --name-only",
            Ok("src/lib.rs".to_string()),
        )]);
        let gw = gateway(runner);
        let policy = StagePolicy {
            min_changed_files: 10,
            enforce_thresholds_for_staged: true,
            ..StagePolicy::match_all()
        };
        let outcome = ChangeStager::new(&gw).stage_changes(&policy).await.unwrap();
        assert_eq!(
            outcome,
            StageOutcome::Skipped(SkipReason::BelowFileThreshold {
                matched: 1,
                minimum: 10
            })
        );
    }

    #[tokio::test]
    async fn test_line_threshold() {
        let runner = ScriptedRunner::new(vec![
            ("diff --cached --name-only", Ok(String::new())),
            ("status", Ok(" M src/lib.rs".to_string())),
            ("diff HEAD --numstat", Ok("2\t1\tsrc/lib.rs".to_string())),
        ]);
        let gw = gateway(runner);
        let policy = StagePolicy {
            min_changed_lines: 50,
            ..StagePolicy::match_all()
        };
        let outcome = ChangeStager::new(&gw).stage_changes(&policy).await.unwrap();
        assert_eq!(
            outcome,
            StageOutcome::Skipped(SkipReason::BelowLineThreshold {
                changed: 3,
                minimum: 50
            })
        );
    }

    #[test]
    fn test_classification_table() {
        assert_eq!(
            classify_stage_failure("fatal: Pathspec 'x' is in submodule 'sub'"),
            Some(SkippableFailure::SubmoduleInternal)
        );
        assert_eq!(
            classify_stage_failure("The following paths are ignored by one of your .gitignore files:"),
            Some(SkippableFailure::Ignored)
        );
        assert_eq!(
            classify_stage_failure("fatal: pathspec 'gone.rs' did not match any files"),
            Some(SkippableFailure::NoPathspecMatch)
        );
        assert_eq!(classify_stage_failure("fatal: index is locked"), None);
    }
}
