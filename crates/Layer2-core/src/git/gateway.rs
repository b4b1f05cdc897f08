//! Version control gateway
//!
//! Thin command boundary over git. Everything above this module treats
//! "run a VCS command and get stdout/stderr" as a primitive; the
//! `VcsRunner` trait is that primitive, and `GitGateway` layers the
//! derived queries (branch, diff, changed paths, remote/upstream) on top.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum GitError {
    #[error("Not a git repository: {0}")]
    NotARepository(PathBuf),

    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("No staged changes to commit")]
    NothingToCommit,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GitError {
    /// stderr of a failed command, when there is one
    pub fn stderr(&self) -> Option<&str> {
        match self {
            GitError::CommandFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

// ============================================================================
// Runner trait
// ============================================================================

/// Runs a single VCS command in a working directory.
///
/// Production uses `ProcessRunner`; tests substitute scripted runners to
/// assert on command sequencing without a git binary.
#[async_trait]
pub trait VcsRunner: Send + Sync {
    /// Run `git <args>` in `cwd`, returning trimmed stdout on success and
    /// the command's stderr inside the error on failure.
    async fn run(&self, args: &[&str], cwd: &Path) -> Result<String, GitError>;
}

#[async_trait]
impl<T: VcsRunner + ?Sized> VcsRunner for std::sync::Arc<T> {
    async fn run(&self, args: &[&str], cwd: &Path) -> Result<String, GitError> {
        (**self).run(args, cwd).await
    }
}

/// `VcsRunner` over a real `git` subprocess
pub struct ProcessRunner;

#[async_trait]
impl VcsRunner for ProcessRunner {
    async fn run(&self, args: &[&str], cwd: &Path) -> Result<String, GitError> {
        let output = tokio::process::Command::new("git")
            .args(args)
            .current_dir(cwd)
            .output()
            .await?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(GitError::CommandFailed {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

// ============================================================================
// Changed paths
// ============================================================================

/// Working-tree status of a single path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
    /// Rename pair collapsed onto the new path
    Renamed { from: String },
    /// Copy pair collapsed onto the new path
    Copied { from: String },
    Untracked,
}

/// One changed path with its status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedPath {
    pub path: String,
    pub status: ChangeStatus,
}

// ============================================================================
// Gateway
// ============================================================================

/// Derived git queries over a repository root
pub struct GitGateway<R: VcsRunner> {
    runner: R,
    root: PathBuf,
}

impl<R: VcsRunner> GitGateway<R> {
    pub fn new(runner: R, root: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            root: root.into(),
        }
    }

    /// Walk up from `path` to the repository root
    pub fn discover(runner: R, path: &Path) -> Result<Self, GitError> {
        let root = find_git_root(path)?;
        Ok(Self { runner, root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run a git command at the repository root
    pub async fn run(&self, args: &[&str]) -> Result<String, GitError> {
        self.runner.run(args, &self.root).await
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub async fn current_branch(&self) -> Result<String, GitError> {
        self.run(&["rev-parse", "--abbrev-ref", "HEAD"]).await
    }

    /// Diff of staged changes
    pub async fn staged_diff(&self) -> Result<String, GitError> {
        self.run(&["diff", "--cached"]).await
    }

    /// Whether anything is staged
    pub async fn has_staged_changes(&self) -> Result<bool, GitError> {
        let names = self.run(&["diff", "--cached", "--name-only"]).await?;
        Ok(!names.is_empty())
    }

    /// Paths staged for the next commit
    pub async fn staged_paths(&self) -> Result<Vec<String>, GitError> {
        let names = self.run(&["diff", "--cached", "--name-only"]).await?;
        Ok(names.lines().map(|l| l.to_string()).collect())
    }

    /// Changed paths from porcelain status. Rename/copy pairs are resolved
    /// to the new path; the old path is consumed, not emitted separately.
    pub async fn changed_paths(&self) -> Result<Vec<ChangedPath>, GitError> {
        let output = self.run(&["status", "--porcelain=v1"]).await?;
        Ok(parse_porcelain(&output))
    }

    /// Total added+deleted lines in the working tree relative to HEAD
    pub async fn changed_line_count(&self) -> Result<usize, GitError> {
        let output = self.run(&["diff", "HEAD", "--numstat"]).await?;
        Ok(parse_numstat_total(&output))
    }

    /// Whether any remote is configured
    pub async fn has_remote(&self) -> Result<bool, GitError> {
        let remotes = self.run(&["remote"]).await?;
        Ok(!remotes.is_empty())
    }

    /// The upstream branch of HEAD, or `None` when none is configured
    pub async fn upstream_branch(&self) -> Result<Option<String>, GitError> {
        match self
            .run(&["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{upstream}"])
            .await
        {
            Ok(upstream) => Ok(Some(upstream)),
            Err(GitError::CommandFailed { stderr, .. })
                if stderr.contains("no upstream") || stderr.contains("@{upstream}") =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Stage a single path
    pub async fn stage(&self, path: &str) -> Result<(), GitError> {
        self.run(&["add", "--", path]).await?;
        Ok(())
    }

    /// Commit staged changes, returning the short hash
    pub async fn commit(&self, message: &str) -> Result<String, GitError> {
        if !self.has_staged_changes().await? {
            return Err(GitError::NothingToCommit);
        }

        self.run(&["commit", "-m", message]).await?;
        let hash = self.run(&["rev-parse", "--short", "HEAD"]).await?;

        info!("Created commit: {}", hash);
        Ok(hash)
    }

    /// Push with the given extra flags
    pub async fn push(&self, flags: &[&str]) -> Result<(), GitError> {
        let mut args = vec!["push"];
        args.extend(flags);
        self.run(&args).await?;
        Ok(())
    }

    /// Push and set upstream for `branch` on origin
    pub async fn push_set_upstream(&self, branch: &str) -> Result<(), GitError> {
        self.run(&["push", "-u", "origin", branch]).await?;
        Ok(())
    }

    /// Rebase-style pull
    pub async fn pull_rebase(&self) -> Result<(), GitError> {
        self.run(&["pull", "--rebase"]).await?;
        Ok(())
    }
}

// ============================================================================
// Parsing
// ============================================================================

fn parse_porcelain(output: &str) -> Vec<ChangedPath> {
    let mut changed = Vec::new();

    for line in output.lines() {
        if line.len() < 3 {
            continue;
        }

        let index_status = line.chars().next().unwrap_or(' ');
        let worktree_status = line.chars().nth(1).unwrap_or(' ');
        let rest = &line[3..];

        let entry = match (index_status, worktree_status) {
            ('?', '?') => ChangedPath {
                path: unquote(rest),
                status: ChangeStatus::Untracked,
            },
            ('!', '!') => continue,
            ('R', _) | (_, 'R') => {
                let (from, to) = split_rename(rest);
                ChangedPath {
                    path: to,
                    status: ChangeStatus::Renamed { from },
                }
            }
            ('C', _) | (_, 'C') => {
                let (from, to) = split_rename(rest);
                ChangedPath {
                    path: to,
                    status: ChangeStatus::Copied { from },
                }
            }
            ('A', _) | (_, 'A') => ChangedPath {
                path: unquote(rest),
                status: ChangeStatus::Added,
            },
            ('D', _) | (_, 'D') => ChangedPath {
                path: unquote(rest),
                status: ChangeStatus::Deleted,
            },
            _ => ChangedPath {
                path: unquote(rest),
                status: ChangeStatus::Modified,
            },
        };

        changed.push(entry);
    }

    changed
}

/// `old -> new` rename/copy notation; the pair collapses onto `new`
fn split_rename(rest: &str) -> (String, String) {
    match rest.split_once(" -> ") {
        Some((from, to)) => (unquote(from), unquote(to)),
        None => (String::new(), unquote(rest)),
    }
}

/// Strip the quoting git applies to paths with special characters
fn unquote(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].replace("\\\"", "\"").replace("\\\\", "\\")
    } else {
        trimmed.to_string()
    }
}

fn parse_numstat_total(output: &str) -> usize {
    let mut total = 0usize;
    for line in output.lines() {
        let mut parts = line.split_whitespace();
        let added = parts.next().and_then(|v| v.parse::<usize>().ok());
        let deleted = parts.next().and_then(|v| v.parse::<usize>().ok());
        // binary files report "-" and parse to None
        total += added.unwrap_or(0) + deleted.unwrap_or(0);
    }
    total
}

fn find_git_root(path: &Path) -> Result<PathBuf, GitError> {
    let mut current = if path.is_file() {
        path.parent().unwrap_or(path).to_path_buf()
    } else {
        path.to_path_buf()
    };

    loop {
        if current.join(".git").exists() {
            debug!(root = %current.display(), "Resolved repository root");
            return Ok(current);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => return Err(GitError::NotARepository(path.to_path_buf())),
        }
    }
}

/// Whether `path` is inside a git repository
pub fn is_repository(path: &Path) -> bool {
    find_git_root(path).is_ok()
}

/// Repository root for a path, if any
pub fn repository_root(path: &Path) -> Option<PathBuf> {
    find_git_root(path).ok()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_porcelain_basic() {
        let output = " M src/lib.rs\nA  src/new.rs\n?? notes.txt\n D gone.rs";
        let changed = parse_porcelain(output);

        assert_eq!(changed.len(), 4);
        assert_eq!(changed[0].path, "src/lib.rs");
        assert_eq!(changed[0].status, ChangeStatus::Modified);
        assert_eq!(changed[1].status, ChangeStatus::Added);
        assert_eq!(changed[2].status, ChangeStatus::Untracked);
        assert_eq!(changed[3].status, ChangeStatus::Deleted);
    }

    #[test]
    fn test_parse_porcelain_rename_consumes_pair() {
        let output = "R  old_name.rs -> new_name.rs";
        let changed = parse_porcelain(output);

        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].path, "new_name.rs");
        assert_eq!(
            changed[0].status,
            ChangeStatus::Renamed {
                from: "old_name.rs".to_string()
            }
        );
    }

    #[test]
    fn test_parse_porcelain_skips_ignored() {
        let output = "!! target/\n M src/lib.rs";
        let changed = parse_porcelain(output);
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].path, "src/lib.rs");
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"with space.rs\""), "with space.rs");
        assert_eq!(unquote("plain.rs"), "plain.rs");
    }

    #[test]
    fn test_numstat_total_ignores_binary() {
        let output = "3\t1\tsrc/lib.rs\n-\t-\tlogo.png\n10\t0\tREADME.md";
        assert_eq!(parse_numstat_total(output), 14);
    }

    #[test]
    fn test_find_git_root_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let root = find_git_root(&nested).unwrap();
        assert_eq!(root, dir.path());
        assert!(is_repository(&nested));
    }

    #[test]
    fn test_find_git_root_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_repository(dir.path()));
    }
}
