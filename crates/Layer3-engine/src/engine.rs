//! Engine lifecycle
//!
//! Ties the scheduler, commit cycle, and sync coordinator together behind
//! one handle. Enabling wires the timers and the optional open-time pull;
//! disabling clears every owned timer handle. In-flight operations are not
//! forcibly cancelled - they run to completion and their results are
//! discarded once the enabled flag is down.

use crate::cycle::{CommitOutcome, EngineError};
use crate::diagnostics::{DiagnosticsProvider, NoDiagnostics};
use crate::scheduler::PendingCommit;
use crate::state::RepositoryState;
use savepoint_core::{repository_root, GitGateway, ProcessRunner, VcsRunner};
use savepoint_foundation::{EngineStatus, SavepointConfig, StatusChannel, StatusEvent};
use savepoint_provider::MessageGenerator;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

// ============================================================================
// Inner state
// ============================================================================

/// Owned, cancellable timer handles; cleared on disable so nothing leaks
#[derive(Default)]
pub(crate) struct TimerSet {
    pub(crate) pending_commit: Option<PendingCommit>,
    pub(crate) push_interval: Option<JoinHandle<()>>,
    pub(crate) pull_interval: Option<JoinHandle<()>>,
}

pub(crate) struct EngineInner {
    /// Self-handle for the tasks the engine spawns (timers, hooks)
    pub(crate) self_ref: std::sync::Weak<EngineInner>,
    pub(crate) runner: Arc<dyn VcsRunner>,
    pub(crate) config: parking_lot::RwLock<SavepointConfig>,
    pub(crate) generator: MessageGenerator,
    pub(crate) diagnostics: Arc<dyn DiagnosticsProvider>,
    pub(crate) status: StatusChannel,
    pub(crate) state: RepositoryState,
    pub(crate) timers: parking_lot::Mutex<TimerSet>,
    pub(crate) preferred_repo: parking_lot::Mutex<Option<PathBuf>>,
}

impl EngineInner {
    pub(crate) fn self_handle(&self) -> Option<Arc<EngineInner>> {
        self.self_ref.upgrade()
    }

    /// Per-cycle configuration snapshot; behavior downstream is a pure
    /// function of this value, not of the live settings
    pub(crate) fn config_snapshot(&self) -> SavepointConfig {
        self.config.read().clone()
    }

    pub(crate) fn preferred_repository(&self) -> Option<PathBuf> {
        self.preferred_repo.lock().clone()
    }

    /// Surface a cycle failure; the engine stays enabled
    pub(crate) fn fail(&self, detail: String) {
        tracing::error!("{}", detail);
        self.status
            .publish(StatusEvent::with_detail(EngineStatus::Error, detail));
    }
}

// ============================================================================
// Engine
// ============================================================================

/// The save-triggered commit orchestration engine
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    pub fn new(
        config: SavepointConfig,
        runner: Arc<dyn VcsRunner>,
        generator: MessageGenerator,
        diagnostics: Arc<dyn DiagnosticsProvider>,
    ) -> Self {
        Self {
            inner: Arc::new_cyclic(|weak| EngineInner {
                self_ref: weak.clone(),
                runner,
                config: parking_lot::RwLock::new(config),
                generator,
                diagnostics,
                status: StatusChannel::new(),
                state: RepositoryState::new(),
                timers: parking_lot::Mutex::new(TimerSet::default()),
                preferred_repo: parking_lot::Mutex::new(None),
            }),
        }
    }

    /// Production wiring: real git subprocesses, no host diagnostics
    pub fn with_process_runner(config: SavepointConfig, generator: MessageGenerator) -> Self {
        Self::new(
            config,
            Arc::new(ProcessRunner),
            generator,
            Arc::new(NoDiagnostics),
        )
    }

    /// Subscribe to status transitions
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<StatusEvent> {
        self.inner.status.subscribe()
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.state.is_enabled()
    }

    /// Enable the engine for a workspace. Resolves and caches the
    /// preferred repository, pulls once when configured, and starts the
    /// after-delay interval timers.
    pub async fn enable(&self, workspace: &Path) {
        if self.inner.state.is_enabled() {
            return;
        }

        self.inner.state.set_enabled(true);
        self.inner.status.publish_status(EngineStatus::Enabled);
        info!(workspace = %workspace.display(), "Engine enabled");

        if let Some(repo) = repository_root(workspace) {
            *self.inner.preferred_repo.lock() = Some(repo.clone());

            if self.inner.config_snapshot().pull_on_open {
                let inner = self.inner.clone();
                tokio::spawn(async move {
                    let gateway = GitGateway::new(inner.runner.clone(), &repo);
                    let _ = inner.run_pull(&gateway).await;
                });
            }
        }

        self.inner.restart_interval_timers();
    }

    /// Disable the engine: clear every pending timer. In-flight external
    /// calls finish on their own and their results are discarded.
    pub fn disable(&self) {
        if !self.inner.state.is_enabled() {
            return;
        }

        self.inner.state.set_enabled(false);
        self.inner.clear_commit_timer();
        self.inner.restart_interval_timers();
        self.inner.status.publish_status(EngineStatus::Disabled);
        info!("Engine disabled");
    }

    /// Shutdown hook: run the close-time commit when configured, then
    /// disable.
    pub async fn shutdown(&self) {
        let config = self.inner.config_snapshot();
        if config.commit_on_close && self.inner.state.is_enabled() {
            if let Some(repo) = self.inner.preferred_repository() {
                debug!("Running close-time commit cycle");
                let _ = self.inner.run_cycle(&repo).await;
            }
        }
        self.disable();
    }

    /// Replace the configuration; interval timers are rebuilt to match
    pub fn update_config(&self, config: SavepointConfig) {
        *self.inner.config.write() = config;
        self.inner.restart_interval_timers();
    }

    /// Deliver one save event
    pub async fn on_save(&self, path: &Path) {
        self.inner.handle_save(path).await;
    }

    /// Manual commit trigger against the preferred (or given) repository
    pub async fn commit_now(&self, repo: Option<&Path>) -> Result<CommitOutcome, EngineError> {
        let repo = match repo {
            Some(repo) => repo.to_path_buf(),
            None => self
                .inner
                .preferred_repository()
                .ok_or(EngineError::NoRepository)?,
        };
        self.inner.run_cycle(&repo).await
    }

    /// Manual push trigger
    pub async fn push_now(&self, repo: &Path) -> Result<bool, EngineError> {
        let gateway = GitGateway::new(self.inner.runner.clone(), repo);
        let config = self.inner.config_snapshot();
        self.inner.run_push(&gateway, &config).await
    }

    /// Manual pull trigger
    pub async fn pull_now(&self, repo: &Path) -> Result<bool, EngineError> {
        let gateway = GitGateway::new(self.inner.runner.clone(), repo);
        self.inner.run_pull(&gateway).await
    }
}
