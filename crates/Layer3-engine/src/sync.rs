//! Push/pull sequencing
//!
//! Push and pull are independently mutex-guarded: a pull triggered by a
//! just-completed push never collides with a periodic pull timer, because
//! whichever attempt arrives second observes the flag and drops. Sync
//! failures surface a transient error status but never disable the engine.

use crate::cycle::EngineError;
use crate::engine::EngineInner;
use crate::state::Operation;
use savepoint_core::{GitError, GitGateway, VcsRunner};
use savepoint_foundation::{
    AutoPullMode, AutoPushMode, EngineStatus, SavepointConfig, StatusEvent,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

impl EngineInner {
    /// Push the current branch. Returns whether a push actually ran;
    /// `false` covers both a held flag and a repository with no remote.
    pub(crate) async fn run_push(
        &self,
        gateway: &GitGateway<Arc<dyn VcsRunner>>,
        config: &SavepointConfig,
    ) -> Result<bool, EngineError> {
        let Some(_guard) = self.state.try_begin(Operation::Pushing) else {
            debug!("Push already in flight; dropping attempt");
            return Ok(false);
        };

        self.status
            .publish(StatusEvent::with_detail(EngineStatus::Syncing, "push"));

        match self.push_once(gateway, config).await {
            Ok(pushed) => {
                self.status.publish_status(EngineStatus::Enabled);
                drop(_guard);
                if pushed && config.auto_pull == AutoPullMode::OnPush {
                    let _ = self.run_pull(gateway).await;
                }
                Ok(pushed)
            }
            Err(e) => {
                self.fail(format!("push failed: {}", e));
                Err(EngineError::Sync(e))
            }
        }
    }

    async fn push_once(
        &self,
        gateway: &GitGateway<Arc<dyn VcsRunner>>,
        config: &SavepointConfig,
    ) -> Result<bool, GitError> {
        if !gateway.has_remote().await? {
            debug!("No remote configured; push is a no-op");
            return Ok(false);
        }

        match gateway.upstream_branch().await? {
            None => {
                // first push on this branch bootstraps the upstream
                let branch = gateway.current_branch().await?;
                info!(branch = %branch, "Pushing with upstream bootstrap");
                gateway.push_set_upstream(&branch).await?;
            }
            Some(_) => {
                gateway.push(config.push_mode.flags()).await?;
            }
        }

        Ok(true)
    }

    /// Rebase-style pull. Same drop semantics as push.
    pub(crate) async fn run_pull(
        &self,
        gateway: &GitGateway<Arc<dyn VcsRunner>>,
    ) -> Result<bool, EngineError> {
        let Some(_guard) = self.state.try_begin(Operation::Pulling) else {
            debug!("Pull already in flight; dropping attempt");
            return Ok(false);
        };

        self.status
            .publish(StatusEvent::with_detail(EngineStatus::Syncing, "pull"));

        match self.pull_once(gateway).await {
            Ok(pulled) => {
                self.status.publish_status(EngineStatus::Enabled);
                Ok(pulled)
            }
            Err(e) => {
                self.fail(format!("pull failed: {}", e));
                Err(EngineError::Sync(e))
            }
        }
    }

    async fn pull_once(
        &self,
        gateway: &GitGateway<Arc<dyn VcsRunner>>,
    ) -> Result<bool, GitError> {
        if !gateway.has_remote().await? {
            debug!("No remote configured; pull is a no-op");
            return Ok(false);
        }
        if gateway.upstream_branch().await?.is_none() {
            debug!("No upstream configured; pull is a no-op");
            return Ok(false);
        }

        gateway.pull_rebase().await?;
        Ok(true)
    }

    /// (Re)start the interval timers for after-delay sync modes. Any
    /// previous timers are torn down first, so a config change swaps them
    /// atomically and disable clears them for good.
    pub(crate) fn restart_interval_timers(&self) {
        let config = self.config_snapshot();
        let mut timers = self.timers.lock();

        if let Some(handle) = timers.push_interval.take() {
            handle.abort();
        }
        if let Some(handle) = timers.pull_interval.take() {
            handle.abort();
        }

        if !self.state.is_enabled() {
            return;
        }

        let Some(handle) = self.self_handle() else {
            return;
        };

        if config.auto_push == AutoPushMode::AfterDelay {
            let inner = handle.clone();
            let delay = Duration::from_millis(config.auto_push_delay.max(1));
            timers.push_interval = Some(tokio::spawn(async move {
                loop {
                    tokio::time::sleep(delay).await;
                    let Some(repo) = inner.preferred_repository() else {
                        continue;
                    };
                    let gateway = GitGateway::new(inner.runner.clone(), &repo);
                    let config = inner.config_snapshot();
                    let _ = inner.run_push(&gateway, &config).await;
                }
            }));
        }

        if config.auto_pull == AutoPullMode::AfterDelay {
            let inner = handle;
            let delay = Duration::from_millis(config.auto_pull_delay.max(1));
            timers.pull_interval = Some(tokio::spawn(async move {
                loop {
                    tokio::time::sleep(delay).await;
                    let Some(repo) = inner.preferred_repository() else {
                        continue;
                    };
                    let gateway = GitGateway::new(inner.runner.clone(), &repo);
                    let _ = inner.run_pull(&gateway).await;
                }
            }));
        }
    }
}
