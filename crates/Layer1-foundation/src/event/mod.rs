//! Status events
//!
//! Engine status transitions are pushed through a single broadcast channel
//! and consumed by whatever presents them (status bar, CLI printer). There
//! is no listener registry; consumers subscribe for a receiver and read.

use tokio::sync::broadcast;

// ============================================================================
// Status
// ============================================================================

/// Repository-level engine status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    /// Engine is off; no timers, no listeners
    Disabled,

    /// Engine is idle and watching
    Enabled,

    /// A commit, push, or pull attempt is running
    Syncing,

    /// The last cycle failed; clears on the next successful cycle
    Error,
}

impl EngineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineStatus::Disabled => "disabled",
            EngineStatus::Enabled => "enabled",
            EngineStatus::Syncing => "syncing",
            EngineStatus::Error => "error",
        }
    }
}

/// A status transition with optional detail
#[derive(Debug, Clone)]
pub struct StatusEvent {
    pub status: EngineStatus,

    /// Human-readable context ("push failed: ...", commit subject, ...)
    pub detail: Option<String>,
}

impl StatusEvent {
    pub fn new(status: EngineStatus) -> Self {
        Self {
            status,
            detail: None,
        }
    }

    pub fn with_detail(status: EngineStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: Some(detail.into()),
        }
    }
}

// ============================================================================
// StatusChannel
// ============================================================================

/// Broadcast channel for status transitions.
///
/// Sending never blocks; events published with no subscriber are dropped,
/// which is fine for presentation-only state.
#[derive(Debug, Clone)]
pub struct StatusChannel {
    sender: broadcast::Sender<StatusEvent>,
}

impl StatusChannel {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    /// Publish a transition
    pub fn publish(&self, event: StatusEvent) {
        tracing::debug!(status = event.status.as_str(), detail = ?event.detail, "status");
        let _ = self.sender.send(event);
    }

    pub fn publish_status(&self, status: EngineStatus) {
        self.publish(StatusEvent::new(status));
    }

    /// Subscribe for transitions
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.sender.subscribe()
    }
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_and_receive() {
        let channel = StatusChannel::new();
        let mut rx = channel.subscribe();

        channel.publish_status(EngineStatus::Enabled);
        channel.publish(StatusEvent::with_detail(EngineStatus::Syncing, "commit"));

        assert_eq!(rx.recv().await.unwrap().status, EngineStatus::Enabled);
        let syncing = rx.recv().await.unwrap();
        assert_eq!(syncing.status, EngineStatus::Syncing);
        assert_eq!(syncing.detail.as_deref(), Some("commit"));
    }

    #[test]
    fn test_publish_without_subscribers_is_ok() {
        let channel = StatusChannel::new();
        channel.publish_status(EngineStatus::Error);
    }
}
