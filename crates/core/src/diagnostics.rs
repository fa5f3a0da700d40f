//! Non-blocking diagnostics channel for soft failures.
//!
//! Best-effort steps (temp-file cleanup, artifact pruning) and resilience
//! decisions (retries, fallback engagement) are logged but must never fail
//! the parent operation. Publishing them on a broadcast channel lets tests
//! assert that those paths ran without coupling components to each other.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Soft-failure and resilience events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DiagnosticEvent {
    /// Deleting a temporary file after a failed write itself failed
    TempFileCleanupFailed { path: String, error: String },
    /// Deleting an artifact beyond the retention count failed
    ArtifactPruneFailed { path: String, error: String },
    /// A retryable failure triggered another attempt
    FetchRetried {
        operation: String,
        attempt: u32,
        delay_ms: u64,
    },
    /// The view-report fallback path was engaged for a heavy report
    FallbackEngaged { report_id: u32, endpoint: String },
}

/// Handle for publishing and subscribing to diagnostic events.
///
/// Cloning is cheap; all clones publish into the same channel. Emission
/// never blocks and never fails, even with no subscribers.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    sender: broadcast::Sender<DiagnosticEvent>,
}

impl Diagnostics {
    /// Create a channel retaining up to `capacity` undelivered events
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. Lagging or absent subscribers are ignored.
    pub fn emit(&self, event: DiagnosticEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to events emitted after this call
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DiagnosticEvent> {
        self.sender.subscribe()
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_without_subscribers_does_not_fail() {
        let diagnostics = Diagnostics::default();
        diagnostics.emit(DiagnosticEvent::ArtifactPruneFailed {
            path: "/tmp/x".into(),
            error: "denied".into(),
        });
    }

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let diagnostics = Diagnostics::default();
        let mut rx = diagnostics.subscribe();
        diagnostics.emit(DiagnosticEvent::FetchRetried {
            operation: "proxy".into(),
            attempt: 1,
            delay_ms: 100,
        });
        diagnostics.emit(DiagnosticEvent::FallbackEngaged {
            report_id: 42,
            endpoint: "viewreport".into(),
        });
        assert!(matches!(
            rx.recv().await.unwrap(),
            DiagnosticEvent::FetchRetried { attempt: 1, .. }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            DiagnosticEvent::FallbackEngaged { report_id: 42, .. }
        ));
    }
}
