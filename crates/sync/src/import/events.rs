//! Import lifecycle events.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use super::state::ImportSummary;

/// Buffered events per subscriber before the slowest starts lagging.
const CHANNEL_CAPACITY: usize = 64;

/// Something that happened to an import run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ImportEvent {
    Started {
        started_at: DateTime<Utc>,
        initial: bool,
        catchup: bool,
    },
    /// Fired once per finished import.
    Completed(ImportSummary),
    Cancelled {
        cancelled_tasks: u64,
    },
}

/// Fan-out of [`ImportEvent`]s to any number of subscribers.
#[derive(Debug, Clone)]
pub struct ImportEvents {
    sender: broadcast::Sender<ImportEvent>,
}

impl ImportEvents {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Receive events emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ImportEvent> {
        self.sender.subscribe()
    }

    /// Emit an event. Having no subscribers is not an error.
    pub fn emit(&self, event: ImportEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for ImportEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let events = ImportEvents::new();
        let mut rx = events.subscribe();
        events.emit(ImportEvent::Cancelled { cancelled_tasks: 3 });
        assert_eq!(
            rx.recv().await.unwrap(),
            ImportEvent::Cancelled { cancelled_tasks: 3 }
        );
    }

    #[test]
    fn test_emit_without_subscribers() {
        ImportEvents::new().emit(ImportEvent::Cancelled { cancelled_tasks: 0 });
    }
}
