//! In-app alert feed.
//!
//! Single owner of the ordered alert list. The deadline scanner appends,
//! the realtime channel prepends, and the UI layer removes entries by
//! index. Every mutation is mirrored on an event stream so a host UI can
//! stay current without polling the list.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// A transient, user-visible message about an approaching deadline or a
/// server-pushed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Human-readable message shown in the feed.
    pub message: String,
    /// Source task id, when the alert derives from a task.
    #[serde(default)]
    pub task_id: Option<String>,
    /// Source task title, when known.
    #[serde(default)]
    pub task_title: Option<String>,
}

impl Alert {
    /// Create an alert carrying only a message.
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            task_id: None,
            task_title: None,
        }
    }
}

/// Feed mutation event for the UI layer.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// An alert was appended to the end of the feed.
    Appended(Alert),
    /// An alert was prepended to the front of the feed.
    Prepended(Alert),
    /// The alert at `index` was removed.
    Removed {
        /// Position the alert occupied before removal.
        index: usize,
    },
}

/// Ordered alert list with controlled mutation.
pub struct AlertFeed {
    alerts: Vec<Alert>,
    event_tx: Option<mpsc::UnboundedSender<FeedEvent>>,
}

/// Alert feed shared between the engine, the realtime channel, and the
/// host UI. Both producers only add entries, so a plain mutex suffices.
pub type SharedAlertFeed = Arc<Mutex<AlertFeed>>;

impl Default for AlertFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertFeed {
    /// Create an empty feed with no event stream.
    #[must_use]
    pub fn new() -> Self {
        Self {
            alerts: Vec::new(),
            event_tx: None,
        }
    }

    /// Create an empty feed plus the receiving end of its event stream.
    #[must_use]
    pub fn with_event_stream() -> (Self, mpsc::UnboundedReceiver<FeedEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let feed = Self {
            alerts: Vec::new(),
            event_tx: Some(event_tx),
        };
        (feed, event_rx)
    }

    /// Wrap the feed for sharing across tasks.
    #[must_use]
    pub fn into_shared(self) -> SharedAlertFeed {
        Arc::new(Mutex::new(self))
    }

    /// Append an alert to the end of the feed.
    pub fn append(&mut self, alert: Alert) {
        self.emit(FeedEvent::Appended(alert.clone()));
        self.alerts.push(alert);
    }

    /// Prepend an alert to the front of the feed.
    pub fn prepend(&mut self, alert: Alert) {
        self.emit(FeedEvent::Prepended(alert.clone()));
        self.alerts.insert(0, alert);
    }

    /// Remove the alert at `index`. Returns the removed alert, or `None`
    /// when the index is out of range.
    pub fn remove(&mut self, index: usize) -> Option<Alert> {
        if index >= self.alerts.len() {
            return None;
        }
        let alert = self.alerts.remove(index);
        self.emit(FeedEvent::Removed { index });
        Some(alert)
    }

    /// Current alerts, oldest appended first.
    #[must_use]
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    /// Number of alerts currently in the feed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    /// Returns `true` when the feed holds no alerts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    fn emit(&self, event: FeedEvent) {
        if let Some(tx) = &self.event_tx {
            // A departed UI consumer must not break the feed.
            let _ = tx.send(event);
        }
    }
}
