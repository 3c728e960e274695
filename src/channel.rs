//! Realtime alert channel.
//!
//! Long-lived WebSocket client receiving server-pushed alert events
//! outside the polling cycle (task assignments, server-side deadline
//! scans). Pushed events are prepended to the in-app alert feed in the
//! order the server emitted them. The connection reconnects on its own
//! after transient failures; events missed while disconnected are not
//! replayed.

use crate::alerts::{Alert, SharedAlertFeed};
use crate::notifier::{NotificationPermission, Notifier};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Wire event pushed by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelEvent {
    /// Human-readable alert message.
    pub message: String,
    /// Title of the related task, when there is one.
    #[serde(default)]
    pub task_title: Option<String>,
}

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Handle for a running alert channel.
pub struct ChannelHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    join: tokio::task::JoinHandle<()>,
}

impl ChannelHandle {
    /// Request shutdown. The channel task exits promptly and does not
    /// reconnect.
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }

    /// Request shutdown and wait for the channel task to finish.
    pub async fn shutdown(mut self) {
        self.stop();
        let _ = self.join.await;
    }
}

/// Connect the alert channel and run it until stopped.
///
/// Pushed events are prepended to `feed`; a local notification is raised
/// per event when permission is granted.
pub fn spawn_channel(
    url: String,
    feed: SharedAlertFeed,
    notifier: Arc<dyn Notifier>,
) -> ChannelHandle {
    let (stop_tx, stop_rx) = oneshot::channel();
    let join = tokio::spawn(run_channel(url, feed, notifier, stop_rx));
    ChannelHandle {
        stop_tx: Some(stop_tx),
        join,
    }
}

async fn run_channel(
    url: String,
    feed: SharedAlertFeed,
    notifier: Arc<dyn Notifier>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut backoff = INITIAL_BACKOFF;

    loop {
        tokio::select! {
            _ = &mut stop_rx => {
                info!("alert channel stopped");
                return;
            }
            connected = tokio_tungstenite::connect_async(url.as_str()) => {
                match connected {
                    Ok((stream, _)) => {
                        info!("alert channel connected to {url}");
                        backoff = INITIAL_BACKOFF;
                        let (_write, mut read) = stream.split();
                        loop {
                            tokio::select! {
                                _ = &mut stop_rx => {
                                    info!("alert channel stopped");
                                    return;
                                }
                                frame = read.next() => {
                                    match frame {
                                        Some(Ok(Message::Text(text))) => {
                                            handle_frame(&text, &feed, notifier.as_ref());
                                        }
                                        Some(Ok(Message::Close(_))) | None => {
                                            warn!("alert channel closed by server");
                                            break;
                                        }
                                        Some(Ok(_)) => {}
                                        Some(Err(e)) => {
                                            warn!("alert channel read error: {e}");
                                            break;
                                        }
                                    }
                                }
                            }
                        }
                    }
                    Err(e) => warn!("alert channel connect failed: {e}"),
                }
            }
        }

        tokio::select! {
            _ = &mut stop_rx => {
                info!("alert channel stopped");
                return;
            }
            _ = tokio::time::sleep(backoff) => {}
        }
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

/// Apply one pushed event: prepend to the feed and notify when allowed.
/// Malformed frames are logged and dropped.
fn handle_frame(raw: &str, feed: &SharedAlertFeed, notifier: &dyn Notifier) {
    let event: ChannelEvent = match serde_json::from_str(raw) {
        Ok(event) => event,
        Err(e) => {
            debug!("ignoring malformed channel event: {e}");
            return;
        }
    };

    let alert = Alert {
        message: event.message.clone(),
        task_id: None,
        task_title: event.task_title.clone(),
    };
    {
        let mut feed = feed.lock().unwrap_or_else(|e| e.into_inner());
        feed.prepend(alert);
    }

    if notifier.permission() == NotificationPermission::Granted {
        let title = event.task_title.as_deref().unwrap_or("Notification");
        notifier.notify(title, &event.message);
    }
}
