//! Outbound notification boundary.
//!
//! The lifecycle publishes events here after a transition commits. Delivery
//! (WebSocket push, SMS, pager) is an external concern behind the channel;
//! publishing is best-effort and never blocks or fails into the caller.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Events published to a party's client after a committed transition.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueEvent {
    Called { called_at: DateTime<Utc> },
    Canceled,
    RankChanged { estimated_minutes: u64, rank: u64 },
}

/// An event addressed to one party.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub event: QueueEvent,
    pub party_id: u64,
}

/// Cheap, cloneable handle the lifecycle publishes through.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
    /// Create a notifier and the receiving end for the delivery task.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Publish an event. Failure (a closed delivery task) is logged and
    /// swallowed: a lost push must never roll back a committed transition.
    pub fn notify(&self, party_id: u64, event: QueueEvent) {
        let notification = Notification { event, party_id };
        if self.tx.send(notification).is_err() {
            warn!(party_id, "Notification channel closed, event dropped");
        }
    }
}

/// Drain the notification channel.
///
/// Stands in for the external delivery transport: events are serialized and
/// logged. A real deployment replaces the body of the loop with its push
/// mechanism.
pub fn start_notification_drain(mut rx: mpsc::UnboundedReceiver<Notification>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(notification) = rx.recv().await {
            match serde_json::to_string(&notification) {
                Ok(payload) => {
                    debug!(party_id = notification.party_id, %payload, "Notification dispatched")
                }
                Err(e) => warn!(error = %e, "Failed to encode notification"),
            }
        }
    })
}
