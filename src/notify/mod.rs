//! Background delivery of messages nobody is waiting on: new-Help alerts for
//! subscribers and expiry prompts.
//!
//! Producers push into a bounded queue through `Notifier`; a single dispatch
//! loop (`dispatcher::run_dispatch`) drains it and sends sequentially. A full
//! queue blocks the producer for at most the enqueue timeout, after which the
//! notification is dropped with a warning.

pub mod dispatcher;
pub mod fanout;
pub mod sweep;

use crate::transport::{ChatId, OutboundMessage};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::SendTimeoutError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub chat_id: ChatId,
    pub message: OutboundMessage,
    /// Short tag for logs (`help_match`, `help_expiring`, ...).
    pub kind: &'static str,
}

impl Notification {
    pub fn new(chat_id: ChatId, kind: &'static str, message: OutboundMessage) -> Self {
        Self {
            chat_id,
            message,
            kind,
        }
    }
}

#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<Notification>,
    enqueue_timeout: Duration,
}

/// Creates the queue. The receiver goes to `dispatcher::run_dispatch`.
pub fn queue(capacity: usize, enqueue_timeout: Duration) -> (Notifier, mpsc::Receiver<Notification>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (Notifier { tx, enqueue_timeout }, rx)
}

impl Notifier {
    /// Returns `false` if the notification was dropped.
    pub async fn push(&self, notification: Notification) -> bool {
        match self.tx.send_timeout(notification, self.enqueue_timeout).await {
            Ok(()) => true,
            Err(SendTimeoutError::Timeout(n)) => {
                tracing::warn!(target: "notify", chat_id = %n.chat_id, kind = n.kind, "notification queue full; dropping");
                false
            }
            Err(SendTimeoutError::Closed(n)) => {
                tracing::warn!(target: "notify", chat_id = %n.chat_id, kind = n.kind, "notification dispatch stopped; dropping");
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
