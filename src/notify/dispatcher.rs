use super::Notification;
use crate::transport::Transport;
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub sent: u64,
    pub failed: u64,
    /// The loop ended because the transport reported itself unusable.
    pub stopped_on_fatal: bool,
}

/// The single consumer of the notification queue.
///
/// Sends one message at a time and never retries. Per-recipient failures are
/// logged and skipped; a fatal transport error ends the loop. When `shutdown`
/// fires the queue is closed and whatever is already buffered is still sent.
pub async fn run_dispatch(
    transport: Arc<dyn Transport>,
    mut rx: Receiver<Notification>,
    shutdown: CancellationToken,
) -> DispatchStats {
    let mut stats = DispatchStats::default();
    tracing::info!(target: "notify.dispatch", "notification dispatch started");
    loop {
        tokio::select! {
            biased;
            next = rx.recv() => match next {
                Some(n) => {
                    if !deliver(transport.as_ref(), n, &mut stats).await {
                        break;
                    }
                }
                None => break,
            },
            _ = shutdown.cancelled() => {
                rx.close();
                while let Some(n) = rx.recv().await {
                    if !deliver(transport.as_ref(), n, &mut stats).await {
                        break;
                    }
                }
                break;
            }
        }
    }
    tracing::info!(target: "notify.dispatch", sent = stats.sent, failed = stats.failed, fatal = stats.stopped_on_fatal, "notification dispatch stopped");
    stats
}

/// Returns `false` when the loop must stop.
async fn deliver(transport: &dyn Transport, n: Notification, stats: &mut DispatchStats) -> bool {
    let chat_id = n.chat_id;
    let kind = n.kind;
    match transport.send(chat_id, n.message).await {
        Ok(()) => {
            stats.sent += 1;
            tracing::debug!(target: "notify.dispatch", %chat_id, kind, "notification sent");
            true
        }
        Err(e) if e.is_fatal() => {
            stats.failed += 1;
            stats.stopped_on_fatal = true;
            tracing::error!(target: "notify.dispatch", %chat_id, kind, error = %e, "transport unusable; stopping dispatch");
            false
        }
        Err(e) => {
            stats.failed += 1;
            tracing::warn!(target: "notify.dispatch", %chat_id, kind, error = %e, "notification not delivered");
            true
        }
    }
}
