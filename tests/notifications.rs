use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uasocial_bot::notify::{self, Notification, dispatcher::run_dispatch};
use uasocial_bot::transport::{ChatId, OutboundMessage, Transport, TransportError};

/// Chat 13 has blocked the bot; chat 666 makes the transport unusable.
#[derive(Default)]
struct Scripted {
    delivered: Mutex<Vec<i64>>,
}

#[async_trait]
impl Transport for Scripted {
    async fn send(&self, chat_id: ChatId, _message: OutboundMessage) -> Result<(), TransportError> {
        match chat_id.0 {
            13 => Err(TransportError::Recipient("blocked".into())),
            666 => Err(TransportError::Fatal("token revoked".into())),
            id => {
                self.delivered.lock().unwrap().push(id);
                Ok(())
            }
        }
    }

    async fn answer_callback(&self, _query_id: &str) -> Result<(), TransportError> {
        Ok(())
    }
}

fn note(chat: i64) -> Notification {
    Notification::new(ChatId(chat), "test", OutboundMessage::text("new offer"))
}

#[tokio::test]
async fn recipient_failures_do_not_stop_dispatch() {
    let transport = Arc::new(Scripted::default());
    let (notifier, rx) = notify::queue(8, Duration::from_millis(100));
    for chat in [1, 13, 2] {
        assert!(notifier.push(note(chat)).await);
    }
    drop(notifier);

    let stats = run_dispatch(transport.clone(), rx, CancellationToken::new()).await;
    assert_eq!(*transport.delivered.lock().unwrap(), vec![1, 2]);
    assert_eq!(stats.sent, 2);
    assert_eq!(stats.failed, 1);
    assert!(!stats.stopped_on_fatal);
}

#[tokio::test]
async fn fatal_error_stops_dispatch() {
    let transport = Arc::new(Scripted::default());
    let (notifier, rx) = notify::queue(8, Duration::from_millis(100));
    for chat in [1, 666, 2] {
        notifier.push(note(chat)).await;
    }

    let stats = run_dispatch(transport.clone(), rx, CancellationToken::new()).await;
    assert!(stats.stopped_on_fatal);
    assert_eq!(*transport.delivered.lock().unwrap(), vec![1]);
    assert!(notifier.is_closed());
    assert!(!notifier.push(note(3)).await);
}

#[tokio::test]
async fn shutdown_flushes_what_is_queued() {
    let transport = Arc::new(Scripted::default());
    let (notifier, rx) = notify::queue(8, Duration::from_millis(100));
    for chat in [4, 5, 6] {
        notifier.push(note(chat)).await;
    }
    let token = CancellationToken::new();
    token.cancel();

    let stats = run_dispatch(transport.clone(), rx, token).await;
    assert_eq!(stats.sent, 3);
    assert_eq!(*transport.delivered.lock().unwrap(), vec![4, 5, 6]);
}
