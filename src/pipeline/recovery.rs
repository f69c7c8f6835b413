use super::{Middleware, Next, Update};
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;

/// Contains panics raised anywhere further down the chain. The event is dropped
/// and logged; the chat's session lock is released as the guard unwinds.
pub struct Recovery;

#[async_trait]
impl Middleware for Recovery {
    async fn handle(&self, update: Update, next: Next<'_>) {
        let chat_id = update.event.chat_id;
        if let Err(panic) = AssertUnwindSafe(next.run(update)).catch_unwind().await {
            tracing::error!(
                target: "pipeline.recovery",
                %chat_id,
                panic = panic_message(panic.as_ref()),
                "handler panicked; event dropped"
            );
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Endpoint, Pipeline};
    use crate::transport::{ChatId, InboundEvent, Sender};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Boom(Arc<AtomicUsize>);

    #[async_trait]
    impl Endpoint for Boom {
        async fn call(&self, _update: Update) {
            let seen = self.0.fetch_add(1, Ordering::SeqCst);
            if seen == 0 {
                panic!("first event is malformed");
            }
        }
    }

    fn event() -> InboundEvent {
        let sender = Sender {
            tg_id: 1,
            name: "u".into(),
            language: None,
        };
        InboundEvent::from_text(ChatId(9), sender, "x")
    }

    #[tokio::test]
    async fn panic_is_contained_and_next_event_runs() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new(Arc::new(Boom(calls.clone()))).with(Recovery);
        pipeline.handle(event()).await;
        pipeline.handle(event()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn panic_payloads_are_readable() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");
        let s: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(s.as_ref()), "owned");
        let s: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(s.as_ref()), "non-string panic payload");
    }
}
