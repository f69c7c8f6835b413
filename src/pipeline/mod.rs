//! Ordered interceptors in front of the terminal handler.
//!
//! Every inbound event enters `Pipeline::handle`, passes through each
//! `Middleware` in registration order and finally reaches the `Endpoint`.
//! A middleware short-circuits by returning without calling `next.run`.

pub mod recovery;
pub mod upsert;

use crate::AppState;
use crate::database::models::User;
use crate::handler::Handler;
use crate::transport::InboundEvent;
use async_trait::async_trait;
use std::sync::Arc;

/// An event on its way through the chain, plus what interceptors learned about it.
#[derive(Debug, Clone)]
pub struct Update {
    pub event: InboundEvent,
    /// Filled in by the user-upsert interceptor.
    pub user: Option<User>,
}

#[async_trait]
pub trait Endpoint: Send + Sync {
    async fn call(&self, update: Update);
}

#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, update: Update, next: Next<'_>);
}

/// The rest of the chain after the current middleware.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    endpoint: &'a dyn Endpoint,
}

impl Next<'_> {
    pub async fn run(self, update: Update) {
        match self.chain.split_first() {
            Some((head, rest)) => {
                let next = Next {
                    chain: rest,
                    endpoint: self.endpoint,
                };
                head.handle(update, next).await
            }
            None => self.endpoint.call(update).await,
        }
    }
}

pub struct Pipeline {
    middleware: Vec<Arc<dyn Middleware>>,
    endpoint: Arc<dyn Endpoint>,
}

impl Pipeline {
    pub fn new(endpoint: Arc<dyn Endpoint>) -> Self {
        Self {
            middleware: Vec::new(),
            endpoint,
        }
    }

    /// Appends an interceptor; earlier ones wrap later ones.
    pub fn with(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Panic containment, then user upsert, then the command / dialog router.
    pub fn standard(app: Arc<AppState>) -> Self {
        Self::new(Arc::new(Handler::new(app.clone())))
            .with(recovery::Recovery)
            .with(upsert::UserUpsert::new(app))
    }

    pub async fn handle(&self, event: InboundEvent) {
        let next = Next {
            chain: &self.middleware,
            endpoint: self.endpoint.as_ref(),
        };
        next.run(Update { event, user: None }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ChatId, Sender};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Log(Mutex<Vec<String>>);

    impl Log {
        fn push(&self, entry: impl Into<String>) {
            self.0.lock().unwrap().push(entry.into());
        }
    }

    struct Tag(&'static str, Arc<Log>);

    #[async_trait]
    impl Middleware for Tag {
        async fn handle(&self, update: Update, next: Next<'_>) {
            self.1.push(format!("{}:in", self.0));
            next.run(update).await;
            self.1.push(format!("{}:out", self.0));
        }
    }

    struct Stop(Arc<Log>);

    #[async_trait]
    impl Middleware for Stop {
        async fn handle(&self, _update: Update, _next: Next<'_>) {
            self.0.push("stop");
        }
    }

    struct Sink(Arc<Log>);

    #[async_trait]
    impl Endpoint for Sink {
        async fn call(&self, _update: Update) {
            self.0.push("endpoint");
        }
    }

    fn event() -> InboundEvent {
        let sender = Sender {
            tg_id: 1,
            name: "u".into(),
            language: None,
        };
        InboundEvent::from_text(ChatId(1), sender, "hi")
    }

    #[tokio::test]
    async fn middleware_wraps_in_registration_order() {
        let log = Arc::new(Log::default());
        let pipeline = Pipeline::new(Arc::new(Sink(log.clone())))
            .with(Tag("a", log.clone()))
            .with(Tag("b", log.clone()));
        pipeline.handle(event()).await;
        assert_eq!(
            *log.0.lock().unwrap(),
            vec!["a:in", "b:in", "endpoint", "b:out", "a:out"]
        );
    }

    #[tokio::test]
    async fn middleware_can_short_circuit() {
        let log = Arc::new(Log::default());
        let pipeline = Pipeline::new(Arc::new(Sink(log.clone())))
            .with(Stop(log.clone()))
            .with(Tag("never", log.clone()));
        pipeline.handle(event()).await;
        assert_eq!(*log.0.lock().unwrap(), vec!["stop"]);
    }
}
