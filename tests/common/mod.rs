//! Shared harness: the real pipeline over in-memory storage and a transport
//! that records everything it is asked to send.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::TimeDelta;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use uasocial_bot::AppState;
use uasocial_bot::database::MemoryStorage;
use uasocial_bot::database::models::User;
use uasocial_bot::i18n::Lang;
use uasocial_bot::model::{Limits, Settings, SweepPolicy};
use uasocial_bot::notify::{self, Notification};
use uasocial_bot::pipeline::Pipeline;
use uasocial_bot::transport::{
    ChatId, InboundEvent, Keyboard, OutboundMessage, Sender, Transport, TransportError,
};

#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(ChatId, OutboundMessage)>>,
    answered: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl RecordingTransport {
    /// While failing, every send returns `TransportError::Other` and records nothing.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent_to(&self, chat: i64) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c.0 == chat)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn answered(&self) -> Vec<String> {
        self.answered.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, chat_id: ChatId, message: OutboundMessage) -> Result<(), TransportError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Other("simulated outage".into()));
        }
        self.sent.lock().unwrap().push((chat_id, message));
        Ok(())
    }

    async fn answer_callback(&self, query_id: &str) -> Result<(), TransportError> {
        self.answered.lock().unwrap().push(query_id.to_string());
        Ok(())
    }
}

pub fn settings() -> Settings {
    Settings {
        lang: Lang::Ua,
        timezone: chrono_tz::Europe::Kyiv,
        limits: Limits {
            max_helps: 2,
            max_subscriptions: 5,
        },
        sweep: SweepPolicy {
            retention: TimeDelta::days(10),
            keep_grace: TimeDelta::hours(24),
            interval: Duration::from_secs(3600),
        },
    }
}

pub struct Harness {
    pub app: Arc<AppState>,
    pub storage: Arc<MemoryStorage>,
    pub transport: Arc<RecordingTransport>,
    pub pipeline: Pipeline,
    pub notifications: mpsc::Receiver<Notification>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_settings(settings()).await
    }

    pub async fn with_settings(settings: Settings) -> Self {
        let storage = Arc::new(MemoryStorage::demo());
        let transport = Arc::new(RecordingTransport::default());
        let (notifier, notifications) = notify::queue(16, Duration::from_millis(200));
        let app = Arc::new(
            AppState::bootstrap(settings, storage.clone(), transport.clone(), notifier)
                .await
                .expect("bootstrap"),
        );
        let pipeline = Pipeline::standard(app.clone());
        Self {
            app,
            storage,
            transport,
            pipeline,
            notifications,
        }
    }

    fn sender(chat: i64) -> Sender {
        Sender {
            tg_id: chat,
            name: format!("user{chat}"),
            language: Some("en".into()),
        }
    }

    /// Sends raw text (or a `/command`) from the user whose id equals the chat id.
    pub async fn text(&self, chat: i64, text: &str) {
        let event = InboundEvent::from_text(ChatId(chat), Self::sender(chat), text);
        self.pipeline.handle(event).await;
    }

    pub async fn callback(&self, chat: i64, data: &str) {
        let event = InboundEvent::callback(
            ChatId(chat),
            Self::sender(chat),
            format!("q-{chat}"),
            data.to_string(),
        );
        self.pipeline.handle(event).await;
    }

    /// Taps the reply-keyboard button whose label contains `needle`.
    pub async fn tap(&self, chat: i64, needle: &str) {
        let labels = self.reply_labels(chat);
        let label = labels
            .iter()
            .find(|l| l.contains(needle))
            .unwrap_or_else(|| panic!("no button containing {needle:?} in {labels:?}"))
            .clone();
        self.text(chat, &label).await;
    }

    /// Labels of the most recent reply keyboard sent to `chat`.
    pub fn reply_labels(&self, chat: i64) -> Vec<String> {
        self.transport
            .sent_to(chat)
            .into_iter()
            .rev()
            .find_map(|m| match m.keyboard {
                Keyboard::Reply(rows) => Some(rows.into_iter().flatten().collect()),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn texts(&self, chat: i64) -> Vec<String> {
        self.transport
            .sent_to(chat)
            .into_iter()
            .map(|m| m.text)
            .collect()
    }

    pub fn last_text(&self, chat: i64) -> String {
        self.texts(chat).pop().unwrap_or_default()
    }

    pub async fn user(&self, chat: i64) -> User {
        use uasocial_bot::database::Storage;
        use uasocial_bot::database::models::NewUser;
        self.storage
            .upsert_user(NewUser {
                tg_id: chat,
                chat_id: chat,
                name: format!("user{chat}"),
                language: Lang::En,
            })
            .await
            .expect("upsert")
    }

    /// Waits for running fan-outs, then returns everything queued so far.
    pub async fn drain_notifications(&mut self) -> Vec<Notification> {
        self.app.tasks.close();
        self.app.tasks.wait().await;
        self.app.tasks.reopen();
        let mut out = Vec::new();
        while let Ok(n) = self.notifications.try_recv() {
            out.push(n);
        }
        out
    }

    /// Walks a volunteer through the whole flow for one category.
    pub async fn post_help(&self, chat: i64, category: &str, locality: &str, pick: &str, text: &str) {
        self.text(chat, "/start").await;
        self.tap(chat, "I want to help").await;
        self.tap(chat, category).await;
        self.tap(chat, "Next").await;
        self.text(chat, locality).await;
        self.tap(chat, pick).await;
        self.text(chat, text).await;
    }

    /// Walks a seeker through to a created subscription.
    pub async fn subscribe(&self, chat: i64, category: &str, locality: &str, pick: &str) {
        self.text(chat, "/start").await;
        self.tap(chat, "I need help").await;
        self.tap(chat, category).await;
        self.text(chat, locality).await;
        self.tap(chat, pick).await;
        self.tap(chat, "Subscribe").await;
    }
}
