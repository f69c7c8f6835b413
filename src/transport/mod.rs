//! Transport-neutral message types and the `Transport` capability.
//!
//! The dialog engine, commands and notification dispatch only ever talk to
//! `dyn Transport`. The Telegram adapter in `telegram.rs` converts between
//! these types and the Bot API.

pub mod telegram;

use async_trait::async_trait;
use std::fmt;

/// Opaque transport-level conversation identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The author of an inbound event as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub tg_id: i64,
    pub name: String,
    /// Two-letter client language reported by the transport, if any.
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    /// Lower-cased command name; anything after it is ignored.
    Command { name: String },
    Callback { query_id: String, data: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub chat_id: ChatId,
    pub sender: Sender,
    pub payload: Payload,
}

impl InboundEvent {
    /// Builds an event from raw message text.
    /// `/start@my_bot arg` becomes `Command { name: "start" }`.
    pub fn from_text(chat_id: ChatId, sender: Sender, text: &str) -> Self {
        let payload = match text.strip_prefix('/') {
            Some(body) if !body.trim().is_empty() => {
                let head = body.split_whitespace().next().unwrap_or_default();
                let name = head.split('@').next().unwrap_or(head).to_lowercase();
                Payload::Command { name }
            }
            _ => Payload::Text(text.to_string()),
        };
        Self {
            chat_id,
            sender,
            payload,
        }
    }

    pub fn callback(chat_id: ChatId, sender: Sender, query_id: String, data: String) -> Self {
        Self {
            chat_id,
            sender,
            payload: Payload::Callback { query_id, data },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Keyboard {
    /// Leave whatever keyboard the client currently shows.
    #[default]
    Unchanged,
    /// Hide the reply keyboard.
    Remove,
    /// Reply keyboard; tapping a button sends its label as text.
    Reply(Vec<Vec<String>>),
    /// Buttons attached to the message; taps arrive as callback events.
    Inline(Vec<Vec<InlineButton>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub keyboard: Keyboard,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Keyboard::Unchanged,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = keyboard;
        self
    }

    pub fn remove_keyboard(self) -> Self {
        self.with_keyboard(Keyboard::Remove)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The recipient cannot be reached (blocked the bot, chat deleted). Other chats are unaffected.
    #[error("recipient unavailable: {0}")]
    Recipient(String),
    /// The transport itself is unusable (revoked token, etc).
    #[error("transport failure: {0}")]
    Fatal(String),
    #[error("send failed: {0}")]
    Other(String),
}

impl TransportError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, TransportError::Fatal(_))
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, chat_id: ChatId, message: OutboundMessage) -> Result<(), TransportError>;

    /// Acknowledges a callback query so the client stops its progress indicator.
    async fn answer_callback(&self, query_id: &str) -> Result<(), TransportError>;
}
