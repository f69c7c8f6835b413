//! Telegram Bot API adapter built on teloxide.
//!
//! Outbound: maps `OutboundMessage` keyboards onto reply / inline markup.
//! Inbound: long polling through teloxide's dispatcher; every text message and
//! callback query is converted to an `InboundEvent` and handed to the pipeline.

use super::{ChatId, InboundEvent, Keyboard, OutboundMessage, Sender, Transport, TransportError};
use crate::pipeline::Pipeline;
use async_trait::async_trait;
use std::sync::Arc;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::types::{
    ChatId as TgChatId, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton,
    KeyboardMarkup, KeyboardRemove, User,
};
use teloxide::{ApiError, RequestError};
use tokio_util::sync::CancellationToken;

pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send(&self, chat_id: ChatId, message: OutboundMessage) -> Result<(), TransportError> {
        let request = self.bot.send_message(TgChatId(chat_id.0), message.text);
        let request = match message.keyboard {
            Keyboard::Unchanged => request,
            Keyboard::Remove => request.reply_markup(KeyboardRemove::new()),
            Keyboard::Reply(rows) => {
                let markup = KeyboardMarkup::new(
                    rows.into_iter()
                        .map(|row| row.into_iter().map(KeyboardButton::new).collect::<Vec<_>>()),
                )
                .resize_keyboard();
                request.reply_markup(markup)
            }
            Keyboard::Inline(rows) => {
                let markup = InlineKeyboardMarkup::new(rows.into_iter().map(|row| {
                    row.into_iter()
                        .map(|b| InlineKeyboardButton::callback(b.label, b.data))
                        .collect::<Vec<_>>()
                }));
                request.reply_markup(markup)
            }
        };
        request.await.map(|_| ()).map_err(classify)
    }

    async fn answer_callback(&self, query_id: &str) -> Result<(), TransportError> {
        self.bot
            .answer_callback_query(query_id.to_string())
            .await
            .map(|_| ())
            .map_err(classify)
    }
}

fn classify(err: RequestError) -> TransportError {
    match &err {
        RequestError::Api(
            ApiError::BotBlocked
            | ApiError::BotKicked
            | ApiError::ChatNotFound
            | ApiError::UserDeactivated,
        ) => TransportError::Recipient(err.to_string()),
        RequestError::Api(ApiError::InvalidToken) => TransportError::Fatal(err.to_string()),
        _ => TransportError::Other(err.to_string()),
    }
}

fn sender_of(user: &User) -> Sender {
    Sender {
        tg_id: user.id.0 as i64,
        name: user.username.clone().unwrap_or_else(|| user.full_name()),
        language: user.language_code.clone(),
    }
}

/// Converts a text message; non-text messages (stickers, photos) and anonymous posts yield `None`.
pub fn inbound_from_message(msg: &Message) -> Option<InboundEvent> {
    let text = msg.text()?;
    let user = msg.from.as_ref()?;
    Some(InboundEvent::from_text(
        ChatId(msg.chat.id.0),
        sender_of(user),
        text,
    ))
}

pub fn inbound_from_callback(query: &CallbackQuery) -> Option<InboundEvent> {
    let chat = query.message.as_ref()?.chat().id;
    let data = query.data.clone()?;
    Some(InboundEvent::callback(
        ChatId(chat.0),
        sender_of(&query.from),
        query.id.clone(),
        data,
    ))
}

async fn on_message(msg: Message, pipeline: Arc<Pipeline>) -> ResponseResult<()> {
    match inbound_from_message(&msg) {
        Some(event) => pipeline.handle(event).await,
        None => {
            tracing::debug!(target: "transport.telegram", chat_id = msg.chat.id.0, "ignoring non-text message")
        }
    }
    Ok(())
}

async fn on_callback(query: CallbackQuery, pipeline: Arc<Pipeline>) -> ResponseResult<()> {
    match inbound_from_callback(&query) {
        Some(event) => pipeline.handle(event).await,
        None => {
            tracing::debug!(target: "transport.telegram", query_id = %query.id, "callback without message or data");
        }
    }
    Ok(())
}

/// Runs long polling until `shutdown` fires. Returns once the dispatcher has stopped
/// accepting updates; handlers already running are allowed to finish.
pub async fn run_polling(bot: Bot, pipeline: Arc<Pipeline>, shutdown: CancellationToken) {
    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![pipeline])
        .default_handler(|upd| async move {
            tracing::trace!(target: "transport.telegram", update = ?upd, "unhandled update");
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "Error in telegram update handler",
        ))
        .build();

    let token = dispatcher.shutdown_token();
    tokio::spawn(async move {
        shutdown.cancelled().await;
        match token.shutdown() {
            Ok(stopped) => stopped.await,
            Err(e) => tracing::debug!(target: "transport.telegram", error = ?e, "dispatcher was idle at shutdown"),
        }
    });

    tracing::info!(target: "transport.telegram", "starting long polling");
    dispatcher.dispatch().await;
    tracing::info!(target: "transport.telegram", "dispatcher stopped");
}
