use crate::AppState;
use crate::commands;
use crate::database::models::User;
use crate::dialog::engine;
use crate::dialog::state::Session;
use crate::i18n::Lang;
use crate::interactions::callback_handler;
use crate::pipeline::{Endpoint, Update};
use crate::transport::{ChatId, OutboundMessage, Payload};
use anyhow::Context;
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;

enum Command {
    Start,
    MyHelp,
    MySubscriptions,
    Support,
    Cancel,
    Unknown,
}

impl FromStr for Command {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" | "restart" => Ok(Command::Start),
            "myhelp" | "myhelps" => Ok(Command::MyHelp),
            "mysubscriptions" | "mysubs" => Ok(Command::MySubscriptions),
            "support" | "help" => Ok(Command::Support),
            "cancel" | "stop" => Ok(Command::Cancel),
            _ => Ok(Command::Unknown),
        }
    }
}

/// Everything a command, dialog step or callback needs for one event.
pub struct Turn<'a> {
    pub app: &'a AppState,
    pub user: &'a User,
    pub chat: ChatId,
    /// The user's stored language, or the bot default.
    pub lang: Lang,
}

impl<'a> Turn<'a> {
    pub fn new(app: &'a AppState, user: &'a User, chat: ChatId) -> Self {
        Self {
            app,
            user,
            chat,
            lang: user.lang().unwrap_or(app.lang),
        }
    }

    pub fn t(&self, key: &str) -> String {
        self.app.i18n.translate(key, self.lang)
    }

    pub fn t_with(&self, key: &str, args: &[(&str, String)]) -> String {
        self.app.i18n.translate_with(key, self.lang, args)
    }

    pub async fn send(&self, message: OutboundMessage) -> anyhow::Result<()> {
        self.app
            .transport
            .send(self.chat, message)
            .await
            .with_context(|| format!("failed to send to chat {}", self.chat))
    }

    /// Sends a single translated string.
    pub async fn say(&self, key: &str) -> anyhow::Result<()> {
        self.send(OutboundMessage::text(self.t(key))).await
    }
}

/// Terminal stage of the pipeline: routes commands, callbacks and dialog text.
pub struct Handler {
    app: Arc<AppState>,
}

impl Handler {
    pub fn new(app: Arc<AppState>) -> Self {
        Self { app }
    }
}

#[async_trait]
impl Endpoint for Handler {
    async fn call(&self, update: Update) {
        let Some(user) = update.user else {
            tracing::warn!(target: "handler", chat_id = %update.event.chat_id, "event reached the handler without a resolved user");
            return;
        };
        let chat = update.event.chat_id;
        let turn = Turn::new(&self.app, &user, chat);
        // Held until the event is fully handled; other events for this chat wait here.
        let mut slot = self.app.sessions.lock(chat).await;

        let result = match update.event.payload {
            Payload::Command { name } => {
                *slot = None;
                let command = Command::from_str(&name).unwrap_or(Command::Unknown);
                run_command(&turn, &mut slot, command, &name).await
            }
            Payload::Callback { query_id, data } => {
                callback_handler::handle(&turn, &query_id, &data).await
            }
            Payload::Text(text) => engine::on_text(&turn, &mut slot, &text).await,
        };

        if let Err(e) = result {
            tracing::error!(target: "handler", chat_id = %chat, error = ?e, "event handling failed");
        }
    }
}

async fn run_command(
    turn: &Turn<'_>,
    slot: &mut Option<Session>,
    command: Command,
    name: &str,
) -> anyhow::Result<()> {
    tracing::debug!(target: "handler", chat_id = %turn.chat, command = name, "command");
    match command {
        Command::Start => commands::start::run(turn, slot).await,
        Command::MyHelp => commands::my_help::run(turn).await,
        Command::MySubscriptions => commands::my_subscriptions::run(turn).await,
        Command::Support => commands::support::run(turn).await,
        Command::Cancel => commands::support::cancel(turn).await,
        Command::Unknown => commands::support::unknown(turn).await,
    }
}
