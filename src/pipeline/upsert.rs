use super::{Middleware, Next, Update};
use crate::AppState;
use crate::database::models::NewUser;
use crate::i18n::Lang;
use crate::transport::{OutboundMessage, Payload};
use async_trait::async_trait;
use std::sync::Arc;

/// Resolves the sender to a stored user before anything else runs. When storage
/// is unavailable the sender gets a generic error and the event stops here.
pub struct UserUpsert {
    app: Arc<AppState>,
}

impl UserUpsert {
    pub fn new(app: Arc<AppState>) -> Self {
        Self { app }
    }
}

#[async_trait]
impl Middleware for UserUpsert {
    async fn handle(&self, mut update: Update, next: Next<'_>) {
        let event = &update.event;
        let chat_id = event.chat_id;
        let hinted = event
            .sender
            .language
            .as_deref()
            .and_then(Lang::from_client_hint)
            .unwrap_or(self.app.lang);
        let new_user = NewUser {
            tg_id: event.sender.tg_id,
            chat_id: chat_id.0,
            name: event.sender.name.clone(),
            language: hinted,
        };

        match self.app.storage.upsert_user(new_user).await {
            Ok(user) => {
                tracing::trace!(target: "pipeline.upsert", %chat_id, user_id = %user.id, "sender resolved");
                update.user = Some(user);
                next.run(update).await;
            }
            Err(e) => {
                tracing::error!(target: "pipeline.upsert", %chat_id, error = ?e, "user upsert failed; event dropped");
                if let Payload::Callback { query_id, .. } = &update.event.payload
                    && let Err(e) = self.app.transport.answer_callback(query_id).await
                {
                    tracing::warn!(target: "pipeline.upsert", %chat_id, error = %e, "failed to answer callback");
                }
                let text = self.app.i18n.translate("error_500", hinted);
                if let Err(e) = self.app.transport.send(chat_id, OutboundMessage::text(text)).await {
                    tracing::warn!(target: "pipeline.upsert", %chat_id, error = %e, "failed to send error reply");
                }
            }
        }
    }
}
