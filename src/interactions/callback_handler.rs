use super::ids::CallbackAction;
use crate::handler::Turn;
use crate::transport::OutboundMessage;

/// Applies delete / keep for the tapped entity. Ownership is enforced by storage, so a
/// stale button or someone else's entity replies "not found". The callback query is
/// always answered so the client stops its spinner.
pub async fn handle(turn: &Turn<'_>, query_id: &str, data: &str) -> anyhow::Result<()> {
    let outcome = apply(turn, data).await;
    if let Err(e) = turn.app.transport.answer_callback(query_id).await {
        tracing::warn!(target: "interactions", chat_id = %turn.chat, error = %e, "failed to answer callback");
    }
    let Some(key) = outcome? else {
        return Ok(());
    };
    turn.send(OutboundMessage::text(turn.t(key))).await
}

async fn apply(turn: &Turn<'_>, data: &str) -> anyhow::Result<Option<&'static str>> {
    let Some(action) = CallbackAction::parse(data) else {
        tracing::warn!(target: "interactions", chat_id = %turn.chat, data, "unrecognized callback data");
        return Ok(None);
    };
    let storage = &turn.app.storage;
    let owner = turn.user.id;
    let (done, success_key) = match action {
        CallbackAction::DeleteHelp(id) => (storage.delete_help(id, owner).await?, "delete_help_success"),
        CallbackAction::KeepHelp(id) => (storage.keep_help(id, owner).await?, "keep_help_success"),
        CallbackAction::DeleteSubscription(id) => (
            storage.delete_subscription(id, owner).await?,
            "delete_subscription_success",
        ),
        CallbackAction::KeepSubscription(id) => (
            storage.keep_subscription(id, owner).await?,
            "keep_subscription_success",
        ),
    };
    tracing::info!(target: "interactions", chat_id = %turn.chat, ?action, done, "callback applied");
    Ok(Some(if done { success_key } else { "error_entity_not_found" }))
}
