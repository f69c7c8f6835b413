use crate::handler::Turn;
use crate::transport::OutboundMessage;

pub async fn run(turn: &Turn<'_>) -> anyhow::Result<()> {
    let text = format!("{}\n\n{}", turn.t("cmd_support"), turn.t("navigation_hint"));
    turn.send(OutboundMessage::text(text).remove_keyboard()).await
}

/// `/cancel` behaves like the cancel button; the session is already gone.
pub async fn cancel(turn: &Turn<'_>) -> anyhow::Result<()> {
    turn.send(OutboundMessage::text(turn.t("dialog_cancelled")).remove_keyboard())
        .await
}

pub async fn unknown(turn: &Turn<'_>) -> anyhow::Result<()> {
    let text = format!("{}\n\n{}", turn.t("error_unknown_command"), turn.t("navigation_hint"));
    turn.send(OutboundMessage::text(text)).await
}
