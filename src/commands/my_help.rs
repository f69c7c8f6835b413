use crate::handler::Turn;
use crate::interactions::ids::CallbackAction;
use crate::transport::OutboundMessage;
use crate::ui::cards;

/// `/myhelp`: one card per active Help, each with its own delete button.
pub async fn run(turn: &Turn<'_>) -> anyhow::Result<()> {
    let helps = turn.app.storage.helps_by_user(turn.user.id).await?;
    if helps.is_empty() {
        return turn.send(OutboundMessage::text(turn.t("error_no_helps")).remove_keyboard()).await;
    }
    for help in &helps {
        let card = cards::help_card(&turn.app.i18n, turn.lang, &turn.app.categories, help);
        let keyboard = cards::delete_button(&turn.app.i18n, turn.lang, CallbackAction::DeleteHelp(help.id));
        turn.send(OutboundMessage::text(card).with_keyboard(keyboard)).await?;
    }
    Ok(())
}
