use crate::handler::Turn;
use crate::interactions::ids::CallbackAction;
use crate::transport::OutboundMessage;
use crate::ui::cards;

/// `/mysubscriptions`: same layout as `/myhelp`, the button unsubscribes.
pub async fn run(turn: &Turn<'_>) -> anyhow::Result<()> {
    let subscriptions = turn.app.storage.subscriptions_by_user(turn.user.id).await?;
    if subscriptions.is_empty() {
        return turn
            .send(OutboundMessage::text(turn.t("error_no_subscriptions")).remove_keyboard())
            .await;
    }
    for sub in &subscriptions {
        let card = cards::subscription_card(&turn.app.i18n, turn.lang, &turn.app.categories, sub);
        let keyboard = cards::delete_button(
            &turn.app.i18n,
            turn.lang,
            CallbackAction::DeleteSubscription(sub.id),
        );
        turn.send(OutboundMessage::text(card).with_keyboard(keyboard)).await?;
    }
    Ok(())
}
