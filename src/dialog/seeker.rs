//! Seeker steps: one category, a locality, the list of matching Helps, and an
//! offer to subscribe for new ones.

use super::state::{Flow, Session, Signal};
use crate::database::StorageError;
use crate::database::models::NewSubscription;
use crate::handler::Turn;
use crate::transport::OutboundMessage;
use crate::ui::cards;
use crate::ui::keyboard::ControlAction;
use anyhow::{Context, bail};

pub async fn pick_category(
    turn: &Turn<'_>,
    draft: &mut Session,
    action: Option<ControlAction>,
) -> anyhow::Result<Signal> {
    let Flow::Seeker(data) = &mut draft.flow else {
        bail!("seeker step without seeker payload");
    };
    match action {
        Some(ControlAction::PickCategory(id)) if turn.app.categories.iter().any(|c| c.id == id) => {
            data.category = Some(id);
            Ok(Signal::CategoryPicked)
        }
        _ => {
            turn.say("error_choose_option").await?;
            Ok(Signal::Invalid)
        }
    }
}

/// Sends every active Help for the chosen category and locality, one card each.
pub async fn list_matches(turn: &Turn<'_>, draft: &Session) -> anyhow::Result<()> {
    let Flow::Seeker(data) = &draft.flow else {
        bail!("seeker step without seeker payload");
    };
    let (Some(category), Some(locality)) = (data.category, data.locality.as_ref()) else {
        bail!("listing without category and locality");
    };
    turn.say("seeker_looking_for_volunteers").await?;
    let helps = turn
        .app
        .storage
        .find_helps_by_locality_category(locality.id, category)
        .await
        .context("find helps")?;
    tracing::debug!(target: "dialog", chat_id = %turn.chat, locality_id = locality.id, found = helps.len(), "listing helps");
    if helps.is_empty() {
        return turn.say("seeker_helps_empty").await;
    }
    for help in &helps {
        let card = cards::help_card(&turn.app.i18n, turn.lang, &turn.app.categories, help);
        turn.send(OutboundMessage::text(card)).await?;
    }
    Ok(())
}

/// Anything but the subscribe control is ignored and the offer stays open.
pub async fn subscribe(
    turn: &Turn<'_>,
    draft: &mut Session,
    action: Option<ControlAction>,
) -> anyhow::Result<Signal> {
    if action != Some(ControlAction::Subscribe) {
        tracing::debug!(target: "dialog", chat_id = %turn.chat, "ignoring input at subscription offer");
        return Ok(Signal::Invalid);
    }
    let Flow::Seeker(data) = &draft.flow else {
        bail!("seeker step without seeker payload");
    };
    let (Some(category_id), Some(locality)) = (data.category, data.locality.as_ref()) else {
        bail!("subscription without category and locality");
    };
    let request = NewSubscription {
        creator_id: turn.user.id,
        category_id,
        locality_id: locality.id,
    };
    match turn.app.storage.create_subscription(request).await {
        Ok(sub) => {
            tracing::info!(target: "dialog", chat_id = %turn.chat, subscription_id = %sub.id, "subscription created");
            let text = turn.t("seeker_subscription_create_success");
            if let Err(e) = turn.send(OutboundMessage::text(text).remove_keyboard()).await {
                tracing::warn!(target: "dialog", chat_id = %turn.chat, error = ?e, "subscription saved but confirmation not delivered");
            }
            Ok(Signal::Subscribed)
        }
        Err(StorageError::AlreadyExists) => {
            turn.say("seeker_subscription_already_exists").await?;
            Ok(Signal::AlreadySubscribed)
        }
        Err(e) => Err(e).context("create subscription"),
    }
}
