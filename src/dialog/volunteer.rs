//! Volunteer steps: multi-select categories, then a free-text description that
//! creates the Help.

use super::engine::show;
use super::state::{Flow, Session, Signal};
use crate::database::models::{HelpView, NewHelp};
use crate::handler::Turn;
use crate::notify::fanout;
use crate::transport::OutboundMessage;
use crate::ui::cards;
use crate::ui::keyboard::{self, ControlAction};
use anyhow::{Context, bail};

pub async fn toggle_category(
    turn: &Turn<'_>,
    draft: &mut Session,
    action: Option<ControlAction>,
) -> anyhow::Result<Signal> {
    let app = turn.app;
    let Flow::Volunteer(data) = &mut draft.flow else {
        bail!("volunteer step without volunteer payload");
    };
    match action {
        Some(ControlAction::ToggleCategory(id)) => {
            if !data.toggle(id) {
                turn.say("error_choose_option").await?;
                return Ok(Signal::Invalid);
            }
            let text = if data.has_selection() {
                cards::chosen_categories(&app.i18n, turn.lang, &app.categories, &data.selected())
            } else {
                turn.t("volunteer_select_categories_request")
            };
            let pad = keyboard::volunteer_categories_pad(&app.i18n, turn.lang, &app.categories, data);
            show(turn, draft, text, pad).await?;
            Ok(Signal::CategoryToggled)
        }
        Some(ControlAction::Next) if data.has_selection() => Ok(Signal::CategoriesConfirmed),
        _ => {
            turn.say("error_choose_option").await?;
            Ok(Signal::Invalid)
        }
    }
}

pub async fn describe(turn: &Turn<'_>, draft: &mut Session, text: &str) -> anyhow::Result<Signal> {
    let description = text.trim();
    if description.is_empty() {
        turn.say("error_empty_description").await?;
        return Ok(Signal::Invalid);
    }
    let Flow::Volunteer(data) = &mut draft.flow else {
        bail!("volunteer step without volunteer payload");
    };
    let Some(locality) = data.locality.clone() else {
        bail!("description step without a confirmed locality");
    };
    data.description = Some(description.to_string());

    let help = turn
        .app
        .storage
        .create_help(NewHelp {
            creator_id: turn.user.id,
            category_ids: data.selected(),
            locality_id: locality.id,
            description: description.to_string(),
        })
        .await
        .context("create help")?;
    tracing::info!(target: "dialog", chat_id = %turn.chat, help_id = %help.id, locality_id = help.locality_id, "help created");

    let locality_id = help.locality_id;
    let view = HelpView {
        id: help.id,
        creator_id: help.creator_id,
        locality: locality.display(),
        category_ids: help.category_ids,
        description: help.description,
        created_at: help.created_at,
    };
    fanout::spawn(turn.app, locality_id, view.clone());

    // The Help exists now; a failed confirmation must not reopen the flow for a duplicate.
    let summary = format!(
        "{}\n\n{}",
        turn.t("volunteer_summary_header"),
        cards::help_card(&turn.app.i18n, turn.lang, &turn.app.categories, &view)
    );
    if let Err(e) = turn.send(OutboundMessage::text(summary).remove_keyboard()).await {
        tracing::warn!(target: "dialog", chat_id = %turn.chat, error = ?e, "help saved but summary not delivered");
    }
    Ok(Signal::HelpCreated)
}
