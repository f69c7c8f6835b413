//! Drives one inbound text message through the chat's current step.
//!
//! The caller holds the chat's session guard for the whole call. The step runs
//! on a copy of the session and the copy is stored only when the step succeeds,
//! so a failed send or storage call leaves the previous state for a retry.

use super::state::{Flow, Role, SeekerData, Session, Signal, Step, Transition, VolunteerData, transition};
use super::{locality, seeker, volunteer};
use crate::handler::Turn;
use crate::transport::OutboundMessage;
use crate::ui::keyboard::{self, ControlAction, ControlPad};

pub async fn on_text(turn: &Turn<'_>, slot: &mut Option<Session>, text: &str) -> anyhow::Result<()> {
    let Some(current) = slot.as_ref() else {
        *slot = Some(begin(turn).await?);
        return Ok(());
    };
    if !current.is_consistent() {
        tracing::warn!(target: "dialog", chat_id = %turn.chat, step = current.step.label(), "session payload does not match step; restarting");
        *slot = Some(begin(turn).await?);
        return Ok(());
    }

    let action = keyboard::resolve(&current.controls, text);
    if action == Some(ControlAction::Cancel) {
        *slot = None;
        tracing::debug!(target: "dialog", chat_id = %turn.chat, "dialog cancelled");
        return turn
            .send(OutboundMessage::text(turn.t("dialog_cancelled")).remove_keyboard())
            .await;
    }

    let mut draft = current.clone();
    let from = draft.step;
    match run_step(turn, &mut draft, action, text).await {
        Ok(Transition::Finish) => {
            tracing::debug!(target: "dialog", chat_id = %turn.chat, step = from.label(), "dialog finished");
            *slot = None;
        }
        Ok(_) => *slot = Some(draft),
        Err(e) => {
            tracing::error!(target: "dialog", chat_id = %turn.chat, step = from.label(), error = ?e, "step failed; keeping previous state");
        }
    }
    Ok(())
}

/// A fresh session at the role request, with the prompt already sent.
pub async fn begin(turn: &Turn<'_>) -> anyhow::Result<Session> {
    let mut session = Session::new(turn.chat);
    enter(turn, &mut session, Step::RoleRequest).await?;
    Ok(session)
}

async fn run_step(
    turn: &Turn<'_>,
    draft: &mut Session,
    action: Option<ControlAction>,
    text: &str,
) -> anyhow::Result<Transition> {
    let signal = match draft.step {
        Step::RoleRequest => choose_role(turn, action).await?,
        Step::VolunteerCategory => volunteer::toggle_category(turn, draft, action).await?,
        Step::VolunteerLocalityInput
        | Step::VolunteerLocalityConfirm
        | Step::SeekerLocalityInput
        | Step::SeekerLocalityConfirm => locality::handle(turn, draft, action, text).await?,
        Step::VolunteerDescription => volunteer::describe(turn, draft, text).await?,
        Step::SeekerCategory => seeker::pick_category(turn, draft, action).await?,
        Step::SeekerSubscribeOffer => seeker::subscribe(turn, draft, action).await?,
    };
    let next = transition(draft.step, signal);
    tracing::debug!(target: "dialog", chat_id = %turn.chat, step = draft.step.label(), ?signal, ?next, "transition");
    if let Transition::Goto(step) = next {
        enter(turn, draft, step).await?;
    }
    Ok(next)
}

async fn choose_role(turn: &Turn<'_>, action: Option<ControlAction>) -> anyhow::Result<Signal> {
    let storage = &turn.app.storage;
    let limits = &turn.app.limits;
    let (role, active, limit, key) = match action {
        Some(ControlAction::Role(Role::Volunteer)) => (
            Role::Volunteer,
            storage.count_active_helps_by_user(turn.user.id).await?,
            limits.max_helps,
            "error_helps_limit_exceeded",
        ),
        Some(ControlAction::Role(Role::Seeker)) => (
            Role::Seeker,
            storage.count_active_subscriptions_by_user(turn.user.id).await?,
            limits.max_subscriptions,
            "error_subscriptions_limit_exceeded",
        ),
        _ => {
            turn.say("error_choose_option").await?;
            return Ok(Signal::Invalid);
        }
    };
    if active >= limit {
        tracing::info!(target: "dialog", chat_id = %turn.chat, ?role, active, limit, "quota reached");
        let text = turn.t_with(key, &[("limit", limit.to_string())]);
        turn.send(OutboundMessage::text(text).remove_keyboard()).await?;
        return Ok(Signal::QuotaExceeded);
    }
    Ok(Signal::RoleChosen(role))
}

/// Moves the draft to `step` and sends that step's prompt.
pub(crate) async fn enter(turn: &Turn<'_>, draft: &mut Session, step: Step) -> anyhow::Result<()> {
    let app = turn.app;
    let lang = turn.lang;
    let (text, pad) = match step {
        Step::RoleRequest => {
            draft.flow = Flow::Unset;
            (turn.t("user_role_request"), keyboard::role_pad(&app.i18n, lang))
        }
        Step::VolunteerCategory => {
            let data = VolunteerData::new(&app.categories);
            let pad = keyboard::volunteer_categories_pad(&app.i18n, lang, &app.categories, &data);
            draft.flow = Flow::Volunteer(data);
            (turn.t("volunteer_select_categories_request"), pad)
        }
        Step::SeekerCategory => {
            draft.flow = Flow::Seeker(SeekerData::default());
            (
                turn.t("seeker_category_request"),
                keyboard::seeker_categories_pad(&app.i18n, lang, &app.categories),
            )
        }
        Step::VolunteerLocalityInput | Step::SeekerLocalityInput => (
            turn.t("user_locality_request"),
            keyboard::cancel_pad(&app.i18n, lang),
        ),
        Step::VolunteerLocalityConfirm | Step::SeekerLocalityConfirm => (
            turn.t("user_locality_reply"),
            keyboard::localities_pad(&app.i18n, lang, draft.flow.candidates()),
        ),
        Step::VolunteerDescription => (
            turn.t("volunteer_enter_description_request"),
            keyboard::cancel_pad(&app.i18n, lang),
        ),
        Step::SeekerSubscribeOffer => (
            turn.t("seeker_subscription_proposal"),
            keyboard::subscribe_pad(&app.i18n, lang),
        ),
    };
    draft.step = step;
    show(turn, draft, text, pad).await
}

/// Sends `text` with the pad's keyboard and remembers its controls.
pub(crate) async fn show(
    turn: &Turn<'_>,
    draft: &mut Session,
    text: String,
    pad: ControlPad,
) -> anyhow::Result<()> {
    turn.send(OutboundMessage::text(text).with_keyboard(pad.keyboard()))
        .await?;
    draft.controls = pad.into_controls();
    Ok(())
}
