//! Locality lookup and confirmation, shared by both flows.
//!
//! Free text always runs a fuzzy lookup. A locality is only accepted by tapping
//! one of the rendered `"name, region"` candidates.

use super::engine::show;
use super::seeker;
use super::state::{Session, Signal, Step};
use crate::constants::MAX_LOCALITY_CANDIDATES;
use crate::handler::Turn;
use crate::ui::keyboard::{self, ControlAction};

pub async fn handle(
    turn: &Turn<'_>,
    draft: &mut Session,
    action: Option<ControlAction>,
    text: &str,
) -> anyhow::Result<Signal> {
    let confirming = matches!(
        draft.step,
        Step::VolunteerLocalityConfirm | Step::SeekerLocalityConfirm
    );

    if confirming
        && let Some(ControlAction::PickLocality(id)) = action
        && let Some(chosen) = draft.flow.candidates().iter().find(|c| c.id == id).cloned()
    {
        tracing::debug!(target: "dialog", chat_id = %turn.chat, locality_id = chosen.id, "locality confirmed");
        draft.flow.confirm_locality(chosen);
        if draft.step == Step::SeekerLocalityConfirm {
            seeker::list_matches(turn, draft).await?;
        }
        return Ok(Signal::LocalityConfirmed);
    }

    let found = turn
        .app
        .storage
        .find_localities(text, MAX_LOCALITY_CANDIDATES)
        .await?;
    if found.is_empty() {
        tracing::debug!(target: "dialog", chat_id = %turn.chat, query = text, "no locality candidates");
        turn.say("error_please_try_again").await?;
        return Ok(Signal::NoCandidates);
    }
    draft.flow.set_candidates(found);

    // Still confirming: replace the candidate keyboard in place.
    if confirming {
        let pad = keyboard::localities_pad(&turn.app.i18n, turn.lang, draft.flow.candidates());
        show(turn, draft, turn.t("user_locality_reply"), pad).await?;
    }
    Ok(Signal::CandidatesFound)
}
