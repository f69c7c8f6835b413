//! Alerts subscribers about a newly created Help.

use super::{Notification, Notifier};
use crate::AppState;
use crate::database::Storage;
use crate::database::models::{Category, HelpView};
use crate::i18n::{Lang, Localizer};
use crate::transport::{ChatId, OutboundMessage};
use crate::ui::cards;
use std::collections::HashSet;

/// Runs the fan-out on the supervised task tracker so shutdown waits for it.
pub fn spawn(app: &AppState, locality_id: i32, help: HelpView) {
    let storage = app.storage.clone();
    let i18n = app.i18n.clone();
    let categories = app.categories.clone();
    let notifier = app.notifier.clone();
    let default_lang = app.lang;
    app.tasks.spawn(async move {
        match notify_subscribers(
            storage.as_ref(),
            &i18n,
            &categories,
            &notifier,
            default_lang,
            locality_id,
            &help,
        )
        .await
        {
            Ok(queued) => {
                tracing::info!(target: "notify.fanout", help_id = %help.id, queued, "help fan-out done");
            }
            Err(e) => {
                tracing::error!(target: "notify.fanout", help_id = %help.id, error = ?e, "help fan-out failed");
            }
        }
    });
}

/// Queues one alert per subscriber chat. A chat holding several matching
/// subscriptions hears once; the Help's own creator is skipped. Returns the number queued.
pub async fn notify_subscribers(
    storage: &dyn Storage,
    i18n: &Localizer,
    categories: &[Category],
    notifier: &Notifier,
    default_lang: Lang,
    locality_id: i32,
    help: &HelpView,
) -> anyhow::Result<usize> {
    let matches = storage
        .find_subscriptions_by_locality_categories(locality_id, &help.category_ids)
        .await?;
    let mut seen = HashSet::new();
    let mut queued = 0;
    for m in matches {
        if m.creator_id == help.creator_id || !seen.insert(m.chat_id) {
            continue;
        }
        let lang = m.language.parse().unwrap_or(default_lang);
        let text = format!(
            "{}\n\n{}",
            i18n.translate("seeker_subscription_update_header", lang),
            cards::help_card(i18n, lang, categories, help)
        );
        let note = Notification::new(ChatId(m.chat_id), "help_match", OutboundMessage::text(text));
        if notifier.push(note).await {
            queued += 1;
        }
    }
    Ok(queued)
}
