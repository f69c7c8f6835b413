//! Periodic expiry sweep with keep-alive.
//!
//! An entity inactive for longer than the retention window first gets a
//! keep / delete prompt and `warned_at` is set. If it is still inactive
//! `keep_grace` after the prompt it is soft-deleted and the creator is told.
//! Neither step is recorded unless its notice was queued; a dropped notice
//! leaves the entity for the next sweep.
//! Tapping "keep" resets its activity time and clears the warning.

use super::Notification;
use crate::AppState;
use crate::database::models::{ExpiringHelp, ExpiringSubscription};
use crate::interactions::ids::CallbackAction;
use crate::transport::{ChatId, OutboundMessage};
use crate::ui::cards;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub warned_helps: usize,
    pub removed_helps: usize,
    pub warned_subscriptions: usize,
    pub removed_subscriptions: usize,
}

enum Verdict {
    Warn,
    Remove,
    Wait,
}

fn verdict(warned_at: Option<DateTime<Utc>>, grace_cutoff: DateTime<Utc>) -> Verdict {
    match warned_at {
        None => Verdict::Warn,
        Some(at) if at <= grace_cutoff => Verdict::Remove,
        Some(_) => Verdict::Wait,
    }
}

pub async fn sweep_once(app: &AppState, now: DateTime<Utc>) -> anyhow::Result<SweepReport> {
    let cutoff = now - app.sweep.retention;
    let grace_cutoff = now - app.sweep.keep_grace;
    let mut report = SweepReport::default();

    for entry in app.storage.expired_helps(cutoff).await? {
        match verdict(entry.warned_at, grace_cutoff) {
            Verdict::Warn => {
                if !app.notifier.push(help_prompt(app, &entry)).await {
                    skipped("help", entry.help.id);
                    continue;
                }
                app.storage.mark_help_warned(entry.help.id, now).await?;
                report.warned_helps += 1;
            }
            Verdict::Remove => {
                if !app.notifier.push(help_removed(app, &entry)).await {
                    skipped("help", entry.help.id);
                    continue;
                }
                if app
                    .storage
                    .delete_help(entry.help.id, entry.help.creator_id)
                    .await?
                {
                    report.removed_helps += 1;
                }
            }
            Verdict::Wait => {}
        }
    }

    for entry in app.storage.expired_subscriptions(cutoff).await? {
        let sub = &entry.subscription;
        match verdict(entry.warned_at, grace_cutoff) {
            Verdict::Warn => {
                if !app.notifier.push(subscription_prompt(app, &entry)).await {
                    skipped("subscription", sub.id);
                    continue;
                }
                app.storage.mark_subscription_warned(sub.id, now).await?;
                report.warned_subscriptions += 1;
            }
            Verdict::Remove => {
                if !app.notifier.push(subscription_removed(app, &entry)).await {
                    skipped("subscription", sub.id);
                    continue;
                }
                if app.storage.delete_subscription(sub.id, sub.creator_id).await? {
                    report.removed_subscriptions += 1;
                }
            }
            Verdict::Wait => {}
        }
    }
    Ok(report)
}

fn skipped(kind: &'static str, id: Uuid) {
    tracing::warn!(target: "notify.sweep", kind, %id, "notice not queued, retrying next sweep");
}

fn help_text(app: &AppState, entry: &ExpiringHelp, key: &str) -> (ChatId, String) {
    let lang = entry.creator_language.parse().unwrap_or(app.lang);
    let text = format!(
        "{}\n\n{}",
        app.i18n.translate(key, lang),
        cards::help_card(&app.i18n, lang, &app.categories, &entry.help)
    );
    (ChatId(entry.creator_chat_id), text)
}

fn help_prompt(app: &AppState, entry: &ExpiringHelp) -> Notification {
    let lang = entry.creator_language.parse().unwrap_or(app.lang);
    let (chat, text) = help_text(app, entry, "help_expiring");
    let keyboard = cards::keep_or_delete(
        &app.i18n,
        lang,
        CallbackAction::KeepHelp(entry.help.id),
        CallbackAction::DeleteHelp(entry.help.id),
    );
    Notification::new(chat, "help_expiring", OutboundMessage::text(text).with_keyboard(keyboard))
}

fn help_removed(app: &AppState, entry: &ExpiringHelp) -> Notification {
    let (chat, text) = help_text(app, entry, "help_expired_removed");
    Notification::new(chat, "help_removed", OutboundMessage::text(text))
}

fn subscription_text(app: &AppState, entry: &ExpiringSubscription, key: &str) -> (ChatId, String) {
    let lang = entry.creator_language.parse().unwrap_or(app.lang);
    let text = format!(
        "{}\n\n{}",
        app.i18n.translate(key, lang),
        cards::subscription_card(&app.i18n, lang, &app.categories, &entry.subscription)
    );
    (ChatId(entry.creator_chat_id), text)
}

fn subscription_prompt(app: &AppState, entry: &ExpiringSubscription) -> Notification {
    let lang = entry.creator_language.parse().unwrap_or(app.lang);
    let (chat, text) = subscription_text(app, entry, "subscription_expiring");
    let keyboard = cards::keep_or_delete(
        &app.i18n,
        lang,
        CallbackAction::KeepSubscription(entry.subscription.id),
        CallbackAction::DeleteSubscription(entry.subscription.id),
    );
    Notification::new(
        chat,
        "subscription_expiring",
        OutboundMessage::text(text).with_keyboard(keyboard),
    )
}

fn subscription_removed(app: &AppState, entry: &ExpiringSubscription) -> Notification {
    let (chat, text) = subscription_text(app, entry, "subscription_expired_removed");
    Notification::new(chat, "subscription_removed", OutboundMessage::text(text))
}

/// Runs `sweep_once` every `sweep.interval` (first run immediately) and prunes idle
/// session slots, until `shutdown` fires.
pub async fn run_sweeper(app: Arc<AppState>, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(app.sweep.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                match sweep_once(&app, Utc::now()).await {
                    Ok(report) => tracing::info!(target: "notify.sweep", ?report, "expiry sweep done"),
                    Err(e) => tracing::error!(target: "notify.sweep", error = ?e, "expiry sweep failed"),
                }
                let pruned = app.sessions.prune_idle().await;
                tracing::debug!(target: "notify.sweep", pruned, "idle session slots pruned");
            }
        }
    }
    tracing::info!(target: "notify.sweep", "sweeper stopped");
}
