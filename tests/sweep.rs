mod common;

use chrono::{TimeDelta, TimeZone, Utc};
use common::Harness;
use uasocial_bot::interactions::ids::CallbackAction;
use uasocial_bot::notify::sweep::{SweepReport, sweep_once};
use uasocial_bot::transport::Keyboard;

fn t0() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

#[tokio::test]
async fn stale_help_is_warned_then_removed() {
    let mut h = Harness::new().await;
    h.storage.set_now(t0()).await;
    h.post_help(1, "Food", "Київ", "Київ", "hot meals").await;
    let help_id = h.storage.all_helps().await[0].0.id;
    h.drain_notifications().await;

    let fresh = sweep_once(&h.app, t0() + TimeDelta::days(5)).await.unwrap();
    assert_eq!(fresh, SweepReport::default());

    let warned_at = t0() + TimeDelta::days(11);
    let report = sweep_once(&h.app, warned_at).await.unwrap();
    assert_eq!(report.warned_helps, 1);
    let prompt = h.notifications.try_recv().expect("expiry prompt");
    assert_eq!(prompt.chat_id.0, 1);
    assert!(prompt.message.text.contains("Is it still relevant?"));
    let Keyboard::Inline(rows) = &prompt.message.keyboard else {
        panic!("expected inline keep/delete buttons");
    };
    let data: Vec<_> = rows.iter().flatten().map(|b| b.data.clone()).collect();
    assert_eq!(
        data,
        vec![
            CallbackAction::KeepHelp(help_id).encode(),
            CallbackAction::DeleteHelp(help_id).encode()
        ]
    );

    // Within the grace period nothing happens.
    let waiting = sweep_once(&h.app, warned_at + TimeDelta::hours(2)).await.unwrap();
    assert_eq!(waiting, SweepReport::default());

    let report = sweep_once(&h.app, warned_at + TimeDelta::hours(25)).await.unwrap();
    assert_eq!(report.removed_helps, 1);
    assert!(h.storage.all_helps().await[0].1);
    let removed = h.notifications.try_recv().expect("removal notice");
    assert!(removed.message.text.contains("removed after a period of inactivity"));
}

#[tokio::test]
async fn keep_resets_the_clock() {
    let mut h = Harness::new().await;
    h.storage.set_now(t0()).await;
    h.post_help(1, "Food", "Київ", "Київ", "hot meals").await;
    let help_id = h.storage.all_helps().await[0].0.id;
    h.drain_notifications().await;

    let warned_at = t0() + TimeDelta::days(11);
    sweep_once(&h.app, warned_at).await.unwrap();
    h.storage.set_now(warned_at + TimeDelta::hours(1)).await;
    h.callback(1, &CallbackAction::KeepHelp(help_id).encode()).await;
    assert_eq!(h.last_text(1), "Your offer stays active.");

    let report = sweep_once(&h.app, warned_at + TimeDelta::hours(25)).await.unwrap();
    assert_eq!(report, SweepReport::default());
    assert!(!h.storage.all_helps().await[0].1);
}

#[tokio::test]
async fn stale_subscription_follows_the_same_cycle() {
    let mut h = Harness::new().await;
    h.storage.set_now(t0()).await;
    h.subscribe(2, "Food", "Київ", "Київ").await;

    let warned_at = t0() + TimeDelta::days(11);
    let report = sweep_once(&h.app, warned_at).await.unwrap();
    assert_eq!(report.warned_subscriptions, 1);
    let prompt = h.notifications.try_recv().expect("expiry prompt");
    assert_eq!(prompt.chat_id.0, 2);

    let report = sweep_once(&h.app, warned_at + TimeDelta::days(2)).await.unwrap();
    assert_eq!(report.removed_subscriptions, 1);
    assert!(h.storage.all_subscriptions().await[0].1);
}

#[tokio::test]
async fn dropped_prompt_is_not_recorded_as_a_warning() {
    let mut h = Harness::new().await;
    h.storage.set_now(t0()).await;
    h.post_help(1, "Food", "Київ", "Київ", "hot meals").await;
    h.drain_notifications().await;
    h.notifications.close();

    let first = t0() + TimeDelta::days(11);
    let report = sweep_once(&h.app, first).await.unwrap();
    assert_eq!(report, SweepReport::default());

    // No warning was recorded, so the grace period never started.
    let report = sweep_once(&h.app, first + TimeDelta::hours(25)).await.unwrap();
    assert_eq!(report, SweepReport::default());
    assert!(!h.storage.all_helps().await[0].1);
}

#[tokio::test]
async fn removal_waits_until_the_notice_can_be_queued() {
    let mut h = Harness::new().await;
    h.storage.set_now(t0()).await;
    h.subscribe(2, "Food", "Київ", "Київ").await;

    let warned_at = t0() + TimeDelta::days(11);
    let report = sweep_once(&h.app, warned_at).await.unwrap();
    assert_eq!(report.warned_subscriptions, 1);
    h.notifications.try_recv().expect("expiry prompt");
    h.notifications.close();

    let report = sweep_once(&h.app, warned_at + TimeDelta::hours(25)).await.unwrap();
    assert_eq!(report.removed_subscriptions, 0);
    assert!(!h.storage.all_subscriptions().await[0].1);
}
