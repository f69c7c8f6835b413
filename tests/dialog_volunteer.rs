mod common;

use common::Harness;
use uasocial_bot::database::memory::seed;

const LVIV: &str = "Львів, Львівська";

#[tokio::test]
async fn volunteer_flow_creates_help_and_alerts_subscriber() {
    let mut h = Harness::new().await;
    h.subscribe(2, "Food", "Львів", LVIV).await;
    assert!(h.last_text(2).contains("Subscription created"));

    h.post_help(1, "Food", "Львів", LVIV, "need blankets").await;
    assert!(h.last_text(1).contains("Your offer has been saved"));

    let helps = h.storage.all_helps().await;
    assert_eq!(helps.len(), 1);
    let (help, deleted) = &helps[0];
    assert!(!deleted);
    assert_eq!(help.category_ids, vec![seed::FOOD]);
    assert_eq!(help.locality_id, seed::LVIV_CITY);
    assert_eq!(help.description, "need blankets");

    let notes = h.drain_notifications().await;
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].chat_id.0, 2);
    assert!(notes[0].message.text.contains("need blankets"));
    assert!(h.app.sessions.get(uasocial_bot::transport::ChatId(1)).await.is_none());
}

#[tokio::test]
async fn toggling_shows_checkbox_and_next() {
    let h = Harness::new().await;
    h.text(1, "/start").await;
    h.tap(1, "I want to help").await;
    assert!(!h.reply_labels(1).iter().any(|l| l.contains("Next")));

    h.tap(1, "Medicine").await;
    let labels = h.reply_labels(1);
    assert!(labels.contains(&"✅ Medicine".to_string()));
    assert!(labels.iter().any(|l| l.contains("Next")));

    // Second tap unselects; "next" disappears again.
    h.tap(1, "Medicine").await;
    let labels = h.reply_labels(1);
    assert!(labels.contains(&"Medicine".to_string()));
    assert!(!labels.iter().any(|l| l.contains("Next")));
}

#[tokio::test]
async fn quota_rejects_before_categories_are_shown() {
    let h = Harness::new().await;
    h.post_help(1, "Food", "Львів", LVIV, "soup").await;
    h.post_help(1, "Housing", "Київ", "Київ", "a room").await;
    assert_eq!(h.storage.all_helps().await.len(), 2);

    h.transport.clear();
    h.text(1, "/start").await;
    h.tap(1, "I want to help").await;
    assert!(h.last_text(1).contains("at most 2 active offers"));
    assert!(!h.texts(1).iter().any(|t| t.contains("Select the categories")));
    assert!(h.app.sessions.get(uasocial_bot::transport::ChatId(1)).await.is_none());
}

#[tokio::test]
async fn start_mid_flow_discards_selection() {
    let h = Harness::new().await;
    h.text(1, "/start").await;
    h.tap(1, "I want to help").await;
    h.tap(1, "Food").await;
    h.tap(1, "Clothing").await;

    h.text(1, "/start").await;
    h.tap(1, "I want to help").await;
    let labels = h.reply_labels(1);
    assert!(labels.iter().all(|l| !l.starts_with('✅')), "{labels:?}");
}

#[tokio::test]
async fn unknown_locality_keeps_asking() {
    let h = Harness::new().await;
    h.text(1, "/start").await;
    h.tap(1, "I want to help").await;
    h.tap(1, "Transport").await;
    h.tap(1, "Next").await;
    h.text(1, "Атлантида").await;
    assert!(h.last_text(1).contains("Nothing found"));

    // A near miss still finds the village.
    h.text(1, "Сокільникі").await;
    assert!(h.reply_labels(1).iter().any(|l| l.starts_with("Сокільники")));
}

#[tokio::test]
async fn unrecognized_button_text_reprompts() {
    let h = Harness::new().await;
    h.text(1, "/start").await;
    h.text(1, "hello?").await;
    assert!(h.last_text(1).contains("choose one of the options"));
    // Still at the role request.
    h.tap(1, "I want to help").await;
    assert!(h.last_text(1).contains("Select the categories"));
}

#[tokio::test]
async fn empty_description_is_rejected() {
    let h = Harness::new().await;
    h.text(1, "/start").await;
    h.tap(1, "I want to help").await;
    h.tap(1, "Food").await;
    h.tap(1, "Next").await;
    h.text(1, "Київ").await;
    h.tap(1, "Київ").await;
    h.text(1, "   ").await;
    assert!(h.last_text(1).contains("cannot be empty"));
    assert!(h.storage.all_helps().await.is_empty());
}
