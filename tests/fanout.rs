mod common;

use common::Harness;

#[tokio::test]
async fn subscriber_matching_twice_hears_once() {
    let mut h = Harness::new().await;
    h.subscribe(2, "Food", "Київ", "Київ").await;
    h.subscribe(2, "Medicine", "Київ", "Київ").await;
    assert_eq!(h.storage.all_subscriptions().await.len(), 2);

    h.text(1, "/start").await;
    h.tap(1, "I want to help").await;
    h.tap(1, "Food").await;
    h.tap(1, "Medicine").await;
    h.tap(1, "Next").await;
    h.text(1, "Київ").await;
    h.tap(1, "Київ").await;
    h.text(1, "soup and bandages").await;
    assert!(h.last_text(1).contains("Your offer has been saved"));

    let notes = h.drain_notifications().await;
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].chat_id.0, 2);
    assert!(notes[0].message.text.contains("soup and bandages"));
}

#[tokio::test]
async fn creator_is_not_alerted_about_own_help() {
    let mut h = Harness::new().await;
    h.subscribe(1, "Food", "Київ", "Київ").await;
    h.subscribe(3, "Food", "Київ", "Київ").await;

    h.post_help(1, "Food", "Київ", "Київ", "hot meals").await;
    assert!(h.last_text(1).contains("Your offer has been saved"));

    let notes = h.drain_notifications().await;
    let chats: Vec<i64> = notes.iter().map(|n| n.chat_id.0).collect();
    assert_eq!(chats, vec![3]);
}
