//! Integration tests for the message store
//!
//! These run against both backends through the public API only

use chatstore::{AppendOutcome, Message, MessageStore, Settings, StorageContext};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio::time::timeout;

async fn open_store(context: StorageContext) -> MessageStore {
    let store = MessageStore::new(&Settings::default());
    store.init(&context).await.unwrap();
    store
}

fn texts(messages: &[Message]) -> Vec<&str> {
    messages.iter().map(|m| m.text.as_str()).collect()
}

#[tokio::test]
async fn test_messages_ordered_by_timestamp_then_insertion() {
    let dir = tempdir().unwrap();
    let contexts = [
        StorageContext::Memory,
        StorageContext::Sqlite(dir.path().join("order.db")),
    ];

    for context in contexts {
        let store = open_store(context).await;
        store.append("A", Message::new("me", "c", 300)).await.unwrap();
        store.append("A", Message::new("me", "a1", 100)).await.unwrap();
        store.append("A", Message::new("you", "b", 200)).await.unwrap();
        store.append("A", Message::new("me", "a2", 100)).await.unwrap();

        let messages = store.get_messages("A").await.unwrap();
        assert_eq!(texts(&messages), vec!["a1", "a2", "b", "c"]);
    }
}

#[tokio::test]
async fn test_interleaved_appends_keep_conversations_separate() {
    let store = Arc::new(open_store(StorageContext::Memory).await);

    let mut handles = Vec::new();
    for i in 0..10 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.append("A", Message::new("me", format!("a{}", i), i)).await.unwrap();
            if i < 4 {
                store.append("B", Message::new("me", format!("b{}", i), i)).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.get_messages("A").await.unwrap().len(), 10);
    assert_eq!(store.get_messages("B").await.unwrap().len(), 4);
    assert!(store.get_messages("unknown").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_conversation_index_replaces_default_seed() {
    let store = open_store(StorageContext::Memory).await;
    assert_eq!(
        store.list_conversations().await.unwrap(),
        vec!["Alice".to_string(), "Bob".to_string()]
    );

    store.append("C", Message::new("me", "hi", 1)).await.unwrap();
    assert_eq!(store.list_conversations().await.unwrap(), vec!["C".to_string()]);
}

#[tokio::test]
async fn test_configured_default_seed() {
    let mut settings = Settings::default();
    settings.conversations.default_seed = vec!["General".to_string()];
    let store = MessageStore::new(&settings);

    assert_eq!(store.list_conversations().await.unwrap(), vec!["General".to_string()]);
}

#[tokio::test]
async fn test_subscription_sees_empty_then_new_message() {
    let store = open_store(StorageContext::Memory).await;
    let mut sub = store.subscribe("X").await.unwrap();

    assert_eq!(sub.next().await.unwrap(), Vec::<Message>::new());

    let outcome = store.append("X", Message::new("me", "hi", 100)).await.unwrap();
    assert_eq!(outcome, AppendOutcome::Stored);

    let snapshot = timeout(Duration::from_secs(1), sub.next()).await.unwrap().unwrap();
    assert_eq!(snapshot, vec![Message::new("me", "hi", 100)]);
}

#[tokio::test]
async fn test_independent_subscribers_see_every_append() {
    let store = open_store(StorageContext::Memory).await;
    let mut first = store.subscribe("X").await.unwrap();
    let mut second = store.subscribe("X").await.unwrap();
    first.next().await;
    second.next().await;

    for i in 1..=3 {
        store.append("X", Message::new("me", format!("m{}", i), i)).await.unwrap();

        let a = first.next().await.unwrap();
        let b = second.next().await.unwrap();
        assert_eq!(a.len(), i as usize);
        assert_eq!(a, b);
    }
}

#[tokio::test]
async fn test_new_subscription_starts_with_current_state() {
    let store = open_store(StorageContext::Memory).await;
    store.append("X", Message::new("me", "one", 1)).await.unwrap();
    store.append("X", Message::new("me", "two", 2)).await.unwrap();

    let mut first = store.subscribe("X").await.unwrap();
    first.unsubscribe();

    let mut restarted = store.subscribe("X").await.unwrap();
    assert_eq!(texts(&restarted.next().await.unwrap()), vec!["one", "two"]);
}

#[tokio::test]
async fn test_no_snapshots_after_unsubscribe() {
    let store = open_store(StorageContext::Memory).await;
    let mut sub = store.subscribe("X").await.unwrap();
    sub.next().await;

    store.append("X", Message::new("me", "queued", 1)).await.unwrap();
    sub.unsubscribe();
    store.append("X", Message::new("me", "after", 2)).await.unwrap();

    assert!(sub.try_next().is_none());
    assert!(timeout(Duration::from_millis(50), sub.next()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_slow_subscriber_does_not_block_appends() {
    let mut settings = Settings::default();
    settings.subscriptions.channel_buffer_size = 2;
    let store = MessageStore::new(&settings);
    store.init(&StorageContext::Memory).await.unwrap();

    let mut sub = store.subscribe("X").await.unwrap();
    sub.next().await;

    let appends = async {
        for i in 0..50 {
            store.append("X", Message::new("me", "spam", i)).await.unwrap();
        }
    };
    timeout(Duration::from_secs(5), appends).await.unwrap();

    let mut latest = None;
    while let Some(snapshot) = sub.try_next() {
        latest = Some(snapshot);
    }
    assert_eq!(latest.map(|s| s.len()), Some(50));
}

#[tokio::test]
async fn test_conversation_subscription() {
    let store = open_store(StorageContext::Memory).await;
    let mut sub = store.subscribe_conversations().await.unwrap();

    assert_eq!(sub.next().await.unwrap(), vec!["Alice".to_string(), "Bob".to_string()]);

    let id = store.start_conversation(Message::now("me", "Hi")).await.unwrap();
    assert_eq!(sub.next().await.unwrap(), vec![id]);
}

#[tokio::test]
async fn test_sqlite_store_survives_restart() {
    let dir = tempdir().unwrap();
    let context = StorageContext::Sqlite(dir.path().join("chat.db"));

    {
        let store = open_store(context.clone()).await;
        store.append("Alice", Message::new("Alice", "hello", 10)).await.unwrap();
        store.append("Bob", Message::new("me", "yo", 5)).await.unwrap();
        store.append("Alice", Message::new("me", "hi back", 10)).await.unwrap();
    }

    let store = open_store(context).await;
    assert_eq!(
        texts(&store.get_messages("Alice").await.unwrap()),
        vec!["hello", "hi back"]
    );
    assert_eq!(
        store.list_conversations().await.unwrap(),
        vec!["Alice".to_string(), "Bob".to_string()]
    );

    // Known ids are restored, so an old conversation does not count as new
    let mut sub = store.subscribe_conversations().await.unwrap();
    sub.next().await;
    store.append("Bob", Message::new("me", "again", 20)).await.unwrap();
    assert!(sub.try_next().is_none());
}

#[tokio::test]
async fn test_calls_before_init_degrade() {
    let store = MessageStore::new(&Settings::default());

    let mut sub = store.subscribe("X").await.unwrap();
    assert_eq!(sub.next().await.unwrap(), Vec::<Message>::new());

    let outcome = store.append("X", Message::new("me", "hi", 1)).await.unwrap();
    assert_eq!(outcome, AppendOutcome::Declined);
    assert!(sub.try_next().is_none());

    // Binding later brings the existing subscription to life
    store.init(&StorageContext::Memory).await.unwrap();
    store.append("X", Message::new("me", "hi", 1)).await.unwrap();
    assert_eq!(sub.next().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_early_subscribers_catch_up_when_store_binds_to_existing_data() {
    let dir = tempdir().unwrap();
    let context = StorageContext::Sqlite(dir.path().join("chat.db"));

    {
        let store = open_store(context.clone()).await;
        store.append("Real", Message::new("me", "persisted", 1)).await.unwrap();
    }

    let store = MessageStore::new(&Settings::default());
    let mut conversations = store.subscribe_conversations().await.unwrap();
    let mut messages = store.subscribe("Real").await.unwrap();
    assert_eq!(
        conversations.next().await.unwrap(),
        vec!["Alice".to_string(), "Bob".to_string()]
    );
    assert!(messages.next().await.unwrap().is_empty());

    store.init(&context).await.unwrap();

    let ids = timeout(Duration::from_secs(1), conversations.next()).await.unwrap().unwrap();
    assert_eq!(ids, store.list_conversations().await.unwrap());
    assert_eq!(ids, vec!["Real".to_string()]);
    assert_eq!(
        texts(&timeout(Duration::from_secs(1), messages.next()).await.unwrap().unwrap()),
        vec!["persisted"]
    );

    // Appending to an already known id still reaches the message subscriber
    store.append("Real", Message::new("me", "fresh", 2)).await.unwrap();
    assert_eq!(
        texts(&messages.next().await.unwrap()),
        vec!["persisted", "fresh"]
    );
    assert!(conversations.try_next().is_none());
}
