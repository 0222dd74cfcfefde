//! Command handlers for the `chatstore` binary

use crate::core::message::Message;
use crate::store::MessageStore;
use crate::utils;
use anyhow::{bail, Result};

pub async fn handle_send(
    store: &MessageStore,
    conversation: &str,
    sender: String,
    text: String,
) -> Result<()> {
    let outcome = store.append(conversation, Message::now(sender, text)).await?;
    if !outcome.is_stored() {
        bail!("Message was not stored: store is not initialized");
    }
    utils::print_success(&format!("Message stored in '{}'", conversation));
    Ok(())
}

pub async fn handle_history(store: &MessageStore, conversation: &str, json: bool) -> Result<()> {
    let messages = store.get_messages(conversation).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    utils::print_header(conversation);
    if messages.is_empty() {
        utils::print_info("No messages yet");
    }
    for message in &messages {
        utils::print_message(message);
    }
    Ok(())
}

pub async fn handle_conversations(store: &MessageStore) -> Result<()> {
    utils::print_header("Conversations");
    for id in store.list_conversations().await? {
        println!("  {}", id);
    }
    Ok(())
}

/// Returns the generated conversation id
pub async fn handle_new(store: &MessageStore, sender: String, text: String) -> Result<String> {
    let id = store.start_conversation(Message::now(sender, text)).await?;
    utils::print_success(&format!("Started conversation '{}'", id));
    Ok(id)
}

pub async fn handle_watch(store: &MessageStore, conversation: &str) -> Result<()> {
    utils::print_header(&format!("Watching '{}' (Ctrl+C to exit)", conversation));

    let mut subscription = store.subscribe(conversation).await?;
    let mut shown = 0;

    loop {
        tokio::select! {
            snapshot = subscription.next() => {
                let Some(messages) = snapshot else { break };
                // Snapshots are full lists; only print what is new
                for message in messages.iter().skip(shown) {
                    utils::print_message(message);
                }
                shown = messages.len();
            }
            _ = tokio::signal::ctrl_c() => {
                subscription.unsubscribe();
                utils::print_info("Stopped watching");
                break;
            }
        }
    }
    Ok(())
}
