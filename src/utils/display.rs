use crate::core::message::Message;
use chrono::{DateTime, Local, Utc};
use colored::*;

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_cyan().bold());
    println!("{}", "=".repeat(text.len()).bright_cyan());
}

pub fn print_success(text: &str) {
    println!("{}", text.green());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red().bold());
}

pub fn print_info(text: &str) {
    println!("{}", text.blue());
}

pub fn print_message(message: &Message) {
    println!(
        "{} {}: {}",
        format_timestamp(message.timestamp).dimmed(),
        message.sender.yellow().bold(),
        message.text
    );
}

/// Local `HH:MM:SS` for a millisecond timestamp, or the raw number if out of range
pub fn format_timestamp(millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(millis) {
        Some(time) => time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
        None => millis.to_string(),
    }
}
