use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chatstore")]
#[command(author, version, about = "Local chat message store", long_about = None)]
pub struct Cli {
    /// SQLite database file (overrides storage.path)
    #[arg(long, global = true, conflicts_with = "memory")]
    pub db: Option<PathBuf>,

    /// Use an ephemeral in-memory store
    #[arg(long, global = true)]
    pub memory: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Append a message to a conversation
    Send {
        conversation: String,
        text: String,

        #[arg(short = 's', long, default_value = "me")]
        sender: String,
    },

    /// Print every message of a conversation
    History {
        conversation: String,

        /// Emit JSON instead of formatted lines
        #[arg(long)]
        json: bool,
    },

    /// List known conversations
    Conversations,

    /// Start a new conversation with a generated id
    New {
        #[arg(short = 't', long, default_value = "Hi")]
        text: String,

        #[arg(short = 's', long, default_value = "me")]
        sender: String,
    },

    /// Follow a conversation and print each snapshot as it changes
    Watch { conversation: String },
}
