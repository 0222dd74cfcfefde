use anyhow::Result;
use chatstore::cli::handlers::*;
use chatstore::cli::{Cli, Commands};
use chatstore::{utils, MessageStore, Settings, StorageContext};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::new()?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let context = if cli.memory {
        StorageContext::Memory
    } else if let Some(path) = cli.db.clone() {
        StorageContext::Sqlite(path)
    } else {
        StorageContext::from_settings(&settings)?
    };

    let store = MessageStore::new(&settings);
    store.init(&context).await?;

    let result = match cli.command {
        Commands::Send { conversation, text, sender } => {
            handle_send(&store, &conversation, sender, text).await
        }
        Commands::History { conversation, json } => handle_history(&store, &conversation, json).await,
        Commands::Conversations => handle_conversations(&store).await,
        Commands::New { text, sender } => handle_new(&store, sender, text).await.map(|_| ()),
        Commands::Watch { conversation } => handle_watch(&store, &conversation).await,
    };

    if let Err(e) = &result {
        utils::print_error(&format!("Error: {:#}", e));
    }
    result
}
