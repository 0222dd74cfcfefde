use ::config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub storage: StorageConfig,
    pub subscriptions: SubscriptionConfig,
    pub conversations: ConversationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// "sqlite" or "memory"
    pub backend: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// Snapshots queued per subscriber before it starts lagging
    pub channel_buffer_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Shown by the conversation index while no message exists
    pub default_seed: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            path: "./chatstore.db".to_string(),
        }
    }
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 32,
        }
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            default_seed: vec!["Alice".to_string(), "Bob".to_string()],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config_env = env::var("CONFIG_ENV").unwrap_or_else(|_| "default".to_string());

        let config = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::with_name(&format!("config/{}", config_env)).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("conversations.default_seed")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
