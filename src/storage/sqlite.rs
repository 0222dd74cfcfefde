//! SQLite Message Backend
//!
//! Information Hiding:
//! - Table schema and SQL hidden from users
//! - Blocking rusqlite calls moved off the async runtime
//! - Separate writer and reader connections hidden behind async interface

use super::MessageBackend;
use crate::core::message::{Message, StoredMessage};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        conversation_id TEXT NOT NULL,
        sender TEXT NOT NULL,
        text TEXT NOT NULL,
        timestamp INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_messages_conversation
        ON messages (conversation_id, timestamp, id);
";

/// Durable message table in a single SQLite file.
/// The AUTOINCREMENT id is the insertion sequence used to break timestamp ties.
///
/// SQLite admits one writer at a time, so inserts share the writer connection
/// and are serialized for the duration of one fsync'd commit. Reads go through
/// their own connection and, under WAL, never wait for a commit in progress.
pub struct SqliteBackend {
    path: PathBuf,
    writer: Arc<Mutex<Connection>>,
    reader: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    pub async fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create database directory")?;
        }

        let db_path = path.clone();
        let (writer, reader) = tokio::task::spawn_blocking(move || {
            let writer = open_writer(&db_path)?;
            let reader = open_reader(&db_path)?;
            Ok::<_, anyhow::Error>((writer, reader))
        })
        .await
        .context("SQLite open task failed to complete")??;

        tracing::info!("[SqliteBackend] Opened message database at {:?}", path);
        Ok(Self {
            path,
            writer: Arc::new(Mutex::new(writer)),
            reader: Arc::new(Mutex::new(reader)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn with_writer<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        with_conn(&self.writer, f).await
    }

    async fn with_reader<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        with_conn(&self.reader, f).await
    }
}

async fn with_conn<T, F>(conn: &Arc<Mutex<Connection>>, f: F) -> Result<T>
where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let conn = Arc::clone(conn);
    tokio::task::spawn_blocking(move || {
        let conn = conn
            .lock()
            .map_err(|_| anyhow!("SQLite connection lock poisoned"))?;
        f(&conn)
    })
    .await
    .context("SQLite task failed to complete")?
}

fn open_writer(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database file: {:?}", path))?;

    let mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        .context("Failed to enable WAL journal")?;
    conn.pragma_update(None, "synchronous", "FULL")
        .context("Failed to set synchronous mode")?;
    conn.execute_batch(SCHEMA)
        .context("Failed to create messages table")?;

    tracing::debug!("[SqliteBackend] Journal mode is '{}'", mode);
    Ok(conn)
}

fn open_reader(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database file for reading: {:?}", path))?;
    conn.pragma_update(None, "query_only", true)
        .context("Failed to make reader connection query-only")?;
    Ok(conn)
}

#[async_trait]
impl MessageBackend for SqliteBackend {
    async fn insert(&self, row: &StoredMessage) -> Result<()> {
        let row = row.clone();
        let id = self
            .with_writer(move |conn| {
                conn.execute(
                    "INSERT INTO messages (conversation_id, sender, text, timestamp)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        row.conversation_id,
                        row.message.sender,
                        row.message.text,
                        row.message.timestamp
                    ],
                )
                .context("Failed to insert message")?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        tracing::debug!("[SqliteBackend] Inserted message row {}", id);
        Ok(())
    }

    async fn query_by_conversation(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let id = conversation_id.to_string();
        let messages = self
            .with_reader(move |conn| {
                let mut stmt = conn
                    .prepare_cached(
                        "SELECT sender, text, timestamp FROM messages
                         WHERE conversation_id = ?1
                         ORDER BY timestamp ASC, id ASC",
                    )
                    .context("Failed to prepare message query")?;

                let rows = stmt
                    .query_map(params![id], |row| {
                        Ok(Message {
                            sender: row.get(0)?,
                            text: row.get(1)?,
                            timestamp: row.get(2)?,
                        })
                    })
                    .context("Failed to query messages")?;

                rows.collect::<rusqlite::Result<Vec<_>>>()
                    .context("Failed to read message row")
            })
            .await?;

        tracing::debug!(
            "[SqliteBackend] Loaded {} messages for '{}'",
            messages.len(),
            conversation_id
        );
        Ok(messages)
    }

    async fn query_distinct_ids(&self) -> Result<Vec<String>> {
        let ids = self
            .with_reader(|conn| {
                let mut stmt = conn
                    .prepare_cached(
                        "SELECT conversation_id FROM messages
                         GROUP BY conversation_id
                         ORDER BY MIN(id) ASC",
                    )
                    .context("Failed to prepare conversation query")?;

                let rows = stmt
                    .query_map([], |row| row.get::<_, String>(0))
                    .context("Failed to query conversations")?;

                rows.collect::<rusqlite::Result<Vec<_>>>()
                    .context("Failed to read conversation row")
            })
            .await?;

        tracing::debug!("[SqliteBackend] Listed {} conversations", ids.len());
        Ok(ids)
    }
}
