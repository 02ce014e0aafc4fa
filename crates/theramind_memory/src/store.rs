//! SQLite-backed conversation and memory-summary store.
//!
//! Owns the schema and the `ConversationStore` seam used by the reply
//! pipeline. Summaries are append-only: each summarization inserts a new
//! row, and retrieval reads the rows back in insert order. Deleting a
//! conversation cascades to its messages and summaries.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use std::path::Path;
use theramind_core::{ChatHistory, ConversationStore, Message, Role};
use uuid::Uuid;

/// Reserved title marking the active unsaved session, distinct from
/// user-named saved chats.
pub const CURRENT_SESSION_TITLE: &str = "__current__";

/// Conversation listing entry.
#[derive(Debug, Clone)]
pub struct ConversationMeta {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub created_at: i64,
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_url = format!("sqlite://{}?mode=rwc", db_path.as_ref().display());
        Self::connect(&db_url, 5).await
    }

    /// Private in-memory database, used by tests and ephemeral sessions.
    pub async fn in_memory() -> Result<Self> {
        // A single connection keeps every query on the same :memory: database.
        Self::connect("sqlite::memory:", 1).await
    }

    async fn connect(db_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON").execute(conn).await?;
                    Ok(())
                })
            })
            .connect(db_url)
            .await
            .context("Failed to connect to SQLite database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create conversations table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conv_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create messages table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_conv ON messages(conv_id)")
            .execute(&self.pool)
            .await
            .context("Failed to create messages index")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS memories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conv_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                summary TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create memories table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_memories_conv ON memories(conv_id)")
            .execute(&self.pool)
            .await
            .context("Failed to create memories index")?;

        Ok(())
    }

    // ========================================================================
    // Conversation CRUD
    // ========================================================================

    pub async fn create_conversation(&self, user_id: &str, title: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO conversations (id, user_id, title, created_at) VALUES (?, ?, ?, ?)")
            .bind(id.to_string())
            .bind(user_id)
            .bind(title)
            .bind(chrono::Utc::now().timestamp())
            .execute(&self.pool)
            .await
            .context("Failed to create conversation")?;
        Ok(id)
    }

    /// The active unsaved session for a user, creating it on first access.
    pub async fn current_conversation(&self, user_id: &str) -> Result<Uuid> {
        let row = sqlx::query("SELECT id FROM conversations WHERE user_id = ? AND title = ?")
            .bind(user_id)
            .bind(CURRENT_SESSION_TITLE)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to look up current conversation")?;
        if let Some(row) = row {
            let id: String = row.get("id");
            return Uuid::parse_str(&id).context("Invalid conversation id in database");
        }
        self.create_conversation(user_id, CURRENT_SESSION_TITLE).await
    }

    /// Conversations owned by a user, newest first. `user_id` scopes every
    /// read so cross-user access is impossible at this seam.
    pub async fn list_conversations(&self, user_id: &str) -> Result<Vec<ConversationMeta>> {
        let rows = sqlx::query(
            "SELECT id, user_id, title, created_at FROM conversations
             WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list conversations")?;

        rows.into_iter()
            .map(|row| {
                let id: String = row.get("id");
                Ok(ConversationMeta {
                    id: Uuid::parse_str(&id).context("Invalid conversation id in database")?,
                    user_id: row.get("user_id"),
                    title: row.get("title"),
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }

    pub async fn rename_conversation(&self, conv_id: Uuid, title: &str) -> Result<()> {
        sqlx::query("UPDATE conversations SET title = ? WHERE id = ?")
            .bind(title)
            .bind(conv_id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to rename conversation")?;
        Ok(())
    }

    /// Delete a conversation; messages and memory summaries go with it.
    pub async fn delete_conversation(&self, conv_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM conversations WHERE id = ?")
            .bind(conv_id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete conversation")?;
        Ok(())
    }

    /// Ensure a conversation row exists so message/summary FKs hold.
    async fn ensure_conversation(&self, conv_id: Uuid) -> Result<()> {
        sqlx::query(
            "INSERT INTO conversations (id, user_id, title, created_at)
             VALUES (?, '', ?, ?) ON CONFLICT(id) DO NOTHING",
        )
        .bind(conv_id.to_string())
        .bind(CURRENT_SESSION_TITLE)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .context("Failed to ensure conversation row")?;
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn load_history(&self, conv_id: Uuid) -> Result<ChatHistory> {
        let rows = sqlx::query(
            "SELECT role, content, timestamp FROM messages WHERE conv_id = ? ORDER BY id ASC",
        )
        .bind(conv_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to load history")?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let role: String = row.get("role");
                Message {
                    role: if role == "assistant" {
                        Role::Assistant
                    } else {
                        Role::User
                    },
                    content: row.get("content"),
                    timestamp: row.get("timestamp"),
                }
            })
            .collect())
    }

    async fn save_history(&self, conv_id: Uuid, history: &ChatHistory) -> Result<()> {
        self.ensure_conversation(conv_id).await?;
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        sqlx::query("DELETE FROM messages WHERE conv_id = ?")
            .bind(conv_id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to clear old history")?;
        for m in history {
            let role = match m.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            sqlx::query(
                "INSERT INTO messages (conv_id, role, content, timestamp) VALUES (?, ?, ?, ?)",
            )
            .bind(conv_id.to_string())
            .bind(role)
            .bind(&m.content)
            .bind(m.timestamp)
            .execute(&mut *tx)
            .await
            .context("Failed to insert message")?;
        }
        tx.commit().await.context("Failed to commit history")?;
        Ok(())
    }

    async fn load_summaries(&self, conv_id: Uuid) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT summary FROM memories WHERE conv_id = ? ORDER BY id ASC")
            .bind(conv_id.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to load summaries")?;
        Ok(rows.into_iter().map(|row| row.get("summary")).collect())
    }

    async fn append_summary(&self, conv_id: Uuid, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.ensure_conversation(conv_id).await?;
        sqlx::query("INSERT INTO memories (conv_id, summary, updated_at) VALUES (?, ?, ?)")
            .bind(conv_id.to_string())
            .bind(text)
            .bind(chrono::Utc::now().timestamp())
            .execute(&self.pool)
            .await
            .context("Failed to append summary")?;
        Ok(())
    }
}
