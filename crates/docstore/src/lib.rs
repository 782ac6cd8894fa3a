//! Document-container persistence layer for Civic Knit.
//!
//! One container holds heterogeneous JSON documents (user profiles and chat
//! sessions) partitioned by owning user id and distinguished by a `type`
//! discriminator, mirroring the managed document-store layout. Operations
//! are the small set the application consumes: point read, point upsert,
//! point delete, and partition-scoped queries.
//!
//! # Example
//!
//! ```no_run
//! use docstore::{documents, ChatSession, Document, Store};
//!
//! #[tokio::main]
//! async fn main() -> docstore::Result<()> {
//!     let store = Store::connect("sqlite:civic-knit.db?mode=rwc").await?;
//!     store.migrate().await?;
//!
//!     let session = ChatSession::new("chat-1", "user-1", "Hola");
//!     documents::upsert_document(store.pool(), &Document::Chat(session)).await?;
//!     Ok(())
//! }
//! ```

pub mod documents;
pub mod models;

mod error;

pub use documents::ReadOutcome;
pub use error::{Result, StoreError};
pub use models::{
    chat_title, now_rfc3339, profile_doc_id, ChatMessage, ChatSession, Document, PersonalInfo,
    Preferences, TopicSubscription, UserProfile,
};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Store connection wrapper.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Default pool size for store connections.
    const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to the backing SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist, or
    /// `sqlite::memory:` for tests.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect with an explicit pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Run store migrations.
    ///
    /// This should be called once after connecting to ensure the schema is
    /// up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running store migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let store = Store::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        store.migrate().await.unwrap();
        store.migrate().await.unwrap();
    }
}
