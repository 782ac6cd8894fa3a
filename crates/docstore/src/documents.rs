//! Container operations: point read, upsert, delete, partition queries.

use sqlx::SqlitePool;
use tracing::warn;

use crate::error::Result;
use crate::models::{ChatSession, Document, UserProfile};

/// Outcome of a point read.
///
/// Kept separate from [`crate::StoreError`] so callers can distinguish a
/// genuinely absent document from a transient store failure, even when both
/// currently fall back to the same behavior.
#[derive(Debug, Clone)]
pub enum ReadOutcome {
    /// The document exists and decoded cleanly.
    Found(Document),
    /// No document with this (partition, id), or the stored body was
    /// malformed and is treated as absent.
    NotFound,
}

/// Point read by (partition key, id).
///
/// A stored body that fails to decode is logged and reported as `NotFound`
/// rather than propagated; only store failures surface as errors.
pub async fn read_document(pool: &SqlitePool, user_id: &str, id: &str) -> Result<ReadOutcome> {
    let row: Option<(String,)> = sqlx::query_as(
        r#"
        SELECT body
        FROM documents
        WHERE user_id = ? AND id = ?
        "#,
    )
    .bind(user_id)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some((body,)) = row else {
        return Ok(ReadOutcome::NotFound);
    };

    match serde_json::from_str::<Document>(&body) {
        Ok(document) => Ok(ReadOutcome::Found(document)),
        Err(err) => {
            warn!(user_id, id, error = %err, "Malformed stored document, treating as absent");
            Ok(ReadOutcome::NotFound)
        }
    }
}

/// Upsert a full document (full-body replace, last writer wins).
pub async fn upsert_document(pool: &SqlitePool, document: &Document) -> Result<()> {
    let body = serde_json::to_string(document)?;

    sqlx::query(
        r#"
        INSERT INTO documents (user_id, id, doc_type, body, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(user_id, id) DO UPDATE SET
            doc_type = excluded.doc_type,
            body = excluded.body,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(document.user_id())
    .bind(document.id())
    .bind(document.doc_type())
    .bind(&body)
    .bind(document.sort_timestamp())
    .execute(pool)
    .await?;

    Ok(())
}

/// Point delete. Returns whether a document was removed.
pub async fn delete_document(pool: &SqlitePool, user_id: &str, id: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM documents
        WHERE user_id = ? AND id = ?
        "#,
    )
    .bind(user_id)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// List a user's chat sessions, most recently updated first.
///
/// Rows that fail to decode are skipped with a warning.
pub async fn list_chats(pool: &SqlitePool, user_id: &str) -> Result<Vec<ChatSession>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT body
        FROM documents
        WHERE user_id = ? AND doc_type = 'chat'
        ORDER BY updated_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut chats = Vec::with_capacity(rows.len());
    for (body,) in rows {
        match serde_json::from_str::<Document>(&body) {
            Ok(Document::Chat(chat)) => chats.push(chat),
            Ok(other) => {
                warn!(user_id, id = other.id(), "Non-chat document under chat type, skipping")
            }
            Err(err) => warn!(user_id, error = %err, "Malformed chat document, skipping"),
        }
    }

    Ok(chats)
}

/// Delete all of a user's chat sessions. Returns the number removed.
pub async fn delete_all_chats(pool: &SqlitePool, user_id: &str) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM documents
        WHERE user_id = ? AND doc_type = 'chat'
        "#,
    )
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Cascade delete of every document in the user's partition (profile and
/// chats). Returns the number removed.
pub async fn delete_all_for_user(pool: &SqlitePool, user_id: &str) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM documents
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Create the profile document if none exists yet.
///
/// Point read then conditional insert keyed by the deterministic profile id;
/// the insert ignores conflicts so a concurrent second login cannot create a
/// duplicate. Returns whether a profile was created.
pub async fn create_profile_if_absent(pool: &SqlitePool, profile: &UserProfile) -> Result<bool> {
    if let ReadOutcome::Found(_) = read_document(pool, &profile.user_id, &profile.id).await? {
        return Ok(false);
    }

    let document = Document::Profile(profile.clone());
    let body = serde_json::to_string(&document)?;

    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO documents (user_id, id, doc_type, body, updated_at)
        VALUES (?, ?, 'profile', ?, ?)
        "#,
    )
    .bind(&profile.user_id)
    .bind(&profile.id)
    .bind(&body)
    .bind(document.sort_timestamp())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
