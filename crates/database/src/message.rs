//! Conversation transcript persistence.

use brain_core::{Message, Role, StoredMessage};
use sqlx::{SqliteConnection, SqlitePool};

use crate::models::MessageRow;
use crate::Result;

/// Append a message and return its id.
pub async fn append(pool: &SqlitePool, contact_id: i64, role: Role, content: &str) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO messages (contact_id, role, content)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(contact_id)
    .bind(role.as_str())
    .bind(content)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// The most recent `limit` messages, oldest first.
pub async fn recent(pool: &SqlitePool, contact_id: i64, limit: usize) -> Result<Vec<Message>> {
    let rows = sqlx::query_as::<_, MessageRow>(
        r#"
        SELECT id, contact_id, role, content, created_at
        FROM (
            SELECT id, contact_id, role, content, created_at
            FROM messages
            WHERE contact_id = ?
            ORDER BY id DESC
            LIMIT ?
        )
        ORDER BY id ASC
        "#,
    )
    .bind(contact_id)
    .bind(i64::try_from(limit).unwrap_or(i64::MAX))
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| row.into_stored().map(|stored| stored.message))
        .collect()
}

/// Every message of a contact, oldest first.
pub async fn list(pool: &SqlitePool, contact_id: i64) -> Result<Vec<StoredMessage>> {
    let rows = sqlx::query_as::<_, MessageRow>(
        r#"
        SELECT id, contact_id, role, content, created_at
        FROM messages
        WHERE contact_id = ?
        ORDER BY id ASC
        "#,
    )
    .bind(contact_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(MessageRow::into_stored).collect()
}

/// Number of stored messages for a contact.
pub async fn count(pool: &SqlitePool, contact_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM messages
        WHERE contact_id = ?
        "#,
    )
    .bind(contact_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Delete a contact's messages up to and including `last_id`.
pub async fn delete_up_to(conn: &mut SqliteConnection, contact_id: i64, last_id: i64) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM messages
        WHERE contact_id = ? AND id <= ?
        "#,
    )
    .bind(contact_id)
    .bind(last_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact;
    use crate::test_support::test_db;

    #[tokio::test]
    async fn test_recent_is_oldest_first() {
        let db = test_db().await;
        let c = contact::find_or_create(db.pool(), 1, "+5215512345678").await.unwrap();

        for i in 0..6 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            append(db.pool(), c.id, role, &format!("m{}", i)).await.unwrap();
        }

        let recent = recent(db.pool(), c.id, 3).await.unwrap();
        let contents: Vec<_> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m4", "m5"]);
        assert_eq!(recent[0].role, Role::Assistant);
        assert!(recent[0].created_at.is_some());
        assert_eq!(count(db.pool(), c.id).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_delete_up_to_keeps_tail() {
        let db = test_db().await;
        let c = contact::find_or_create(db.pool(), 1, "+5215512345678").await.unwrap();

        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(append(db.pool(), c.id, Role::User, &format!("m{}", i)).await.unwrap());
        }

        let mut conn = db.pool().acquire().await.unwrap();
        let deleted = delete_up_to(&mut conn, c.id, ids[2]).await.unwrap();
        drop(conn);

        assert_eq!(deleted, 3);
        let remaining = list(db.pool(), c.id).await.unwrap();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].message.content, "m3");
    }
}
