//! Conversation summary persistence.

use brain_core::ConversationSummary;
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::DatabaseError;
use crate::models::{format_datetime, parse_datetime, ConversationSummaryRow};
use crate::Result;

/// Record a compaction summary.
pub async fn insert(conn: &mut SqliteConnection, summary: &ConversationSummary) -> Result<i64> {
    let key_facts = serde_json::to_string(&summary.key_facts)
        .map_err(|e| DatabaseError::InvalidData(format!("summary key facts: {}", e)))?;

    let result = sqlx::query(
        r#"
        INSERT INTO conversation_summaries (contact_id, summary, key_facts, message_count, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(summary.contact_id)
    .bind(&summary.summary)
    .bind(key_facts)
    .bind(i64::try_from(summary.message_count).unwrap_or(i64::MAX))
    .bind(format_datetime(summary.created_at))
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// List a contact's summaries, oldest first.
pub async fn list_for_contact(pool: &SqlitePool, contact_id: i64) -> Result<Vec<ConversationSummary>> {
    let rows = sqlx::query_as::<_, ConversationSummaryRow>(
        r#"
        SELECT id, contact_id, summary, key_facts, message_count, created_at
        FROM conversation_summaries
        WHERE contact_id = ?
        ORDER BY id ASC
        "#,
    )
    .bind(contact_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let key_facts: Vec<String> = serde_json::from_str(&row.key_facts).map_err(|e| {
                DatabaseError::InvalidData(format!("summary {} key facts: {}", row.id, e))
            })?;
            Ok(ConversationSummary {
                contact_id: row.contact_id,
                summary: row.summary,
                key_facts,
                message_count: usize::try_from(row.message_count).unwrap_or_default(),
                created_at: parse_datetime(&row.created_at)?,
            })
        })
        .collect()
}
