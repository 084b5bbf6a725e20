//! Contact persistence.

use brain_core::{append_note, merge_tags, Contact, ContactKind};
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::DatabaseError;
use crate::models::ContactRow;
use crate::validation::{validate_name, validate_phone};
use crate::Result;

/// Resolve the contact for a phone number, creating a lead if none exists.
///
/// `phone` must already be canonical.
pub async fn find_or_create(pool: &SqlitePool, tenant_id: i64, phone: &str) -> Result<Contact> {
    validate_phone(phone)?;

    let result = sqlx::query(
        r#"
        INSERT INTO contacts (tenant_id, phone)
        VALUES (?, ?)
        ON CONFLICT(tenant_id, phone) DO NOTHING
        "#,
    )
    .bind(tenant_id)
    .bind(phone)
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        tracing::info!("Created lead contact for tenant {}", tenant_id);
    }

    let row = sqlx::query_as::<_, ContactRow>(
        r#"
        SELECT id, tenant_id, kind, phone, name, notes, tags, created_at, updated_at
        FROM contacts
        WHERE tenant_id = ? AND phone = ?
        "#,
    )
    .bind(tenant_id)
    .bind(phone)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("contact", phone))?;

    row.into_contact()
}

/// Get a contact by id.
pub async fn get_contact(pool: &SqlitePool, contact_id: i64) -> Result<Contact> {
    let mut conn = pool.acquire().await?;
    fetch(&mut conn, contact_id).await
}

async fn fetch(conn: &mut SqliteConnection, contact_id: i64) -> Result<Contact> {
    let row = sqlx::query_as::<_, ContactRow>(
        r#"
        SELECT id, tenant_id, kind, phone, name, notes, tags, created_at, updated_at
        FROM contacts
        WHERE id = ?
        "#,
    )
    .bind(contact_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DatabaseError::not_found("contact", contact_id))?;

    row.into_contact()
}

/// Set a contact's display name.
pub async fn update_name(pool: &SqlitePool, contact_id: i64, name: &str) -> Result<()> {
    let name = validate_name(name)?;

    let result = sqlx::query(
        r#"
        UPDATE contacts
        SET name = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(name)
    .bind(contact_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("contact", contact_id));
    }
    Ok(())
}

/// Set a contact's variant. Conversion itself happens outside the agent.
pub async fn set_kind(pool: &SqlitePool, contact_id: i64, kind: ContactKind) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE contacts
        SET kind = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(kind.as_str())
    .bind(contact_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Append a note and merge tags into the contact's durable memory.
///
/// Runs on a connection so it can join a caller's transaction.
pub async fn append_memory(
    conn: &mut SqliteConnection,
    contact_id: i64,
    note: &str,
    tags: &[String],
) -> Result<()> {
    let contact = fetch(conn, contact_id).await?;

    let notes = append_note(contact.notes.as_deref(), note);
    let tags = merge_tags(&contact.tags, tags);
    let tags_json = serde_json::to_string(&tags)
        .map_err(|e| DatabaseError::InvalidData(format!("contact {} tags: {}", contact_id, e)))?;

    sqlx::query(
        r#"
        UPDATE contacts
        SET notes = ?, tags = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(notes)
    .bind(tags_json)
    .bind(contact_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
