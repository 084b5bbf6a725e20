//! Appointment persistence.
//!
//! Inserts and reschedules re-check calendar overlap inside a transaction,
//! so two writers racing for the same slot cannot both succeed.

use brain_core::{Appointment, CancellationFact, NewAppointment};
use chrono::NaiveDateTime;
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use crate::error::DatabaseError;
use crate::models::{format_datetime, parse_datetime, AppointmentRow};
use crate::Result;

const SELECT_APPOINTMENT: &str = r#"
    SELECT a.id, a.tenant_id, a.contact_id, a.service_id, s.title AS service_title,
           a.starts_at, a.ends_at, a.status
    FROM appointments a
    JOIN services s ON s.id = a.service_id
"#;

/// Get an appointment of the tenant.
pub async fn get(pool: &SqlitePool, tenant_id: i64, appointment_id: i64) -> Result<Option<Appointment>> {
    let query = format!("{} WHERE a.tenant_id = ? AND a.id = ?", SELECT_APPOINTMENT);
    let row = sqlx::query_as::<_, AppointmentRow>(&query)
        .bind(tenant_id)
        .bind(appointment_id)
        .fetch_optional(pool)
        .await?;

    row.map(AppointmentRow::into_appointment).transpose()
}

/// Calendar-blocking appointments starting after `after`, ordered by start.
pub async fn upcoming_for_contact(
    pool: &SqlitePool,
    contact_id: i64,
    after: NaiveDateTime,
) -> Result<Vec<Appointment>> {
    let query = format!(
        "{} WHERE a.contact_id = ? AND a.status IN ('scheduled', 'confirmed') AND a.starts_at > ? \
         ORDER BY a.starts_at",
        SELECT_APPOINTMENT
    );
    let rows = sqlx::query_as::<_, AppointmentRow>(&query)
        .bind(contact_id)
        .bind(format_datetime(after))
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(AppointmentRow::into_appointment).collect()
}

/// Calendar-blocking appointments of the tenant overlapping `[start, end)`.
pub async fn overlapping(
    pool: &SqlitePool,
    tenant_id: i64,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Vec<Appointment>> {
    let query = format!(
        "{} WHERE a.tenant_id = ? AND a.status IN ('scheduled', 'confirmed') \
         AND a.starts_at < ? AND a.ends_at > ? ORDER BY a.starts_at",
        SELECT_APPOINTMENT
    );
    let rows = sqlx::query_as::<_, AppointmentRow>(&query)
        .bind(tenant_id)
        .bind(format_datetime(end))
        .bind(format_datetime(start))
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(AppointmentRow::into_appointment).collect()
}

async fn count_conflicts(
    conn: &mut SqliteConnection,
    tenant_id: i64,
    start: NaiveDateTime,
    end: NaiveDateTime,
    exclude_id: Option<i64>,
) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM appointments
        WHERE tenant_id = ?
          AND status IN ('scheduled', 'confirmed')
          AND starts_at < ? AND ends_at > ?
          AND id != ?
        "#,
    )
    .bind(tenant_id)
    .bind(format_datetime(end))
    .bind(format_datetime(start))
    .bind(exclude_id.unwrap_or(-1))
    .fetch_one(&mut *conn)
    .await?;

    Ok(count)
}

/// Insert a scheduled appointment, failing with `Conflict` if the slot is taken.
pub async fn insert(pool: &SqlitePool, new: &NewAppointment) -> Result<Appointment> {
    let mut tx = pool.begin().await?;

    if count_conflicts(&mut *tx, new.tenant_id, new.starts_at, new.ends_at, None).await? > 0 {
        return Err(DatabaseError::Conflict("slot no longer available".to_string()));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO appointments (tenant_id, contact_id, service_id, starts_at, ends_at, status)
        VALUES (?, ?, ?, ?, ?, 'scheduled')
        "#,
    )
    .bind(new.tenant_id)
    .bind(new.contact_id)
    .bind(new.service_id)
    .bind(format_datetime(new.starts_at))
    .bind(format_datetime(new.ends_at))
    .execute(&mut *tx)
    .await?;
    let id = result.last_insert_rowid();

    tx.commit().await?;

    get(pool, new.tenant_id, id)
        .await?
        .ok_or_else(|| DatabaseError::not_found("appointment", id))
}

/// Move an appointment, failing with `Conflict` if the new slot is taken.
///
/// The appointment itself is excluded from the conflict check.
pub async fn reschedule(
    pool: &SqlitePool,
    appointment_id: i64,
    starts_at: NaiveDateTime,
    ends_at: NaiveDateTime,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    let tenant_id: i64 = sqlx::query_scalar(
        r#"
        SELECT tenant_id FROM appointments
        WHERE id = ? AND status IN ('scheduled', 'confirmed')
        "#,
    )
    .bind(appointment_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| DatabaseError::not_found("appointment", appointment_id))?;

    if count_conflicts(&mut *tx, tenant_id, starts_at, ends_at, Some(appointment_id)).await? > 0 {
        return Err(DatabaseError::Conflict("slot no longer available".to_string()));
    }

    sqlx::query(
        r#"
        UPDATE appointments
        SET starts_at = ?, ends_at = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(format_datetime(starts_at))
    .bind(format_datetime(ends_at))
    .bind(appointment_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Cancel a calendar-blocking appointment.
pub async fn cancel(
    pool: &SqlitePool,
    appointment_id: i64,
    reason: Option<&str>,
    cancelled_at: NaiveDateTime,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE appointments
        SET status = 'cancelled', cancel_reason = ?, cancelled_at = ?, updated_at = datetime('now')
        WHERE id = ? AND status IN ('scheduled', 'confirmed')
        "#,
    )
    .bind(reason)
    .bind(format_datetime(cancelled_at))
    .bind(appointment_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("appointment", appointment_id));
    }
    Ok(())
}

#[derive(FromRow)]
struct CancellationRow {
    starts_at: String,
    cancel_reason: Option<String>,
}

/// The contact's most recently cancelled appointment.
pub async fn last_cancellation(pool: &SqlitePool, contact_id: i64) -> Result<Option<CancellationFact>> {
    let row = sqlx::query_as::<_, CancellationRow>(
        r#"
        SELECT starts_at, cancel_reason
        FROM appointments
        WHERE contact_id = ? AND status = 'cancelled'
        ORDER BY COALESCE(cancelled_at, updated_at) DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(contact_id)
    .fetch_optional(pool)
    .await?;

    row.map(|row| {
        Ok(CancellationFact {
            date: parse_datetime(&row.starts_at)?,
            reason: row.cancel_reason,
        })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, test_db};
    use crate::{contact, service};
    use brain_core::AppointmentStatus;

    #[tokio::test]
    async fn test_insert_rejects_overlap_but_allows_adjacent() {
        let db = test_db().await;
        let c = contact::find_or_create(db.pool(), 1, "+5215512345678").await.unwrap();
        let s = service::create_service(db.pool(), 1, "Limpieza", 50_000, 30).await.unwrap();

        let first = NewAppointment {
            tenant_id: 1,
            contact_id: c.id,
            service_id: s.id,
            starts_at: at(2026, 3, 2, 10, 0),
            ends_at: at(2026, 3, 2, 10, 30),
        };
        let created = insert(db.pool(), &first).await.unwrap();
        assert_eq!(created.status, AppointmentStatus::Scheduled);
        assert_eq!(created.service_title, "Limpieza");

        let overlapping_slot = NewAppointment {
            starts_at: at(2026, 3, 2, 10, 15),
            ends_at: at(2026, 3, 2, 10, 45),
            ..first.clone()
        };
        assert!(matches!(
            insert(db.pool(), &overlapping_slot).await,
            Err(DatabaseError::Conflict(_))
        ));

        let adjacent = NewAppointment {
            starts_at: at(2026, 3, 2, 10, 30),
            ends_at: at(2026, 3, 2, 11, 0),
            ..first
        };
        assert!(insert(db.pool(), &adjacent).await.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_and_last_cancellation() {
        let db = test_db().await;
        let c = contact::find_or_create(db.pool(), 1, "+5215512345678").await.unwrap();
        let s = service::create_service(db.pool(), 1, "Limpieza", 50_000, 30).await.unwrap();
        let created = insert(
            db.pool(),
            &NewAppointment {
                tenant_id: 1,
                contact_id: c.id,
                service_id: s.id,
                starts_at: at(2026, 3, 2, 10, 0),
                ends_at: at(2026, 3, 2, 10, 30),
            },
        )
        .await
        .unwrap();

        assert!(last_cancellation(db.pool(), c.id).await.unwrap().is_none());

        cancel(db.pool(), created.id, Some("viaje"), at(2026, 3, 1, 9, 0))
            .await
            .unwrap();
        let fact = last_cancellation(db.pool(), c.id).await.unwrap().unwrap();
        assert_eq!(fact.date, at(2026, 3, 2, 10, 0));
        assert_eq!(fact.reason.as_deref(), Some("viaje"));

        // Cancelling twice reports not found; the slot is free again.
        assert!(cancel(db.pool(), created.id, None, at(2026, 3, 1, 9, 0)).await.is_err());
        let busy = overlapping(db.pool(), 1, at(2026, 3, 2, 10, 0), at(2026, 3, 2, 10, 30))
            .await
            .unwrap();
        assert!(busy.is_empty());
    }

    #[tokio::test]
    async fn test_reschedule_excludes_itself() {
        let db = test_db().await;
        let c = contact::find_or_create(db.pool(), 1, "+5215512345678").await.unwrap();
        let s = service::create_service(db.pool(), 1, "Limpieza", 50_000, 60).await.unwrap();
        let created = insert(
            db.pool(),
            &NewAppointment {
                tenant_id: 1,
                contact_id: c.id,
                service_id: s.id,
                starts_at: at(2026, 3, 2, 10, 0),
                ends_at: at(2026, 3, 2, 11, 0),
            },
        )
        .await
        .unwrap();

        reschedule(db.pool(), created.id, at(2026, 3, 2, 10, 30), at(2026, 3, 2, 11, 30))
            .await
            .unwrap();

        let upcoming = upcoming_for_contact(db.pool(), c.id, at(2026, 3, 1, 0, 0))
            .await
            .unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].starts_at, at(2026, 3, 2, 10, 30));
    }
}
