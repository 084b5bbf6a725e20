//! Clinic (tenant) configuration persistence.

use brain_core::{ClinicConfig, DayHours, WeeklyHours};
use chrono::Weekday;
use sqlx::SqlitePool;

use crate::error::DatabaseError;
use crate::models::{format_time, ClinicHoursRow, ClinicRow};
use crate::Result;

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Create or replace a clinic and its weekly hours.
pub async fn upsert_clinic(pool: &SqlitePool, config: &ClinicConfig) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO clinics (id, name, address, phone, timezone)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            address = excluded.address,
            phone = excluded.phone,
            timezone = excluded.timezone
        "#,
    )
    .bind(config.tenant_id)
    .bind(&config.name)
    .bind(&config.address)
    .bind(&config.phone)
    .bind(&config.timezone)
    .execute(&mut *tx)
    .await?;

    for day in WEEK {
        let (open, close) = match config.hours.get(day) {
            DayHours::Closed => (None, None),
            DayHours::Open { open, close } => (Some(format_time(open)), Some(format_time(close))),
        };
        sqlx::query(
            r#"
            INSERT INTO clinic_hours (tenant_id, weekday, open_time, close_time)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(tenant_id, weekday) DO UPDATE SET
                open_time = excluded.open_time,
                close_time = excluded.close_time
            "#,
        )
        .bind(config.tenant_id)
        .bind(i64::from(day.num_days_from_monday()))
        .bind(open)
        .bind(close)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Load a clinic and its weekly hours.
///
/// Weekdays without a row are reported as closed.
pub async fn get_clinic_config(pool: &SqlitePool, tenant_id: i64) -> Result<ClinicConfig> {
    let clinic = sqlx::query_as::<_, ClinicRow>(
        r#"
        SELECT id, name, address, phone, timezone
        FROM clinics
        WHERE id = ?
        "#,
    )
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("clinic", tenant_id))?;

    let rows = sqlx::query_as::<_, ClinicHoursRow>(
        r#"
        SELECT weekday, open_time, close_time
        FROM clinic_hours
        WHERE tenant_id = ?
        ORDER BY weekday
        "#,
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;

    let mut hours = WeeklyHours::default();
    for row in &rows {
        let day = usize::try_from(row.weekday)
            .ok()
            .and_then(|idx| WEEK.get(idx).copied())
            .ok_or_else(|| DatabaseError::InvalidData(format!("weekday {}", row.weekday)))?;
        hours.set(day, row.into_day_hours()?);
    }

    Ok(ClinicConfig {
        tenant_id: clinic.id,
        name: clinic.name,
        address: clinic.address,
        phone: clinic.phone,
        timezone: clinic.timezone,
        hours,
    })
}
