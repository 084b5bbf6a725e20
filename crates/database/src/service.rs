//! Service catalog persistence.

use brain_core::Service;
use sqlx::SqlitePool;

use crate::models::ServiceRow;
use crate::Result;

/// Insert an active service and return it.
pub async fn create_service(
    pool: &SqlitePool,
    tenant_id: i64,
    title: &str,
    price_cents: i64,
    duration_minutes: u32,
) -> Result<Service> {
    let result = sqlx::query(
        r#"
        INSERT INTO services (tenant_id, title, price_cents, duration_minutes)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(tenant_id)
    .bind(title)
    .bind(price_cents)
    .bind(i64::from(duration_minutes))
    .execute(pool)
    .await?;

    Ok(Service {
        id: result.last_insert_rowid(),
        title: title.to_string(),
        price_cents,
        duration_minutes,
    })
}

/// Enable or disable a service.
pub async fn set_service_active(pool: &SqlitePool, service_id: i64, active: bool) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE services SET active = ?
        WHERE id = ?
        "#,
    )
    .bind(active)
    .bind(service_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// List the tenant's active services, ordered by title.
pub async fn list_active(pool: &SqlitePool, tenant_id: i64) -> Result<Vec<Service>> {
    let rows = sqlx::query_as::<_, ServiceRow>(
        r#"
        SELECT id, tenant_id, title, price_cents, duration_minutes, active
        FROM services
        WHERE tenant_id = ? AND active = 1
        ORDER BY title
        "#,
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(ServiceRow::into_service).collect()
}

/// Get an active service of the tenant.
pub async fn get_active(pool: &SqlitePool, tenant_id: i64, service_id: i64) -> Result<Option<Service>> {
    let row = sqlx::query_as::<_, ServiceRow>(
        r#"
        SELECT id, tenant_id, title, price_cents, duration_minutes, active
        FROM services
        WHERE tenant_id = ? AND id = ? AND active = 1
        "#,
    )
    .bind(tenant_id)
    .bind(service_id)
    .fetch_optional(pool)
    .await?;

    row.map(ServiceRow::into_service).transpose()
}
