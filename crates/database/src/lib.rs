//! SQLite persistence layer for the clinic agent.
//!
//! This crate provides async database operations for clinics, contacts,
//! transcripts, services and appointments using SQLx with SQLite, and a
//! [`SqliteClinicStore`] that exposes them through the
//! [`brain_core::ClinicStore`] interface.
//!
//! # Example
//!
//! ```no_run
//! use database::{contact, Database};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:clinic.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let lead = contact::find_or_create(db.pool(), 1, "+5215512345678").await?;
//!     println!("contact {} ({:?})", lead.id, lead.kind);
//!
//!     Ok(())
//! }
//! ```

pub mod appointment;
pub mod clinic;
pub mod contact;
pub mod conversation_summary;
pub mod error;
pub mod message;
pub mod models;
pub mod service;
pub mod store;
pub mod validation;

pub use error::{DatabaseError, Result};
pub use store::SqliteClinicStore;
pub use validation::ValidationError;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    ///
    /// In-memory databases are per connection, so pair `sqlite::memory:`
    /// with [`Database::connect_with_pool_size`] and a size of 1.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use brain_core::{ClinicConfig, DayHours, WeeklyHours};
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};

    use crate::{clinic, Database};

    pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    pub fn weekday_hours() -> WeeklyHours {
        let open = DayHours::open(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        );
        WeeklyHours::default()
            .with(Weekday::Mon, open)
            .with(Weekday::Tue, open)
            .with(Weekday::Wed, open)
            .with(Weekday::Thu, open)
            .with(Weekday::Fri, open)
            .with(
                Weekday::Sat,
                DayHours::open(
                    NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                    NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
                ),
            )
    }

    /// Migrated in-memory database with clinic 1 seeded.
    pub async fn test_db() -> Database {
        let db = Database::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        db.migrate().await.unwrap();
        clinic::upsert_clinic(
            db.pool(),
            &ClinicConfig {
                tenant_id: 1,
                name: "Clínica Dental Sonrisa".to_string(),
                address: "Av. Reforma 123, CDMX".to_string(),
                phone: "+525555555555".to_string(),
                timezone: "America/Mexico_City".to_string(),
                hours: weekday_hours(),
            },
        )
        .await
        .unwrap();
        db
    }
}
