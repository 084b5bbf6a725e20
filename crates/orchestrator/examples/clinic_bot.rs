//! Console chat with the clinic agent.
//!
//! Each line typed on stdin is processed as an inbound message from one
//! phone number; replies are logged by the sender and printed.
//!
//! Run with: cargo run -p orchestrator --example clinic_bot
//!
//! Configuration via .env file or environment variables:
//!   DEEPSEEK_API_KEY - API key for the gateway (required)
//!   DATABASE_URL     - SQLite URL (default: sqlite:clinic.db?mode=rwc)
//!   CLINIC_PHONE     - Phone number to chat as (default: +5215512345678)
//!   RUST_LOG         - Log filter (e.g. orchestrator=debug)

use std::env;
use std::sync::Arc;

use brain_core::{ClinicConfig, DayHours, WeeklyHours};
use chrono::{NaiveTime, Weekday};
use database::{clinic, service, Database, SqliteClinicStore};
use deepseek_brain::DeepSeekGateway;
use orchestrator::{InboundMessage, LoggingSender, Orchestrator};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

const TENANT_ID: i64 = 1;

fn demo_clinic() -> Option<ClinicConfig> {
    let open = NaiveTime::from_hms_opt(9, 0, 0)?;
    let weekday = DayHours::open(open, NaiveTime::from_hms_opt(18, 0, 0)?);
    let saturday = DayHours::open(open, NaiveTime::from_hms_opt(14, 0, 0)?);

    let mut hours = WeeklyHours::default();
    for day in [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri] {
        hours.set(day, weekday);
    }
    hours.set(Weekday::Sat, saturday);

    Some(ClinicConfig {
        tenant_id: TENANT_ID,
        name: "Clínica Dental Sonrisa".to_string(),
        address: "Av. Reforma 123, CDMX".to_string(),
        phone: "+525555555555".to_string(),
        timezone: "America/Mexico_City".to_string(),
        hours,
    })
}

/// Seed a demo clinic and catalog on first run.
async fn seed(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    if clinic::get_clinic_config(db.pool(), TENANT_ID).await.is_ok() {
        return Ok(());
    }

    let config = demo_clinic().ok_or("invalid demo hours")?;
    clinic::upsert_clinic(db.pool(), &config).await?;
    service::create_service(db.pool(), TENANT_ID, "Limpieza dental", 50_000, 45).await?;
    service::create_service(db.pool(), TENANT_ID, "Valoración", 0, 30).await?;
    service::create_service(db.pool(), TENANT_ID, "Blanqueamiento", 250_000, 90).await?;
    info!("Seeded demo clinic {}", config.name);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:clinic.db?mode=rwc".to_string());
    let phone = env::var("CLINIC_PHONE").unwrap_or_else(|_| "+5215512345678".to_string());

    let db = Database::connect(&database_url).await?;
    db.migrate().await?;
    seed(&db).await?;

    let store = Arc::new(SqliteClinicStore::new(db));
    let gateway = Arc::new(DeepSeekGateway::from_env()?);
    let orchestrator = Orchestrator::from_env(store, gateway, LoggingSender);

    println!("Escribe un mensaje (Ctrl-D para salir).");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let message = InboundMessage::new(TENANT_ID, phone.clone(), line);
        match orchestrator.process(message).await {
            Ok(processed) => {
                for call in &processed.reply.tool_calls {
                    println!("  [{}] {}", call.name, call.result.message);
                }
                println!("> {}", processed.reply.text);
            }
            Err(e) => warn!("Skipped: {}", e),
        }
    }

    Ok(())
}
