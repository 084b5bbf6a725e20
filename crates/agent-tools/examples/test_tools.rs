//! Walk through the clinic tools against an in-memory store.
//!
//! Run with: cargo run -p agent-tools --example test_tools

use std::sync::Arc;

use agent_tools::{default_registry, ToolRegistry};
use brain_core::{Contact, ToolContext};
use mock_brain::fixtures::{at, clinic_config};
use mock_brain::InMemoryStore;
use serde_json::{json, Value};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("agent_tools=debug".parse()?),
        )
        .init();

    println!("=== Clinic Tools Walkthrough ===\n");

    let store = Arc::new(InMemoryStore::new());
    store.add_clinic(clinic_config(1));
    let cleaning = store.add_service(1, "Limpieza dental", 50_000, 45);
    let contact = store.add_contact(1, "+5215512345678", None);

    let registry = default_registry(store.clone());

    println!("Registered tools:");
    for definition in registry.definitions() {
        println!("  - {}: {}", definition.function.name, definition.function.description);
    }
    println!();

    let mut contact = contact;
    run(&registry, &contact, "get_available_slots", json!({"date": "2026-03-02", "service_id": cleaning.id})).await;
    run(&registry, &contact, "book_appointment", json!({"service_id": cleaning.id, "date": "2026-03-02", "time": "10:00"})).await;
    run(&registry, &contact, "update_name", json!({"name": "Ana López"})).await;

    contact.name = Some("Ana López".to_string());
    run(&registry, &contact, "book_appointment", json!({"service_id": cleaning.id, "date": "2026-03-02", "time": "10:00"})).await;

    let booked = store
        .appointments_snapshot()
        .first()
        .map(|appointment| appointment.id)
        .unwrap_or_default();
    run(&registry, &contact, "reschedule_appointment", json!({"appointment_id": booked, "date": "2026-03-03", "time": "11:00"})).await;
    run(&registry, &contact, "cancel_appointment", json!({"appointment_id": booked, "reason": "viaje"})).await;
    run(&registry, &contact, "request_human", json!({"reason": "quiere hablar de un presupuesto"})).await;

    println!("\n=== Done ===");
    Ok(())
}

async fn run(registry: &ToolRegistry, contact: &Contact, name: &str, arguments: Value) {
    let context = ToolContext {
        contact: contact.clone(),
        tenant_id: contact.tenant_id,
        clinic: clinic_config(contact.tenant_id),
        now: at(2026, 2, 27, 12, 0),
    };

    println!("--- {} {}", name, arguments);
    match registry.execute(name, arguments, &context).await {
        Ok(result) if result.success => println!("  [OK] {}", result.message),
        Ok(result) => println!("  [REFUSED] {}", result.message),
        Err(e) => println!("  [ERROR] {}", e.user_message()),
    }
}
