//! Appointment booking.

use std::sync::Arc;

use async_trait::async_trait;
use brain_core::{describe_datetime, ClinicStore, NewAppointment, ToolContext, ToolResult};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::format_stamp;
use crate::error::ToolError;
use crate::scheduling::{parse_date, parse_time, validate_slot};
use crate::tool::{Tool, ToolArgs};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BookArgs {
    service_id: i64,
    date: String,
    time: String,
}

/// Books an appointment for the current contact.
///
/// Refuses while the contact has no name, whatever the model was told.
pub struct BookAppointment {
    store: Arc<dyn ClinicStore>,
}

impl BookAppointment {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for BookAppointment {
    fn name(&self) -> &str {
        "book_appointment"
    }

    fn description(&self) -> &str {
        "Agenda una cita para el paciente. Requiere que su nombre ya esté registrado y un horario libre."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "service_id": {"type": "integer", "description": "ID del servicio del catálogo"},
                "date": {"type": "string", "description": "Fecha en formato AAAA-MM-DD"},
                "time": {"type": "string", "description": "Hora de inicio en formato HH:MM (24 horas)"}
            },
            "required": ["service_id", "date", "time"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: ToolArgs, context: &ToolContext) -> Result<ToolResult, ToolError> {
        let args: BookArgs = args.parse()?;

        let name = context.contact.display_name().ok_or_else(|| {
            ToolError::Rejected(
                "Falta el nombre del paciente. Pídele su nombre completo y regístralo con update_name antes de agendar."
                    .to_string(),
            )
        })?;

        let starts_at = parse_date(&args.date)?.and_time(parse_time(&args.time)?);

        let service = self
            .store
            .service(context.tenant_id, args.service_id)
            .await?
            .ok_or_else(|| {
                ToolError::Rejected(format!("No existe un servicio activo con ID {}.", args.service_id))
            })?;
        let ends_at = starts_at + service.duration();

        let existing = self
            .store
            .appointments_between(context.tenant_id, starts_at, ends_at)
            .await?;
        validate_slot(&context.clinic, context.now, starts_at, ends_at, &existing, None)?;

        let appointment = self
            .store
            .insert_appointment(NewAppointment {
                tenant_id: context.tenant_id,
                contact_id: context.contact.id,
                service_id: service.id,
                starts_at,
                ends_at,
            })
            .await?;

        info!(
            contact_id = context.contact.id,
            appointment_id = appointment.id,
            "Booked {} at {}",
            service.title,
            starts_at
        );

        Ok(ToolResult::success(format!(
            "Cita agendada para {}: {} el {}. ID de la cita: {}.",
            name,
            service.title,
            describe_datetime(starts_at),
            appointment.id
        ))
        .with_data(json!({
            "appointment_id": appointment.id,
            "service": service.title,
            "starts_at": format_stamp(starts_at),
            "ends_at": format_stamp(ends_at),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context_for, seeded_store};
    use brain_core::{AppointmentStatus, StoreError};
    use mock_brain::fixtures::at;

    fn args(service_id: i64, date: &str, time: &str) -> ToolArgs {
        ToolArgs::new(json!({"service_id": service_id, "date": date, "time": time}))
    }

    #[tokio::test]
    async fn test_books_free_slot() {
        let (store, service, contact) = seeded_store(Some("Ana Ruiz"));
        let tool = BookAppointment::new(store.clone());

        let result = tool
            .execute(args(service.id, "2026-03-02", "10:00"), &context_for(&contact))
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.message.contains("Ana Ruiz"));
        assert!(result.message.contains("10:00 AM"));
        let booked = store.appointments_snapshot();
        assert_eq!(booked.len(), 1);
        assert_eq!(booked[0].starts_at, at(2026, 3, 2, 10, 0));
        assert_eq!(booked[0].ends_at, at(2026, 3, 2, 10, 45));
        assert_eq!(booked[0].status, AppointmentStatus::Scheduled);
        assert_eq!(result.data.unwrap()["appointment_id"], booked[0].id);
    }

    #[tokio::test]
    async fn test_refuses_without_name() {
        let (store, service, contact) = seeded_store(None);
        let tool = BookAppointment::new(store.clone());

        let err = tool
            .execute(args(service.id, "2026-03-02", "10:00"), &context_for(&contact))
            .await
            .unwrap_err();

        assert!(err.user_message().contains("update_name"));
        assert!(store.appointments_snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_adjacent_booking_allowed_overlap_rejected() {
        let (store, service, contact) = seeded_store(Some("Ana"));
        let tool = BookAppointment::new(store.clone());
        let context = context_for(&contact);

        tool.execute(args(service.id, "2026-03-02", "10:00"), &context)
            .await
            .unwrap();
        let adjacent = tool
            .execute(args(service.id, "2026-03-02", "10:45"), &context)
            .await
            .unwrap();
        assert!(adjacent.success);

        let err = tool
            .execute(args(service.id, "2026-03-02", "11:00"), &context)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Rejected(_)));
        assert_eq!(store.appointments_snapshot().len(), 2);
    }

    #[tokio::test]
    async fn test_outside_hours_and_past() {
        let (store, service, contact) = seeded_store(Some("Ana"));
        let tool = BookAppointment::new(store.clone());
        let context = context_for(&contact);

        // 17:30 + 45 minutes runs past the 18:00 close.
        assert!(tool
            .execute(args(service.id, "2026-03-02", "17:30"), &context)
            .await
            .is_err());
        assert!(tool
            .execute(args(service.id, "2026-02-26", "10:00"), &context)
            .await
            .is_err());
        assert!(store.appointments_snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_error() {
        let (store, service, contact) = seeded_store(Some("Ana"));
        store.fail_writes(true);
        let tool = BookAppointment::new(store.clone());

        let err = tool
            .execute(args(service.id, "2026-03-02", "10:00"), &context_for(&contact))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Store(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn test_rejects_extra_fields() {
        let (store, service, contact) = seeded_store(Some("Ana"));
        let tool = BookAppointment::new(store);

        let err = tool
            .execute(
                ToolArgs::new(json!({
                    "service_id": service.id,
                    "date": "2026-03-02",
                    "time": "10:00",
                    "contact_id": 99
                })),
                &context_for(&contact),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
