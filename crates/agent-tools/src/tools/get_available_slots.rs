//! Free slot listing.

use std::sync::Arc;

use async_trait::async_trait;
use brain_core::{format_time_12h, weekday_name_es, ClinicStore, ToolContext, ToolResult};
use chrono::{Datelike, Duration};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::ToolError;
use crate::scheduling::{available_slots, parse_date, DATE_FORMAT, TIME_FORMAT};
use crate::tool::{Tool, ToolArgs};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SlotsArgs {
    date: String,
    service_id: i64,
}

/// Lists the start times still free on a date for one service.
///
/// Slots are laid end to end from opening time, each as long as the
/// service.
pub struct GetAvailableSlots {
    store: Arc<dyn ClinicStore>,
}

impl GetAvailableSlots {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetAvailableSlots {
    fn name(&self) -> &str {
        "get_available_slots"
    }

    fn description(&self) -> &str {
        "Consulta los horarios libres de un día para un servicio. Úsala antes de proponer o agendar una cita."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "date": {"type": "string", "description": "Fecha en formato AAAA-MM-DD"},
                "service_id": {"type": "integer", "description": "ID del servicio del catálogo"}
            },
            "required": ["date", "service_id"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: ToolArgs, context: &ToolContext) -> Result<ToolResult, ToolError> {
        let args: SlotsArgs = args.parse()?;
        let date = parse_date(&args.date)?;

        if date < context.now.date() {
            return Err(ToolError::Rejected(format!(
                "La fecha {} ya pasó. Hoy es {}.",
                date.format(DATE_FORMAT),
                context.now.format(DATE_FORMAT)
            )));
        }

        let service = self
            .store
            .service(context.tenant_id, args.service_id)
            .await?
            .ok_or_else(|| {
                ToolError::Rejected(format!("No existe un servicio activo con ID {}.", args.service_id))
            })?;

        let day_start = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| ToolError::InvalidArguments(format!("fecha {} inválida", date)))?;
        let existing = self
            .store
            .appointments_between(context.tenant_id, day_start, day_start + Duration::days(1))
            .await?;

        let slots = available_slots(&context.clinic, date, service.duration(), context.now, &existing);
        debug!("{} free slots on {} for service {}", slots.len(), date, service.id);

        let day = format!("{} {}", weekday_name_es(date.weekday()), date.format(DATE_FORMAT));
        let message = if context.clinic.hours_on(date).is_closed() {
            format!("La clínica está cerrada el {}.", day)
        } else if slots.is_empty() {
            format!("No hay horarios disponibles el {} para {}.", day, service.title)
        } else {
            let times: Vec<String> = slots.iter().map(|t| format_time_12h(*t)).collect();
            format!(
                "Horarios disponibles el {} para {} ({} min): {}.",
                day,
                service.title,
                service.duration_minutes,
                times.join(", ")
            )
        };

        let slot_values: Vec<String> = slots.iter().map(|t| t.format(TIME_FORMAT).to_string()).collect();
        Ok(ToolResult::success(message).with_data(json!({
            "date": date.format(DATE_FORMAT).to_string(),
            "service_id": service.id,
            "duration_minutes": service.duration_minutes,
            "slots": slot_values,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context_for, seeded_store};
    use brain_core::{AppointmentStatus, NewAppointment};
    use mock_brain::fixtures::at;

    #[tokio::test]
    async fn test_lists_free_slots() {
        let (store, service, contact) = seeded_store(Some("Ana"));
        store.seed_appointment(
            NewAppointment {
                tenant_id: 1,
                contact_id: contact.id,
                service_id: service.id,
                starts_at: at(2026, 3, 7, 9, 45),
                ends_at: at(2026, 3, 7, 10, 30),
            },
            AppointmentStatus::Confirmed,
        );
        let tool = GetAvailableSlots::new(store.clone());

        // Saturday 9:00-14:00 in 45 minute steps.
        let result = tool
            .execute(
                ToolArgs::new(json!({"date": "2026-03-07", "service_id": service.id})),
                &context_for(&contact),
            )
            .await
            .unwrap();

        assert!(result.success);
        let data = result.data.unwrap();
        assert_eq!(
            data["slots"],
            json!(["09:00", "10:30", "11:15", "12:00", "12:45"])
        );
        assert!(result.message.contains("9:00 AM"));
        assert!(result.message.contains("sábado"));
    }

    #[tokio::test]
    async fn test_closed_day() {
        let (store, service, contact) = seeded_store(None);
        let tool = GetAvailableSlots::new(store);

        let result = tool
            .execute(
                ToolArgs::new(json!({"date": "2026-03-01", "service_id": service.id})),
                &context_for(&contact),
            )
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.message.contains("cerrada"));
        assert_eq!(result.data.unwrap()["slots"], json!([]));
    }

    #[tokio::test]
    async fn test_unknown_service_and_bad_date() {
        let (store, _service, contact) = seeded_store(None);
        let tool = GetAvailableSlots::new(store);
        let context = context_for(&contact);

        let err = tool
            .execute(ToolArgs::new(json!({"date": "2026-03-02", "service_id": 999})), &context)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Rejected(_)));

        let err = tool
            .execute(ToolArgs::new(json!({"date": "mañana", "service_id": 1})), &context)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));

        let err = tool
            .execute(ToolArgs::new(json!({"date": "2026-02-20", "service_id": 1})), &context)
            .await
            .unwrap_err();
        assert!(err.user_message().contains("ya pasó"));
    }
}
