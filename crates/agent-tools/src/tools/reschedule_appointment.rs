//! Appointment rescheduling.

use std::sync::Arc;

use async_trait::async_trait;
use brain_core::{describe_datetime, ClinicStore, ToolContext, ToolResult};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{changeable_appointment, format_stamp};
use crate::error::ToolError;
use crate::scheduling::{parse_date, parse_time, validate_slot};
use crate::tool::{Tool, ToolArgs};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RescheduleArgs {
    appointment_id: i64,
    date: String,
    time: String,
}

/// Moves one of the contact's upcoming appointments, keeping its length.
pub struct RescheduleAppointment {
    store: Arc<dyn ClinicStore>,
}

impl RescheduleAppointment {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for RescheduleAppointment {
    fn name(&self) -> &str {
        "reschedule_appointment"
    }

    fn description(&self) -> &str {
        "Cambia la fecha u hora de una cita próxima del paciente usando su ID."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "appointment_id": {"type": "integer", "description": "ID de la cita a mover"},
                "date": {"type": "string", "description": "Nueva fecha en formato AAAA-MM-DD"},
                "time": {"type": "string", "description": "Nueva hora de inicio en formato HH:MM (24 horas)"}
            },
            "required": ["appointment_id", "date", "time"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: ToolArgs, context: &ToolContext) -> Result<ToolResult, ToolError> {
        let args: RescheduleArgs = args.parse()?;
        let starts_at = parse_date(&args.date)?.and_time(parse_time(&args.time)?);

        let appointment =
            changeable_appointment(self.store.as_ref(), context, args.appointment_id).await?;
        let ends_at = starts_at + (appointment.ends_at - appointment.starts_at);

        let existing = self
            .store
            .appointments_between(context.tenant_id, starts_at, ends_at)
            .await?;
        validate_slot(
            &context.clinic,
            context.now,
            starts_at,
            ends_at,
            &existing,
            Some(appointment.id),
        )?;

        self.store
            .reschedule_appointment(appointment.id, starts_at, ends_at)
            .await?;

        info!(
            contact_id = context.contact.id,
            appointment_id = appointment.id,
            "Rescheduled from {} to {}",
            appointment.starts_at,
            starts_at
        );

        Ok(ToolResult::success(format!(
            "Cita {} ({}) reprogramada del {} al {}.",
            appointment.id,
            appointment.service_title,
            describe_datetime(appointment.starts_at),
            describe_datetime(starts_at)
        ))
        .with_data(json!({
            "appointment_id": appointment.id,
            "starts_at": format_stamp(starts_at),
            "ends_at": format_stamp(ends_at),
        })))
    }
}
