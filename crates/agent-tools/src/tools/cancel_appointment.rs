//! Appointment cancellation.

use std::sync::Arc;

use async_trait::async_trait;
use brain_core::{describe_datetime, ClinicStore, ToolContext, ToolResult};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::changeable_appointment;
use crate::error::ToolError;
use crate::tool::{Tool, ToolArgs};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CancelArgs {
    appointment_id: i64,
    #[serde(default)]
    reason: Option<String>,
}

/// Cancels one of the contact's upcoming appointments.
pub struct CancelAppointment {
    store: Arc<dyn ClinicStore>,
}

impl CancelAppointment {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CancelAppointment {
    fn name(&self) -> &str {
        "cancel_appointment"
    }

    fn description(&self) -> &str {
        "Cancela una cita próxima del paciente usando su ID. Incluye el motivo si el paciente lo menciona."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "appointment_id": {"type": "integer", "description": "ID de la cita a cancelar"},
                "reason": {"type": "string", "description": "Motivo de la cancelación"}
            },
            "required": ["appointment_id"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: ToolArgs, context: &ToolContext) -> Result<ToolResult, ToolError> {
        let args: CancelArgs = args.parse()?;
        let appointment =
            changeable_appointment(self.store.as_ref(), context, args.appointment_id).await?;

        let reason = args
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty());

        self.store
            .cancel_appointment(appointment.id, reason, context.now)
            .await?;

        info!(
            contact_id = context.contact.id,
            appointment_id = appointment.id,
            "Cancelled appointment"
        );

        Ok(ToolResult::success(format!(
            "Cita {} cancelada: {} del {}.",
            appointment.id,
            appointment.service_title,
            describe_datetime(appointment.starts_at)
        ))
        .with_data(json!({
            "appointment_id": appointment.id,
            "reason": reason,
        })))
    }
}
