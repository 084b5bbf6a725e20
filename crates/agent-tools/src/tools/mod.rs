//! Clinic tool implementations.

mod book_appointment;
mod cancel_appointment;
mod get_available_slots;
mod request_human;
mod reschedule_appointment;
mod update_name;

pub use book_appointment::BookAppointment;
pub use cancel_appointment::CancelAppointment;
pub use get_available_slots::GetAvailableSlots;
pub use request_human::{RequestHuman, HANDOFF_TAG};
pub use reschedule_appointment::RescheduleAppointment;
pub use update_name::{UpdateName, MAX_NAME_CHARS};

use brain_core::{Appointment, ClinicStore, ToolContext};

use crate::error::ToolError;

/// Load an appointment that belongs to the context's contact and can still
/// be changed: not cancelled or finished, and not yet started.
///
/// Appointments of other contacts are reported as missing.
async fn changeable_appointment(
    store: &dyn ClinicStore,
    context: &ToolContext,
    appointment_id: i64,
) -> Result<Appointment, ToolError> {
    let appointment = store
        .appointment(context.tenant_id, appointment_id)
        .await?
        .filter(|appointment| appointment.contact_id == context.contact.id)
        .ok_or_else(|| {
            ToolError::Rejected(format!(
                "No encontré la cita {} para este paciente. Revisa los IDs de sus próximas citas.",
                appointment_id
            ))
        })?;

    if !appointment.status.blocks_calendar() {
        return Err(ToolError::Rejected(format!(
            "La cita {} ya está {} y no se puede modificar.",
            appointment_id,
            appointment.status.label()
        )));
    }

    if appointment.starts_at <= context.now {
        return Err(ToolError::Rejected(format!(
            "La cita {} ya pasó y no se puede modificar.",
            appointment_id
        )));
    }

    Ok(appointment)
}

fn format_stamp(at: chrono::NaiveDateTime) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}
