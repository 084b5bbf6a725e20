//! Assembles the per-invocation conversation context from storage.

use brain_core::{ClinicStore, Contact, ConversationContext};
use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::error::OrchestratorError;

/// Convert a UTC instant to clinic-local wall time.
pub fn clinic_now(timezone: &str, utc: DateTime<Utc>) -> Result<NaiveDateTime, OrchestratorError> {
    let tz: Tz = timezone
        .parse()
        .map_err(|_| OrchestratorError::InvalidTimezone(timezone.to_string()))?;
    Ok(utc.with_timezone(&tz).naive_local())
}

/// Load everything one agent invocation needs for `contact`.
///
/// `history_limit` bounds the prior messages loaded. An unknown clinic
/// timezone is logged and treated as UTC rather than failing the message.
pub async fn load_context(
    store: &dyn ClinicStore,
    contact: Contact,
    history_limit: usize,
    utc_now: DateTime<Utc>,
) -> Result<ConversationContext, OrchestratorError> {
    let clinic = store.clinic_config(contact.tenant_id).await?;
    let now = clinic_now(&clinic.timezone, utc_now).unwrap_or_else(|e| {
        warn!(tenant_id = clinic.tenant_id, "{}, using UTC", e);
        utc_now.naive_utc()
    });

    let (history, appointments, services, last_cancellation) = futures::try_join!(
        store.recent_messages(contact.id, history_limit),
        store.upcoming_appointments(contact.id, now),
        store.active_services(contact.tenant_id),
        store.last_cancellation(contact.id),
    )?;

    Ok(ConversationContext {
        contact,
        history,
        appointments,
        services,
        clinic,
        last_cancellation,
        now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use brain_core::{AppointmentStatus, NewAppointment, Role};
    use chrono::TimeZone;
    use mock_brain::fixtures::{at, clinic_config};
    use mock_brain::InMemoryStore;

    #[test]
    fn test_clinic_now() {
        let utc = Utc.with_ymd_and_hms(2026, 2, 27, 18, 0, 0).unwrap();
        // Mexico City is UTC-6 with no daylight saving.
        assert_eq!(
            clinic_now("America/Mexico_City", utc).unwrap(),
            at(2026, 2, 27, 12, 0)
        );
        assert!(matches!(
            clinic_now("Mars/Olympus", utc),
            Err(OrchestratorError::InvalidTimezone(_))
        ));
    }

    #[tokio::test]
    async fn test_load_context() {
        let store = InMemoryStore::new();
        store.add_clinic(clinic_config(1));
        let service = store.add_service(1, "Limpieza dental", 50_000, 45);
        let contact = store.add_contact(1, "+5215512345678", Some("Ana"));
        store.seed_messages(
            contact.id,
            at(2026, 2, 26, 10, 0),
            &[
                (Role::User, "uno"),
                (Role::Assistant, "dos"),
                (Role::User, "tres"),
            ],
        );
        let past = store.seed_appointment(
            NewAppointment {
                tenant_id: 1,
                contact_id: contact.id,
                service_id: service.id,
                starts_at: at(2026, 2, 20, 10, 0),
                ends_at: at(2026, 2, 20, 10, 45),
            },
            AppointmentStatus::Scheduled,
        );
        let future = store.seed_appointment(
            NewAppointment {
                tenant_id: 1,
                contact_id: contact.id,
                service_id: service.id,
                starts_at: at(2026, 3, 2, 10, 0),
                ends_at: at(2026, 3, 2, 10, 45),
            },
            AppointmentStatus::Confirmed,
        );

        let utc = Utc.with_ymd_and_hms(2026, 2, 27, 18, 0, 0).unwrap();
        let context = load_context(&store, contact.clone(), 2, utc).await.unwrap();

        assert_eq!(context.now, at(2026, 2, 27, 12, 0));
        assert_eq!(context.history.len(), 2);
        assert_eq!(context.history[0].content, "dos");
        assert_eq!(context.appointments.len(), 1);
        assert_eq!(context.appointments[0].id, future.id);
        assert_ne!(context.appointments[0].id, past.id);
        assert_eq!(context.services, vec![service]);
        assert_eq!(context.contact, contact);
    }

    #[tokio::test]
    async fn test_missing_clinic_is_error() {
        let store = InMemoryStore::new();
        let contact = store.add_contact(9, "+5215500000000", None);
        let err = load_context(&store, contact, 10, Utc::now()).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Store(_)));
    }
}
