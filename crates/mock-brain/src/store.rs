//! In-memory [`ClinicStore`] for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use brain_core::{
    append_note, async_trait, merge_tags, normalize_phone, Appointment, AppointmentStatus,
    CancellationFact, ClinicConfig, ClinicStore, Contact, ContactKind, ConversationSummary,
    Message, NewAppointment, Role, Service, StoreError, StoredMessage,
};
use chrono::NaiveDateTime;

#[derive(Debug, Clone)]
struct ServiceEntry {
    tenant_id: i64,
    service: Service,
    active: bool,
}

#[derive(Debug, Clone)]
struct AppointmentEntry {
    appointment: Appointment,
    cancel_reason: Option<String>,
    cancelled_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone)]
struct MessageEntry {
    contact_id: i64,
    message: StoredMessage,
}

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    clinics: HashMap<i64, ClinicConfig>,
    services: Vec<ServiceEntry>,
    contacts: Vec<Contact>,
    messages: Vec<MessageEntry>,
    appointments: Vec<AppointmentEntry>,
    summaries: Vec<ConversationSummary>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn contact_mut(&mut self, contact_id: i64) -> Result<&mut Contact, StoreError> {
        self.contacts
            .iter_mut()
            .find(|contact| contact.id == contact_id)
            .ok_or_else(|| StoreError::not_found("contact", contact_id))
    }

    fn has_conflict(&self, tenant_id: i64, start: NaiveDateTime, end: NaiveDateTime, exclude: Option<i64>) -> bool {
        self.appointments.iter().any(|entry| {
            let appointment = &entry.appointment;
            appointment.tenant_id == tenant_id
                && Some(appointment.id) != exclude
                && appointment.status.blocks_calendar()
                && appointment.overlaps(start, end)
        })
    }

    fn blocking_appointment_mut(&mut self, appointment_id: i64) -> Result<&mut AppointmentEntry, StoreError> {
        self.appointments
            .iter_mut()
            .find(|entry| {
                entry.appointment.id == appointment_id
                    && entry.appointment.status.blocks_calendar()
            })
            .ok_or_else(|| StoreError::not_found("appointment", appointment_id))
    }
}

/// A [`ClinicStore`] kept in memory.
///
/// Seeding helpers bypass the calendar rules so tests can set up any state.
/// Writes can be made to fail with [`InMemoryStore::fail_writes`], and reads
/// of a single contact are counted.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    fail_writes: AtomicBool,
    contact_reads: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("writes disabled".to_string()));
        }
        Ok(())
    }

    /// Make every subsequent write fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of calls to [`ClinicStore::contact`] and
    /// [`ClinicStore::find_or_create_contact`].
    pub fn contact_reads(&self) -> usize {
        self.contact_reads.load(Ordering::SeqCst)
    }

    pub fn add_clinic(&self, clinic: ClinicConfig) {
        self.state().clinics.insert(clinic.tenant_id, clinic);
    }

    pub fn add_service(
        &self,
        tenant_id: i64,
        title: &str,
        price_cents: i64,
        duration_minutes: u32,
    ) -> Service {
        let mut state = self.state();
        let service = Service {
            id: state.next_id(),
            title: title.to_string(),
            price_cents,
            duration_minutes,
        };
        state.services.push(ServiceEntry {
            tenant_id,
            service: service.clone(),
            active: true,
        });
        service
    }

    pub fn deactivate_service(&self, service_id: i64) {
        let mut state = self.state();
        for entry in state.services.iter_mut().filter(|e| e.service.id == service_id) {
            entry.active = false;
        }
    }

    pub fn add_contact(&self, tenant_id: i64, phone: &str, name: Option<&str>) -> Contact {
        let mut state = self.state();
        let contact = Contact {
            id: state.next_id(),
            tenant_id,
            kind: ContactKind::Lead,
            phone: normalize_phone(phone),
            name: name.map(str::to_string),
            notes: None,
            tags: Vec::new(),
        };
        state.contacts.push(contact.clone());
        contact
    }

    pub fn set_contact_kind(&self, contact_id: i64, kind: ContactKind) {
        if let Ok(contact) = self.state().contact_mut(contact_id) {
            contact.kind = kind;
        }
    }

    /// Append messages with ascending timestamps starting at `start`.
    pub fn seed_messages(&self, contact_id: i64, start: NaiveDateTime, messages: &[(Role, &str)]) {
        let mut state = self.state();
        for (offset, (role, content)) in messages.iter().enumerate() {
            let id = state.next_id();
            let created_at = start + chrono::Duration::minutes(offset as i64);
            state.messages.push(MessageEntry {
                contact_id,
                message: StoredMessage {
                    id,
                    message: Message {
                        role: *role,
                        content: content.to_string(),
                        created_at: Some(created_at),
                    },
                },
            });
        }
    }

    /// Insert an appointment with any status, skipping calendar checks.
    pub fn seed_appointment(&self, new: NewAppointment, status: AppointmentStatus) -> Appointment {
        let mut state = self.state();
        let service_title = state
            .services
            .iter()
            .find(|entry| entry.service.id == new.service_id)
            .map(|entry| entry.service.title.clone())
            .unwrap_or_default();
        let appointment = Appointment {
            id: state.next_id(),
            tenant_id: new.tenant_id,
            contact_id: new.contact_id,
            service_id: new.service_id,
            service_title,
            starts_at: new.starts_at,
            ends_at: new.ends_at,
            status,
        };
        state.appointments.push(AppointmentEntry {
            appointment: appointment.clone(),
            cancel_reason: None,
            cancelled_at: None,
        });
        appointment
    }

    /// Mark an appointment cancelled at `cancelled_at`.
    pub fn seed_cancellation(&self, appointment_id: i64, reason: Option<&str>, cancelled_at: NaiveDateTime) {
        let mut state = self.state();
        if let Some(entry) = state
            .appointments
            .iter_mut()
            .find(|entry| entry.appointment.id == appointment_id)
        {
            entry.appointment.status = AppointmentStatus::Cancelled;
            entry.cancel_reason = reason.map(str::to_string);
            entry.cancelled_at = Some(cancelled_at);
        }
    }

    pub fn contact_snapshot(&self, contact_id: i64) -> Option<Contact> {
        self.state()
            .contacts
            .iter()
            .find(|contact| contact.id == contact_id)
            .cloned()
    }

    pub fn messages_snapshot(&self, contact_id: i64) -> Vec<StoredMessage> {
        self.state()
            .messages
            .iter()
            .filter(|entry| entry.contact_id == contact_id)
            .map(|entry| entry.message.clone())
            .collect()
    }

    pub fn appointments_snapshot(&self) -> Vec<Appointment> {
        self.state()
            .appointments
            .iter()
            .map(|entry| entry.appointment.clone())
            .collect()
    }

    pub fn summaries(&self) -> Vec<ConversationSummary> {
        self.state().summaries.clone()
    }
}

#[async_trait]
impl ClinicStore for InMemoryStore {
    async fn find_or_create_contact(&self, tenant_id: i64, phone: &str) -> Result<Contact, StoreError> {
        self.contact_reads.fetch_add(1, Ordering::SeqCst);
        let phone = normalize_phone(phone);
        let existing = self
            .state()
            .contacts
            .iter()
            .find(|contact| contact.tenant_id == tenant_id && contact.phone == phone)
            .cloned();
        match existing {
            Some(contact) => Ok(contact),
            None => {
                self.check_writable()?;
                Ok(self.add_contact(tenant_id, &phone, None))
            }
        }
    }

    async fn contact(&self, contact_id: i64) -> Result<Contact, StoreError> {
        self.contact_reads.fetch_add(1, Ordering::SeqCst);
        self.contact_snapshot(contact_id)
            .ok_or_else(|| StoreError::not_found("contact", contact_id))
    }

    async fn recent_messages(&self, contact_id: i64, limit: usize) -> Result<Vec<Message>, StoreError> {
        let messages = self.messages_snapshot(contact_id);
        let skip = messages.len().saturating_sub(limit);
        Ok(messages.into_iter().skip(skip).map(|stored| stored.message).collect())
    }

    async fn messages(&self, contact_id: i64) -> Result<Vec<StoredMessage>, StoreError> {
        Ok(self.messages_snapshot(contact_id))
    }

    async fn message_count(&self, contact_id: i64) -> Result<usize, StoreError> {
        Ok(self.messages_snapshot(contact_id).len())
    }

    async fn append_message(&self, contact_id: i64, role: Role, content: &str) -> Result<i64, StoreError> {
        self.check_writable()?;
        let mut state = self.state();
        state.contact_mut(contact_id)?;
        let id = state.next_id();
        state.messages.push(MessageEntry {
            contact_id,
            message: StoredMessage {
                id,
                message: Message {
                    role,
                    content: content.to_string(),
                    created_at: None,
                },
            },
        });
        Ok(id)
    }

    async fn upcoming_appointments(&self, contact_id: i64, after: NaiveDateTime) -> Result<Vec<Appointment>, StoreError> {
        let mut upcoming: Vec<Appointment> = self
            .state()
            .appointments
            .iter()
            .map(|entry| &entry.appointment)
            .filter(|a| a.contact_id == contact_id && a.status.blocks_calendar() && a.starts_at > after)
            .cloned()
            .collect();
        upcoming.sort_by_key(|a| a.starts_at);
        Ok(upcoming)
    }

    async fn active_services(&self, tenant_id: i64) -> Result<Vec<Service>, StoreError> {
        let mut services: Vec<Service> = self
            .state()
            .services
            .iter()
            .filter(|entry| entry.tenant_id == tenant_id && entry.active)
            .map(|entry| entry.service.clone())
            .collect();
        services.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(services)
    }

    async fn service(&self, tenant_id: i64, service_id: i64) -> Result<Option<Service>, StoreError> {
        Ok(self
            .state()
            .services
            .iter()
            .find(|entry| entry.tenant_id == tenant_id && entry.active && entry.service.id == service_id)
            .map(|entry| entry.service.clone()))
    }

    async fn last_cancellation(&self, contact_id: i64) -> Result<Option<CancellationFact>, StoreError> {
        Ok(self
            .state()
            .appointments
            .iter()
            .filter(|entry| {
                entry.appointment.contact_id == contact_id
                    && entry.appointment.status == AppointmentStatus::Cancelled
            })
            .max_by_key(|entry| entry.cancelled_at)
            .map(|entry| CancellationFact {
                date: entry.appointment.starts_at,
                reason: entry.cancel_reason.clone(),
            }))
    }

    async fn clinic_config(&self, tenant_id: i64) -> Result<ClinicConfig, StoreError> {
        self.state()
            .clinics
            .get(&tenant_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("clinic", tenant_id))
    }

    async fn update_contact_name(&self, contact_id: i64, name: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        self.state().contact_mut(contact_id)?.name = Some(name.to_string());
        Ok(())
    }

    async fn append_contact_memory(&self, contact_id: i64, note: &str, tags: &[String]) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut state = self.state();
        let contact = state.contact_mut(contact_id)?;
        contact.notes = append_note(contact.notes.as_deref(), note);
        contact.tags = merge_tags(&contact.tags, tags);
        Ok(())
    }

    async fn appointment(&self, tenant_id: i64, appointment_id: i64) -> Result<Option<Appointment>, StoreError> {
        Ok(self
            .state()
            .appointments
            .iter()
            .map(|entry| &entry.appointment)
            .find(|a| a.tenant_id == tenant_id && a.id == appointment_id)
            .cloned())
    }

    async fn appointments_between(
        &self,
        tenant_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Appointment>, StoreError> {
        Ok(self
            .state()
            .appointments
            .iter()
            .map(|entry| &entry.appointment)
            .filter(|a| a.tenant_id == tenant_id && a.status.blocks_calendar() && a.overlaps(start, end))
            .cloned()
            .collect())
    }

    async fn insert_appointment(&self, new: NewAppointment) -> Result<Appointment, StoreError> {
        self.check_writable()?;
        {
            let state = self.state();
            if !state
                .services
                .iter()
                .any(|entry| entry.tenant_id == new.tenant_id && entry.service.id == new.service_id)
            {
                return Err(StoreError::not_found("service", new.service_id));
            }
            if state.has_conflict(new.tenant_id, new.starts_at, new.ends_at, None) {
                return Err(StoreError::Conflict("slot no longer available".to_string()));
            }
        }
        Ok(self.seed_appointment(new, AppointmentStatus::Scheduled))
    }

    async fn cancel_appointment(
        &self,
        appointment_id: i64,
        reason: Option<&str>,
        cancelled_at: NaiveDateTime,
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut state = self.state();
        let entry = state.blocking_appointment_mut(appointment_id)?;
        entry.appointment.status = AppointmentStatus::Cancelled;
        entry.cancel_reason = reason.map(str::to_string);
        entry.cancelled_at = Some(cancelled_at);
        Ok(())
    }

    async fn reschedule_appointment(
        &self,
        appointment_id: i64,
        starts_at: NaiveDateTime,
        ends_at: NaiveDateTime,
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut state = self.state();
        let tenant_id = state.blocking_appointment_mut(appointment_id)?.appointment.tenant_id;
        if state.has_conflict(tenant_id, starts_at, ends_at, Some(appointment_id)) {
            return Err(StoreError::Conflict("slot no longer available".to_string()));
        }
        let entry = state.blocking_appointment_mut(appointment_id)?;
        entry.appointment.starts_at = starts_at;
        entry.appointment.ends_at = ends_at;
        Ok(())
    }

    async fn commit_compaction(
        &self,
        summary: &ConversationSummary,
        note: &str,
        last_message_id: i64,
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut state = self.state();
        let covered = state.messages.iter().any(|entry| {
            entry.contact_id == summary.contact_id && entry.message.id <= last_message_id
        });
        if !covered {
            return Err(StoreError::Conflict(format!(
                "messages up to {} were already compacted",
                last_message_id
            )));
        }
        let contact = state.contact_mut(summary.contact_id)?;
        contact.notes = append_note(contact.notes.as_deref(), note);
        contact.tags = merge_tags(&contact.tags, &summary.key_facts);
        state.summaries.push(summary.clone());
        state.messages.retain(|entry| {
            entry.contact_id != summary.contact_id || entry.message.id > last_message_id
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, clinic_config};

    fn new_appointment(contact_id: i64, service_id: i64, start: NaiveDateTime) -> NewAppointment {
        NewAppointment {
            tenant_id: 1,
            contact_id,
            service_id,
            starts_at: start,
            ends_at: start + chrono::Duration::minutes(30),
        }
    }

    #[tokio::test]
    async fn test_find_or_create_is_stable() {
        let store = InMemoryStore::new();
        let first = store.find_or_create_contact(1, "+52 1 55 1234 5678").await.unwrap();
        let second = store.find_or_create_contact(1, "+5215512345678").await.unwrap();
        let other_tenant = store.find_or_create_contact(2, "+5215512345678").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_ne!(first.id, other_tenant.id);
        assert_eq!(first.kind, ContactKind::Lead);
        assert_eq!(store.contact_reads(), 3);
    }

    #[tokio::test]
    async fn test_insert_conflict_and_adjacent() {
        let store = InMemoryStore::new();
        store.add_clinic(clinic_config(1));
        let service = store.add_service(1, "Limpieza", 50_000, 30);
        let contact = store.add_contact(1, "+5215500000001", Some("Ana"));

        store
            .insert_appointment(new_appointment(contact.id, service.id, at(2026, 3, 2, 10, 0)))
            .await
            .unwrap();
        let adjacent = store
            .insert_appointment(new_appointment(contact.id, service.id, at(2026, 3, 2, 10, 30)))
            .await
            .unwrap();
        assert_eq!(adjacent.service_title, "Limpieza");

        let conflict = store
            .insert_appointment(new_appointment(contact.id, service.id, at(2026, 3, 2, 10, 15)))
            .await;
        assert!(matches!(conflict, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_commit_compaction_keeps_tail() {
        let store = InMemoryStore::new();
        let contact = store.add_contact(1, "+5215500000002", None);
        store.seed_messages(
            contact.id,
            at(2026, 3, 1, 9, 0),
            &[(Role::User, "uno"), (Role::Assistant, "dos"), (Role::User, "tres")],
        );
        let messages = store.messages(contact.id).await.unwrap();

        let summary = ConversationSummary {
            contact_id: contact.id,
            summary: "Saludo inicial".to_string(),
            key_facts: vec!["interesado en limpieza".to_string()],
            message_count: 2,
            created_at: at(2026, 3, 1, 10, 0),
        };
        store
            .commit_compaction(&summary, &summary.note(), messages[1].id)
            .await
            .unwrap();

        let remaining = store.messages_snapshot(contact.id);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].message.content, "tres");
        let updated = store.contact_snapshot(contact.id).unwrap();
        assert!(updated.notes.unwrap().contains("Saludo inicial"));
        assert_eq!(updated.tags, vec!["interesado en limpieza"]);
        assert_eq!(store.summaries().len(), 1);
    }

    #[tokio::test]
    async fn test_recommit_of_compacted_prefix_conflicts() {
        let store = InMemoryStore::new();
        let contact = store.add_contact(1, "+5215500000004", None);
        store.seed_messages(
            contact.id,
            at(2026, 3, 1, 9, 0),
            &[(Role::User, "uno"), (Role::Assistant, "dos"), (Role::User, "tres")],
        );
        let messages = store.messages(contact.id).await.unwrap();
        let summary = ConversationSummary {
            contact_id: contact.id,
            summary: "Saludo inicial".to_string(),
            key_facts: vec!["interesado en limpieza".to_string()],
            message_count: 2,
            created_at: at(2026, 3, 1, 10, 0),
        };

        store
            .commit_compaction(&summary, &summary.note(), messages[1].id)
            .await
            .unwrap();
        let again = store
            .commit_compaction(&summary, &summary.note(), messages[1].id)
            .await;

        assert!(matches!(again, Err(StoreError::Conflict(_))));
        assert_eq!(store.summaries().len(), 1);
        assert_eq!(store.messages_snapshot(contact.id).len(), 1);
        let notes = store.contact_snapshot(contact.id).unwrap().notes.unwrap();
        assert_eq!(notes.matches("Saludo inicial").count(), 1);
    }

    #[tokio::test]
    async fn test_fail_writes() {
        let store = InMemoryStore::new();
        let contact = store.add_contact(1, "+5215500000003", None);
        store.fail_writes(true);
        let result = store.append_message(contact.id, Role::User, "hola").await;
        assert!(matches!(result, Err(StoreError::Backend(_))));
        assert!(store.messages_snapshot(contact.id).is_empty());
    }
}
