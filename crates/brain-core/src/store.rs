//! Tenant-scoped persistence interface consumed by the agent core.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use thiserror::Error;

use crate::clinic::{Appointment, CancellationFact, ClinicConfig, NewAppointment, Service};
use crate::contact::Contact;
use crate::memory::ConversationSummary;
use crate::message::{Message, Role, StoredMessage};

/// Errors returned by a [`ClinicStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced row does not exist in this tenant.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The write would violate a calendar or uniqueness rule.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any failure of the underlying store.
    #[error("storage error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Persistence operations used by the pipeline, the tools and the compactor.
///
/// Every call is already scoped to one tenant by its arguments; the core
/// never builds tenant filters of its own.
#[async_trait]
pub trait ClinicStore: Send + Sync {
    /// Resolve the contact for a phone number, creating a lead if absent.
    async fn find_or_create_contact(&self, tenant_id: i64, phone: &str)
        -> Result<Contact, StoreError>;

    /// Load a contact by id.
    async fn contact(&self, contact_id: i64) -> Result<Contact, StoreError>;

    /// Most recent `limit` messages, oldest first.
    async fn recent_messages(&self, contact_id: i64, limit: usize)
        -> Result<Vec<Message>, StoreError>;

    /// Every stored message with its id, oldest first.
    async fn messages(&self, contact_id: i64) -> Result<Vec<StoredMessage>, StoreError>;

    async fn message_count(&self, contact_id: i64) -> Result<usize, StoreError>;

    /// Append a message and return its id.
    async fn append_message(
        &self,
        contact_id: i64,
        role: Role,
        content: &str,
    ) -> Result<i64, StoreError>;

    /// Non-cancelled appointments starting after `after`, ordered by start.
    async fn upcoming_appointments(
        &self,
        contact_id: i64,
        after: NaiveDateTime,
    ) -> Result<Vec<Appointment>, StoreError>;

    async fn active_services(&self, tenant_id: i64) -> Result<Vec<Service>, StoreError>;

    /// An active service of the tenant.
    async fn service(&self, tenant_id: i64, service_id: i64)
        -> Result<Option<Service>, StoreError>;

    async fn last_cancellation(
        &self,
        contact_id: i64,
    ) -> Result<Option<CancellationFact>, StoreError>;

    async fn clinic_config(&self, tenant_id: i64) -> Result<ClinicConfig, StoreError>;

    async fn update_contact_name(&self, contact_id: i64, name: &str) -> Result<(), StoreError>;

    /// Append a note and merge tags into the contact's durable memory.
    async fn append_contact_memory(
        &self,
        contact_id: i64,
        note: &str,
        tags: &[String],
    ) -> Result<(), StoreError>;

    async fn appointment(
        &self,
        tenant_id: i64,
        appointment_id: i64,
    ) -> Result<Option<Appointment>, StoreError>;

    /// Calendar-blocking appointments of the tenant overlapping `[start, end)`.
    async fn appointments_between(
        &self,
        tenant_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Appointment>, StoreError>;

    async fn insert_appointment(&self, new: NewAppointment) -> Result<Appointment, StoreError>;

    async fn cancel_appointment(
        &self,
        appointment_id: i64,
        reason: Option<&str>,
        cancelled_at: NaiveDateTime,
    ) -> Result<(), StoreError>;

    async fn reschedule_appointment(
        &self,
        appointment_id: i64,
        starts_at: NaiveDateTime,
        ends_at: NaiveDateTime,
    ) -> Result<(), StoreError>;

    /// Persist a compaction as one unit.
    ///
    /// Appends `note` and the summary's facts to the contact, records the
    /// summary, and deletes the contact's messages with id `<= last_message_id`.
    /// Either all of it happens or none of it does.
    ///
    /// Fails with [`StoreError::Conflict`] when no such message is left, so a
    /// second commit of an already compacted prefix writes nothing.
    async fn commit_compaction(
        &self,
        summary: &ConversationSummary,
        note: &str,
        last_message_id: i64,
    ) -> Result<(), StoreError>;
}
