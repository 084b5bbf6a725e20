//! [`ClinicStore`] implementation over SQLite.

use async_trait::async_trait;
use brain_core::{
    Appointment, CancellationFact, ClinicConfig, ClinicStore, Contact, ConversationSummary,
    Message, NewAppointment, Role, Service, StoreError, StoredMessage,
};
use chrono::NaiveDateTime;
use tracing::info;

use crate::{appointment, clinic, contact, conversation_summary, message, service, Database};

/// SQLite-backed clinic store.
#[derive(Debug, Clone)]
pub struct SqliteClinicStore {
    db: Database,
}

impl SqliteClinicStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl ClinicStore for SqliteClinicStore {
    async fn find_or_create_contact(
        &self,
        tenant_id: i64,
        phone: &str,
    ) -> Result<Contact, StoreError> {
        Ok(contact::find_or_create(self.db.pool(), tenant_id, phone).await?)
    }

    async fn contact(&self, contact_id: i64) -> Result<Contact, StoreError> {
        Ok(contact::get_contact(self.db.pool(), contact_id).await?)
    }

    async fn recent_messages(
        &self,
        contact_id: i64,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError> {
        Ok(message::recent(self.db.pool(), contact_id, limit).await?)
    }

    async fn messages(&self, contact_id: i64) -> Result<Vec<StoredMessage>, StoreError> {
        Ok(message::list(self.db.pool(), contact_id).await?)
    }

    async fn message_count(&self, contact_id: i64) -> Result<usize, StoreError> {
        let count = message::count(self.db.pool(), contact_id).await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn append_message(
        &self,
        contact_id: i64,
        role: Role,
        content: &str,
    ) -> Result<i64, StoreError> {
        Ok(message::append(self.db.pool(), contact_id, role, content).await?)
    }

    async fn upcoming_appointments(
        &self,
        contact_id: i64,
        after: NaiveDateTime,
    ) -> Result<Vec<Appointment>, StoreError> {
        Ok(appointment::upcoming_for_contact(self.db.pool(), contact_id, after).await?)
    }

    async fn active_services(&self, tenant_id: i64) -> Result<Vec<Service>, StoreError> {
        Ok(service::list_active(self.db.pool(), tenant_id).await?)
    }

    async fn service(
        &self,
        tenant_id: i64,
        service_id: i64,
    ) -> Result<Option<Service>, StoreError> {
        Ok(service::get_active(self.db.pool(), tenant_id, service_id).await?)
    }

    async fn last_cancellation(
        &self,
        contact_id: i64,
    ) -> Result<Option<CancellationFact>, StoreError> {
        Ok(appointment::last_cancellation(self.db.pool(), contact_id).await?)
    }

    async fn clinic_config(&self, tenant_id: i64) -> Result<ClinicConfig, StoreError> {
        Ok(clinic::get_clinic_config(self.db.pool(), tenant_id).await?)
    }

    async fn update_contact_name(&self, contact_id: i64, name: &str) -> Result<(), StoreError> {
        Ok(contact::update_name(self.db.pool(), contact_id, name).await?)
    }

    async fn append_contact_memory(
        &self,
        contact_id: i64,
        note: &str,
        tags: &[String],
    ) -> Result<(), StoreError> {
        let mut conn = self
            .db
            .pool()
            .acquire()
            .await
            .map_err(crate::DatabaseError::from)?;
        Ok(contact::append_memory(&mut conn, contact_id, note, tags).await?)
    }

    async fn appointment(
        &self,
        tenant_id: i64,
        appointment_id: i64,
    ) -> Result<Option<Appointment>, StoreError> {
        Ok(appointment::get(self.db.pool(), tenant_id, appointment_id).await?)
    }

    async fn appointments_between(
        &self,
        tenant_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Appointment>, StoreError> {
        Ok(appointment::overlapping(self.db.pool(), tenant_id, start, end).await?)
    }

    async fn insert_appointment(&self, new: NewAppointment) -> Result<Appointment, StoreError> {
        Ok(appointment::insert(self.db.pool(), &new).await?)
    }

    async fn cancel_appointment(
        &self,
        appointment_id: i64,
        reason: Option<&str>,
        cancelled_at: NaiveDateTime,
    ) -> Result<(), StoreError> {
        Ok(appointment::cancel(self.db.pool(), appointment_id, reason, cancelled_at).await?)
    }

    async fn reschedule_appointment(
        &self,
        appointment_id: i64,
        starts_at: NaiveDateTime,
        ends_at: NaiveDateTime,
    ) -> Result<(), StoreError> {
        Ok(appointment::reschedule(self.db.pool(), appointment_id, starts_at, ends_at).await?)
    }

    async fn commit_compaction(
        &self,
        summary: &ConversationSummary,
        note: &str,
        last_message_id: i64,
    ) -> Result<(), StoreError> {
        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(crate::DatabaseError::from)?;

        contact::append_memory(&mut tx, summary.contact_id, note, &summary.key_facts).await?;
        conversation_summary::insert(&mut tx, summary).await?;
        let deleted = message::delete_up_to(&mut tx, summary.contact_id, last_message_id).await?;
        if deleted == 0 {
            // Dropping the transaction rolls back the note and summary row.
            return Err(StoreError::Conflict(format!(
                "messages up to {} were already compacted",
                last_message_id
            )));
        }

        tx.commit().await.map_err(crate::DatabaseError::from)?;

        info!(
            contact_id = summary.contact_id,
            deleted, "Committed conversation compaction"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, test_db};

    #[tokio::test]
    async fn test_commit_compaction_is_atomic_unit() {
        let db = test_db().await;
        let store = SqliteClinicStore::new(db.clone());
        let c = store.find_or_create_contact(1, "+5215512345678").await.unwrap();

        let mut ids = Vec::new();
        for i in 0..8 {
            ids.push(
                store
                    .append_message(c.id, Role::User, &format!("mensaje {}", i))
                    .await
                    .unwrap(),
            );
        }

        let summary = ConversationSummary {
            contact_id: c.id,
            summary: "Pidió limpieza".to_string(),
            key_facts: vec!["interés: limpieza".to_string()],
            message_count: 5,
            created_at: at(2026, 3, 2, 12, 0),
        };
        store
            .commit_compaction(&summary, &summary.note(), ids[4])
            .await
            .unwrap();

        assert_eq!(store.message_count(c.id).await.unwrap(), 3);
        let contact = store.contact(c.id).await.unwrap();
        assert_eq!(
            contact.notes.as_deref(),
            Some("[2026-03-02 12:00] Pidió limpieza")
        );
        assert_eq!(contact.tags, vec!["interés: limpieza"]);

        let summaries = conversation_summary::list_for_contact(db.pool(), c.id)
            .await
            .unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].message_count, 5);
    }

    #[tokio::test]
    async fn test_commit_compaction_rolls_back_on_failure() {
        let db = test_db().await;
        let store = SqliteClinicStore::new(db.clone());
        let c = store.find_or_create_contact(1, "+5215512345678").await.unwrap();
        let last = store.append_message(c.id, Role::User, "hola").await.unwrap();

        // Unknown contact makes the first statement fail.
        let summary = ConversationSummary {
            contact_id: 404,
            summary: "x".to_string(),
            key_facts: vec![],
            message_count: 1,
            created_at: at(2026, 3, 2, 12, 0),
        };
        let result = store.commit_compaction(&summary, "x", last).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
        assert_eq!(store.message_count(c.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_second_commit_of_same_prefix_is_rejected() {
        let db = test_db().await;
        let store = SqliteClinicStore::new(db.clone());
        let c = store.find_or_create_contact(1, "+5215512345678").await.unwrap();

        let mut ids = Vec::new();
        for i in 0..6 {
            ids.push(
                store
                    .append_message(c.id, Role::User, &format!("mensaje {}", i))
                    .await
                    .unwrap(),
            );
        }

        let summary = ConversationSummary {
            contact_id: c.id,
            summary: "Pidió limpieza".to_string(),
            key_facts: vec!["interés: limpieza".to_string()],
            message_count: 4,
            created_at: at(2026, 3, 2, 12, 0),
        };
        store
            .commit_compaction(&summary, &summary.note(), ids[3])
            .await
            .unwrap();

        let again = store.commit_compaction(&summary, &summary.note(), ids[3]).await;
        assert!(matches!(again, Err(StoreError::Conflict(_))));

        assert_eq!(store.message_count(c.id).await.unwrap(), 2);
        let contact = store.contact(c.id).await.unwrap();
        assert_eq!(
            contact.notes.as_deref(),
            Some("[2026-03-02 12:00] Pidió limpieza")
        );
        let summaries = conversation_summary::list_for_contact(db.pool(), c.id)
            .await
            .unwrap();
        assert_eq!(summaries.len(), 1);
    }

    #[tokio::test]
    async fn test_store_errors_map_to_domain() {
        let db = test_db().await;
        let store = SqliteClinicStore::new(db);
        assert!(matches!(
            store.clinic_config(99).await,
            Err(StoreError::NotFound { entity: "clinic", .. })
        ));
        assert!(matches!(
            store.update_contact_name(1, "   ").await,
            Err(StoreError::Backend(_))
        ));
    }
}
