//! Database row models and their conversion into domain types.

use brain_core::{
    Appointment, AppointmentStatus, Contact, ContactKind, DayHours, Message, Role, Service,
    StoredMessage, DATETIME_FORMAT,
};
use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{DatabaseError, Result};

const TIME_FORMAT: &str = "%H:%M";

/// A contact row. Tags are stored as a JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ContactRow {
    pub id: i64,
    pub tenant_id: i64,
    pub kind: String,
    pub phone: String,
    pub name: Option<String>,
    pub notes: Option<String>,
    pub tags: String,
    pub created_at: String,
    pub updated_at: String,
}

impl ContactRow {
    pub fn into_contact(self) -> Result<Contact> {
        let tags: Vec<String> = serde_json::from_str(&self.tags)
            .map_err(|e| DatabaseError::InvalidData(format!("contact {} tags: {}", self.id, e)))?;
        Ok(Contact {
            id: self.id,
            tenant_id: self.tenant_id,
            kind: ContactKind::parse(&self.kind),
            phone: self.phone,
            name: self.name,
            notes: self.notes,
            tags,
        })
    }
}

/// A conversation message row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MessageRow {
    pub id: i64,
    pub contact_id: i64,
    pub role: String,
    pub content: String,
    pub created_at: String,
}

impl MessageRow {
    pub fn into_stored(self) -> Result<StoredMessage> {
        let role = Role::parse(&self.role).ok_or_else(|| {
            DatabaseError::InvalidData(format!("message {} role: {}", self.id, self.role))
        })?;
        Ok(StoredMessage {
            id: self.id,
            message: Message {
                role,
                content: self.content,
                created_at: parse_datetime(&self.created_at).ok(),
            },
        })
    }
}

/// A service catalog row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ServiceRow {
    pub id: i64,
    pub tenant_id: i64,
    pub title: String,
    pub price_cents: i64,
    pub duration_minutes: i64,
    pub active: bool,
}

impl ServiceRow {
    pub fn into_service(self) -> Result<Service> {
        let duration_minutes = u32::try_from(self.duration_minutes).map_err(|_| {
            DatabaseError::InvalidData(format!(
                "service {} duration: {}",
                self.id, self.duration_minutes
            ))
        })?;
        Ok(Service {
            id: self.id,
            title: self.title,
            price_cents: self.price_cents,
            duration_minutes,
        })
    }
}

/// An appointment row joined with its service title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AppointmentRow {
    pub id: i64,
    pub tenant_id: i64,
    pub contact_id: i64,
    pub service_id: i64,
    pub service_title: String,
    pub starts_at: String,
    pub ends_at: String,
    pub status: String,
}

impl AppointmentRow {
    pub fn into_appointment(self) -> Result<Appointment> {
        let status = AppointmentStatus::parse(&self.status).ok_or_else(|| {
            DatabaseError::InvalidData(format!("appointment {} status: {}", self.id, self.status))
        })?;
        Ok(Appointment {
            id: self.id,
            tenant_id: self.tenant_id,
            contact_id: self.contact_id,
            service_id: self.service_id,
            service_title: self.service_title,
            starts_at: parse_datetime(&self.starts_at)?,
            ends_at: parse_datetime(&self.ends_at)?,
            status,
        })
    }
}

/// A clinic row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ClinicRow {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub timezone: String,
}

/// Opening hours for one weekday (0 = Monday).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ClinicHoursRow {
    pub weekday: i64,
    pub open_time: Option<String>,
    pub close_time: Option<String>,
}

impl ClinicHoursRow {
    pub fn into_day_hours(&self) -> Result<DayHours> {
        match (self.open_time.as_deref(), self.close_time.as_deref()) {
            (Some(open), Some(close)) => Ok(DayHours::open(parse_time(open)?, parse_time(close)?)),
            _ => Ok(DayHours::Closed),
        }
    }
}

/// A stored conversation summary. Key facts are a JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ConversationSummaryRow {
    pub id: i64,
    pub contact_id: i64,
    pub summary: String,
    pub key_facts: String,
    pub message_count: i64,
    pub created_at: String,
}

pub(crate) fn format_datetime(value: NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

pub(crate) fn parse_datetime(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
        .map_err(|e| DatabaseError::InvalidData(format!("timestamp '{}': {}", value, e)))
}

pub(crate) fn format_time(value: NaiveTime) -> String {
    value.format(TIME_FORMAT).to_string()
}

pub(crate) fn parse_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .map_err(|e| DatabaseError::InvalidData(format!("time '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_row_conversion() {
        let row = ContactRow {
            id: 3,
            tenant_id: 1,
            kind: "patient".to_string(),
            phone: "+5215512345678".to_string(),
            name: None,
            notes: None,
            tags: r#"["ortodoncia"]"#.to_string(),
            created_at: "2026-01-01 00:00:00".to_string(),
            updated_at: "2026-01-01 00:00:00".to_string(),
        };
        let contact = row.into_contact().unwrap();
        assert_eq!(contact.kind, ContactKind::Patient);
        assert_eq!(contact.tags, vec!["ortodoncia"]);
    }

    #[test]
    fn test_bad_tags_are_invalid_data() {
        let row = ContactRow {
            id: 3,
            tenant_id: 1,
            kind: "lead".to_string(),
            phone: "+5215512345678".to_string(),
            name: None,
            notes: None,
            tags: "not json".to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert!(matches!(row.into_contact(), Err(DatabaseError::InvalidData(_))));
    }

    #[test]
    fn test_hours_row_closed_when_missing_time() {
        let row = ClinicHoursRow {
            weekday: 6,
            open_time: Some("09:00".to_string()),
            close_time: None,
        };
        assert_eq!(row.into_day_hours().unwrap(), DayHours::Closed);
    }

    #[test]
    fn test_datetime_roundtrip_format() {
        let parsed = parse_datetime("2026-03-02 10:30:00").unwrap();
        assert_eq!(format_datetime(parsed), "2026-03-02 10:30:00");
        assert!(parse_datetime("2026-03-02T10:30").is_err());
    }
}
