//! Sample clinic data shared by tests across the workspace.

use brain_core::{ClinicConfig, Contact, ContactKind, DayHours, WeeklyHours};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};

/// Build a date-time, panicking on an invalid date.
pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .unwrap_or_else(|| panic!("invalid fixture date {year}-{month}-{day} {hour}:{minute}"))
}

fn time(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).expect("valid hour")
}

/// Monday to Friday 9:00-18:00, Saturday 9:00-14:00, Sunday closed.
pub fn weekday_hours() -> WeeklyHours {
    let weekday = DayHours::open(time(9), time(18));
    WeeklyHours::default()
        .with(Weekday::Mon, weekday)
        .with(Weekday::Tue, weekday)
        .with(Weekday::Wed, weekday)
        .with(Weekday::Thu, weekday)
        .with(Weekday::Fri, weekday)
        .with(Weekday::Sat, DayHours::open(time(9), time(14)))
}

pub fn clinic_config(tenant_id: i64) -> ClinicConfig {
    ClinicConfig {
        tenant_id,
        name: "Clínica Dental Sonrisa".to_string(),
        address: "Av. Reforma 123, CDMX".to_string(),
        phone: "+525555555555".to_string(),
        timezone: "America/Mexico_City".to_string(),
        hours: weekday_hours(),
    }
}

/// A lead with no name, the state every new conversation starts in.
pub fn unnamed_lead(id: i64, tenant_id: i64) -> Contact {
    Contact {
        id,
        tenant_id,
        kind: ContactKind::Lead,
        phone: "+5215512345678".to_string(),
        name: None,
        notes: None,
        tags: Vec::new(),
    }
}
