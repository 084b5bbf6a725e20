//! Clinic configuration, service catalog and appointment types.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Operating hours for a single weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DayHours {
    /// Explicitly closed all day.
    Closed,
    /// Open between `open` (inclusive) and `close` (exclusive).
    Open { open: NaiveTime, close: NaiveTime },
}

impl DayHours {
    pub fn open(open: NaiveTime, close: NaiveTime) -> Self {
        Self::Open { open, close }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Whether `[start, end)` lies fully inside the opening window.
    pub fn contains(&self, start: NaiveTime, end: NaiveTime) -> bool {
        match self {
            Self::Closed => false,
            Self::Open { open, close } => start >= *open && end <= *close && start < end,
        }
    }
}

/// Operating hours for every day of the week, Monday first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyHours {
    days: [DayHours; 7],
}

impl Default for WeeklyHours {
    fn default() -> Self {
        Self {
            days: [DayHours::Closed; 7],
        }
    }
}

impl WeeklyHours {
    pub fn get(&self, day: Weekday) -> DayHours {
        self.days[day.num_days_from_monday() as usize]
    }

    pub fn set(&mut self, day: Weekday, hours: DayHours) {
        self.days[day.num_days_from_monday() as usize] = hours;
    }

    /// Builder-style variant of [`WeeklyHours::set`].
    pub fn with(mut self, day: Weekday, hours: DayHours) -> Self {
        self.set(day, hours);
        self
    }

    /// Iterate Monday through Sunday.
    pub fn iter(&self) -> impl Iterator<Item = (Weekday, DayHours)> + '_ {
        self.days
            .iter()
            .enumerate()
            .filter_map(|(idx, hours)| Some((weekday_from_index(idx)?, *hours)))
    }
}

fn weekday_from_index(idx: usize) -> Option<Weekday> {
    match idx {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

/// Patient-facing 12-hour clock, e.g. `9:00 AM` or `2:30 PM`.
pub fn format_time_12h(time: NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}

/// Spanish weekday name, lowercase.
pub fn weekday_name_es(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "lunes",
        Weekday::Tue => "martes",
        Weekday::Wed => "miércoles",
        Weekday::Thu => "jueves",
        Weekday::Fri => "viernes",
        Weekday::Sat => "sábado",
        Weekday::Sun => "domingo",
    }
}

/// Date and time as shown to patients: `lunes 2026-03-02 a las 10:00 AM`.
pub fn describe_datetime(at: NaiveDateTime) -> String {
    format!(
        "{} {} a las {}",
        weekday_name_es(at.weekday()),
        at.format("%Y-%m-%d"),
        format_time_12h(at.time())
    )
}

/// Tenant-level read-only configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicConfig {
    pub tenant_id: i64,
    pub name: String,
    pub address: String,
    pub phone: String,
    /// IANA timezone identifier, e.g. `America/Mexico_City`.
    pub timezone: String,
    pub hours: WeeklyHours,
}

impl ClinicConfig {
    /// Opening hours that apply on a calendar date.
    pub fn hours_on(&self, date: NaiveDate) -> DayHours {
        self.hours.get(date.weekday())
    }
}

/// An entry of the active service catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub title: String,
    pub price_cents: i64,
    pub duration_minutes: u32,
}

impl Service {
    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Price rendered as `$1,250.00`.
    pub fn display_price(&self) -> String {
        let whole = self.price_cents / 100;
        let cents = (self.price_cents % 100).abs();
        let digits = whole.abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (idx, ch) in digits.chars().enumerate() {
            if idx > 0 && (digits.len() - idx) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        let sign = if self.price_cents < 0 { "-" } else { "" };
        format!("{}${}.{:02}", sign, grouped, cents)
    }
}

/// Lifecycle state of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(Self::Scheduled),
            "confirmed" => Some(Self::Confirmed),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "no_show" => Some(Self::NoShow),
            _ => None,
        }
    }

    /// Spanish label shown to patients.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Scheduled => "agendada",
            Self::Confirmed => "confirmada",
            Self::Completed => "completada",
            Self::Cancelled => "cancelada",
            Self::NoShow => "no asistió",
        }
    }

    /// Whether the appointment still occupies its calendar slot.
    pub fn blocks_calendar(&self) -> bool {
        matches!(self, Self::Scheduled | Self::Confirmed)
    }
}

/// A calendar entry. Times are clinic-local.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub tenant_id: i64,
    pub contact_id: i64,
    pub service_id: i64,
    pub service_title: String,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub status: AppointmentStatus,
}

impl Appointment {
    /// Half-open interval overlap with `[start, end)`.
    ///
    /// Back-to-back intervals do not overlap.
    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        start < self.ends_at && self.starts_at < end
    }
}

/// Values required to insert an appointment.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub tenant_id: i64,
    pub contact_id: i64,
    pub service_id: i64,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
}

/// The most recent cancellation for a contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationFact {
    pub date: NaiveDateTime,
    pub reason: Option<String>,
}
