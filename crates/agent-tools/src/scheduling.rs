//! Calendar rules shared by the scheduling tools.
//!
//! These mirror the rules of the clinic's booking system: an appointment
//! must start in the future, fit entirely inside the opening hours of its
//! day, and not overlap another calendar-blocking appointment. Intervals
//! are half-open, so back-to-back appointments are allowed.

use brain_core::{format_time_12h, weekday_name_es, Appointment, ClinicConfig, DayHours};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::ToolError;

/// Date format the tools accept and return.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Time format the tools return.
pub const TIME_FORMAT: &str = "%H:%M";

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate, ToolError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        ToolError::InvalidArguments(format!(
            "fecha '{}' inválida, usa el formato AAAA-MM-DD",
            value
        ))
    })
}

/// Parse a time of day.
///
/// Accepts `14:30`, `14:30:00` and `2:30 PM`.
pub fn parse_time(value: &str) -> Result<NaiveTime, ToolError> {
    let value = value.trim();
    let upper = value.to_uppercase();
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .or_else(|_| NaiveTime::parse_from_str(&upper, "%I:%M %p"))
        .map_err(|_| {
            ToolError::InvalidArguments(format!("hora '{}' inválida, usa el formato HH:MM", value))
        })
}

/// Check that `[start, end)` can be booked.
///
/// `exclude_id` skips one appointment during the conflict check, which is
/// how a reschedule avoids colliding with itself.
pub fn validate_slot(
    clinic: &ClinicConfig,
    now: NaiveDateTime,
    start: NaiveDateTime,
    end: NaiveDateTime,
    existing: &[Appointment],
    exclude_id: Option<i64>,
) -> Result<(), ToolError> {
    if start <= now {
        return Err(ToolError::Rejected(
            "No se pueden agendar citas en una fecha u hora que ya pasó.".to_string(),
        ));
    }

    let date = start.date();
    let hours = clinic.hours_on(date);
    match hours {
        DayHours::Closed => {
            return Err(ToolError::Rejected(format!(
                "La clínica está cerrada el {} {}.",
                weekday_name_es(date.weekday()),
                date.format(DATE_FORMAT)
            )));
        }
        DayHours::Open { open, close } => {
            if end.date() != date || !hours.contains(start.time(), end.time()) {
                return Err(ToolError::Rejected(format!(
                    "Fuera del horario de atención. El {} atendemos de {} a {} y la cita debe terminar antes del cierre.",
                    weekday_name_es(date.weekday()),
                    format_time_12h(open),
                    format_time_12h(close)
                )));
            }
        }
    }

    let conflict = existing
        .iter()
        .filter(|appointment| Some(appointment.id) != exclude_id)
        .filter(|appointment| appointment.status.blocks_calendar())
        .any(|appointment| appointment.overlaps(start, end));

    if conflict {
        return Err(ToolError::Rejected(
            "Ese horario ya está ocupado. Consulta get_available_slots para ofrecer otro."
                .to_string(),
        ));
    }

    Ok(())
}

/// Free start times on `date` for an appointment of `duration`.
///
/// Candidates start at opening time and advance by the duration, so
/// consecutive slots are adjacent. Past and conflicting candidates are
/// skipped.
pub fn available_slots(
    clinic: &ClinicConfig,
    date: NaiveDate,
    duration: Duration,
    now: NaiveDateTime,
    existing: &[Appointment],
) -> Vec<NaiveTime> {
    let (open, close) = match clinic.hours_on(date) {
        DayHours::Closed => return Vec::new(),
        DayHours::Open { open, close } => (open, close),
    };

    if duration <= Duration::zero() {
        return Vec::new();
    }

    let day_end = date.and_time(close);
    let mut slots = Vec::new();
    let mut start = date.and_time(open);

    while start + duration <= day_end {
        let end = start + duration;
        if validate_slot(clinic, now, start, end, existing, None).is_ok() {
            slots.push(start.time());
        }
        start = end;
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, clinic_config};
    use brain_core::AppointmentStatus;

    fn appointment(id: i64, start: NaiveDateTime, minutes: i64, status: AppointmentStatus) -> Appointment {
        Appointment {
            id,
            tenant_id: 1,
            contact_id: 7,
            service_id: 1,
            service_title: "Limpieza".to_string(),
            starts_at: start,
            ends_at: start + Duration::minutes(minutes),
            status,
        }
    }

    // 2026-03-02 is a Monday; "now" is the previous Friday.
    fn now() -> NaiveDateTime {
        at(2026, 2, 27, 12, 0)
    }

    #[test]
    fn test_parse_time_formats() {
        let expected = NaiveTime::from_hms_opt(14, 30, 0).unwrap();
        assert_eq!(parse_time("14:30").unwrap(), expected);
        assert_eq!(parse_time("14:30:00").unwrap(), expected);
        assert_eq!(parse_time("2:30 pm").unwrap(), expected);
        assert!(parse_time("media tarde").is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2026-03-02").unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
        );
        assert!(matches!(
            parse_date("02/03/2026"),
            Err(ToolError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_adjacent_slots_allowed() {
        let clinic = clinic_config();
        let existing = vec![appointment(1, at(2026, 3, 2, 10, 0), 30, AppointmentStatus::Scheduled)];

        assert!(validate_slot(&clinic, now(), at(2026, 3, 2, 10, 30), at(2026, 3, 2, 11, 0), &existing, None).is_ok());
        assert!(validate_slot(&clinic, now(), at(2026, 3, 2, 9, 30), at(2026, 3, 2, 10, 0), &existing, None).is_ok());
        assert!(validate_slot(&clinic, now(), at(2026, 3, 2, 10, 15), at(2026, 3, 2, 10, 45), &existing, None).is_err());
    }

    #[test]
    fn test_cancelled_does_not_block() {
        let clinic = clinic_config();
        let existing = vec![appointment(1, at(2026, 3, 2, 10, 0), 30, AppointmentStatus::Cancelled)];
        assert!(validate_slot(&clinic, now(), at(2026, 3, 2, 10, 0), at(2026, 3, 2, 10, 30), &existing, None).is_ok());
    }

    #[test]
    fn test_excluded_appointment_ignored() {
        let clinic = clinic_config();
        let existing = vec![appointment(5, at(2026, 3, 2, 10, 0), 60, AppointmentStatus::Confirmed)];
        assert!(validate_slot(&clinic, now(), at(2026, 3, 2, 10, 30), at(2026, 3, 2, 11, 30), &existing, Some(5)).is_ok());
        assert!(validate_slot(&clinic, now(), at(2026, 3, 2, 10, 30), at(2026, 3, 2, 11, 30), &existing, Some(6)).is_err());
    }

    #[test]
    fn test_outside_hours_rejected() {
        let clinic = clinic_config();
        // Ends after the 18:00 close.
        let err = validate_slot(&clinic, now(), at(2026, 3, 2, 17, 30), at(2026, 3, 2, 18, 30), &[], None).unwrap_err();
        assert!(err.user_message().contains("6:00 PM"));
        // Sunday is closed.
        let err = validate_slot(&clinic, now(), at(2026, 3, 1, 10, 0), at(2026, 3, 1, 10, 30), &[], None).unwrap_err();
        assert!(err.user_message().contains("domingo"));
    }

    #[test]
    fn test_past_rejected() {
        let clinic = clinic_config();
        let err = validate_slot(&clinic, now(), at(2026, 2, 27, 11, 0), at(2026, 2, 27, 11, 30), &[], None).unwrap_err();
        assert!(matches!(err, ToolError::Rejected(_)));
    }

    #[test]
    fn test_available_slots_steps_by_duration() {
        let clinic = clinic_config();
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap(); // Saturday 9:00-14:00
        let existing = vec![appointment(1, at(2026, 3, 7, 10, 30), 90, AppointmentStatus::Scheduled)];

        let slots = available_slots(&clinic, date, Duration::minutes(90), now(), &existing);
        let rendered: Vec<String> = slots.iter().map(|t| t.format(TIME_FORMAT).to_string()).collect();
        // 9:00 fits before the booking, 10:30 is taken, 12:00-13:30 fits, 13:30 would overrun.
        assert_eq!(rendered, vec!["09:00", "12:00"]);
    }

    #[test]
    fn test_available_slots_closed_and_today() {
        let clinic = clinic_config();
        let sunday = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert!(available_slots(&clinic, sunday, Duration::minutes(30), now(), &[]).is_empty());

        // Friday at noon: morning slots are gone.
        let friday = now().date();
        let slots = available_slots(&clinic, friday, Duration::minutes(60), now(), &[]);
        assert_eq!(slots.first(), Some(&NaiveTime::from_hms_opt(13, 0, 0).unwrap()));
        assert_eq!(slots.len(), 5);
    }
}
