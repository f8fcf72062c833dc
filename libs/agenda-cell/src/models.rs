// libs/agenda-cell/src/models.rs
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ==============================================================================
// TIME GRID
// ==============================================================================

/// Business hours run 08:00-17:00 with a fixed lunch break at 12:00.
pub const MORNING_START: u8 = 8;
pub const MORNING_END: u8 = 12;
pub const AFTERNOON_START: u8 = 13;
pub const AFTERNOON_END: u8 = 17;

/// Longest appointment the booking grid offers.
pub const MAX_DURATION_HOURS: u8 = 4;

/// An hour-aligned start point within one business day. Construction is
/// validated: hours outside the two shifts (including 12:00) do not exist as
/// slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeSlot(u8);

impl TimeSlot {
    pub fn new(hour: u8) -> Option<Self> {
        if Self::is_bookable_hour(hour) {
            Some(Self(hour))
        } else {
            None
        }
    }

    pub fn is_bookable_hour(hour: u8) -> bool {
        (MORNING_START..MORNING_END).contains(&hour)
            || (AFTERNOON_START..AFTERNOON_END).contains(&hour)
    }

    /// Parse the backend's `"HH:MM"` hour strings. Entries that are not
    /// hour-aligned or fall outside the business grid yield `None`.
    pub fn from_hour_string(raw: &str) -> Option<Self> {
        let mut parts = raw.trim().split(':');
        let hour: u8 = parts.next()?.parse().ok()?;
        let minute: u8 = parts.next()?.parse().ok()?;
        if minute != 0 {
            return None;
        }
        Self::new(hour)
    }

    pub fn hour(&self) -> u8 {
        self.0
    }

    pub fn shift(&self) -> Shift {
        if self.0 < MORNING_END {
            Shift::Morning
        } else {
            Shift::Afternoon
        }
    }

    /// The wall-clock instant this slot begins on the given date, in the
    /// clinic's business timezone.
    pub fn start_instant(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_hms_opt(self.0 as u32, 0, 0).unwrap()
    }

    /// Every slot of the day in ascending order, for rendering the grid.
    pub fn day_grid() -> impl Iterator<Item = TimeSlot> {
        (MORNING_START..MORNING_END)
            .chain(AFTERNOON_START..AFTERNOON_END)
            .map(TimeSlot)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Morning,
    Afternoon,
}

impl Shift {
    pub fn start_hour(&self) -> u8 {
        match self {
            Shift::Morning => MORNING_START,
            Shift::Afternoon => AFTERNOON_START,
        }
    }

    /// Exclusive end of the shift: no appointment may run past it.
    pub fn end_hour(&self) -> u8 {
        match self {
            Shift::Morning => MORNING_END,
            Shift::Afternoon => AFTERNOON_END,
        }
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shift::Morning => write!(f, "morning"),
            Shift::Afternoon => write!(f, "afternoon"),
        }
    }
}

// ==============================================================================
// AVAILABILITY MODELS
// ==============================================================================

/// The hours the backend reports unoccupied for one (specialist, date) pair.
/// Immutable once built; superseded wholesale by the next fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreeSlotSet {
    hours: BTreeSet<u8>,
}

impl FreeSlotSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_slots(slots: impl IntoIterator<Item = TimeSlot>) -> Self {
        Self {
            hours: slots.into_iter().map(|slot| slot.hour()).collect(),
        }
    }

    pub fn contains(&self, slot: TimeSlot) -> bool {
        self.hours.contains(&slot.hour())
    }

    pub fn len(&self) -> usize {
        self.hours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = TimeSlot> + '_ {
        self.hours.iter().copied().map(TimeSlot)
    }
}

/// The hour span still occupied by the appointment being rescheduled. The
/// backend keeps counting those hours as booked until the move commits, but
/// they belong to the current user and must stay pickable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRange {
    pub date: NaiveDate,
    pub start: TimeSlot,
    pub duration_hours: u8,
}

impl ReservationRange {
    pub fn new(date: NaiveDate, start: TimeSlot, duration_hours: u8) -> Self {
        Self {
            date,
            start,
            duration_hours,
        }
    }

    /// Whether the half-open range [start, start + duration) covers the hour
    /// on the given date.
    pub fn covers(&self, date: NaiveDate, hour: u8) -> bool {
        self.date == date
            && hour >= self.start.hour()
            && hour < self.start.hour() + self.duration_hours
    }
}

/// The in-progress user choice, consumed exactly once on submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSelection {
    pub date: NaiveDate,
    pub start: TimeSlot,
    pub duration_hours: u8,
}

impl CandidateSelection {
    pub fn new(date: NaiveDate, start: TimeSlot, duration_hours: u8) -> Self {
        Self {
            date,
            start,
            duration_hours,
        }
    }

    pub fn end_hour(&self) -> u8 {
        self.start.hour() + self.duration_hours
    }

    /// The hours the appointment would occupy, ascending.
    pub fn hours(&self) -> impl Iterator<Item = u8> {
        self.start.hour()..self.end_hour()
    }
}

// ==============================================================================
// WIRE MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Pending,
    Attended,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// Only pending appointments occupy hours on the calendar.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Pending)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "PENDING"),
            AppointmentStatus::Attended => write!(f, "ATTENDED"),
            AppointmentStatus::Cancelled => write!(f, "CANCELLED"),
            AppointmentStatus::NoShow => write!(f, "NO_SHOW"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub id: i64,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialistSummary {
    pub id: i64,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialtySummary {
    pub id: i64,
    pub area: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: i64,
    pub date: NaiveDate,
    pub start_hour: String,
    pub end_hour: String,
    pub status: AppointmentStatus,
    pub patient: PatientSummary,
    pub specialist: SpecialistSummary,
    pub specialty: SpecialtySummary,
}

impl Appointment {
    pub fn start_slot(&self) -> Option<TimeSlot> {
        TimeSlot::from_hour_string(&self.start_hour)
    }

    /// Whole hours between start and end, as reported by the backend.
    pub fn duration_hours(&self) -> Option<u8> {
        let start = hour_of(&self.start_hour)?;
        let end = hour_of(&self.end_hour)?;
        end.checked_sub(start).filter(|hours| *hours > 0)
    }

    /// The hour span this appointment occupies, used as the rescheduling
    /// carve-out.
    pub fn reservation_range(&self) -> Option<ReservationRange> {
        let start = self.start_slot()?;
        let duration_hours = self.duration_hours()?;
        Some(ReservationRange::new(self.date, start, duration_hours))
    }
}

fn hour_of(raw: &str) -> Option<u8> {
    raw.trim().split(':').next()?.parse().ok()
}

/// Pagination envelope returned by the list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: i64,
    pub total_pages: i64,
    pub number: i64,
    pub size: i64,
}

/// Body of the status-change endpoints (cancel, finalize, no-show).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusMessage {
    pub message: String,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

/// Availability could not be read. Callers must treat this as "no information
/// yet", never as an empty free set, which would block all booking.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("availability lookup failed: {0}")]
    Transient(String),
}

/// Local pre-submit failures. Reported inline; submission is blocked until the
/// user corrects the selection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("no start hour selected")]
    EmptySelection,

    #[error("availability has not been loaded yet")]
    AvailabilityUnknown,

    #[error("appointments run between 1 and 4 hours, got {hours}")]
    InvalidDuration { hours: u8 },

    #[error("{hour:02}:00 is no longer available")]
    SlotNoLongerAvailable { hour: u8 },

    #[error("{hour:02}:00 has already passed")]
    SlotInPast { hour: u8 },
}

/// The server refused a booking, or the request never got there. `Rejected`
/// carries the backend's message verbatim; it is the authoritative error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SubmissionError {
    #[error("{0}")]
    Rejected(String),

    #[error("booking service unreachable: {0}")]
    Transport(String),
}

/// Failures of the non-booking appointment operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AgendaError {
    #[error("appointment {0} not found")]
    NotFound(i64),

    #[error("{0}")]
    Rejected(String),

    #[error("agenda service unreachable: {0}")]
    Transport(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lunch_and_out_of_range_hours_are_not_slots() {
        assert!(TimeSlot::new(8).is_some());
        assert!(TimeSlot::new(11).is_some());
        assert!(TimeSlot::new(13).is_some());
        assert!(TimeSlot::new(16).is_some());

        assert!(TimeSlot::new(7).is_none());
        assert!(TimeSlot::new(12).is_none());
        assert!(TimeSlot::new(17).is_none());
        assert!(TimeSlot::new(20).is_none());
    }

    #[test]
    fn hour_strings_must_be_hour_aligned() {
        assert_eq!(TimeSlot::from_hour_string("08:00").map(|s| s.hour()), Some(8));
        assert_eq!(TimeSlot::from_hour_string("16:00").map(|s| s.hour()), Some(16));
        assert!(TimeSlot::from_hour_string("08:30").is_none());
        assert!(TimeSlot::from_hour_string("12:00").is_none());
        assert!(TimeSlot::from_hour_string("garbage").is_none());
    }

    #[test]
    fn day_grid_skips_lunch() {
        let hours: Vec<u8> = TimeSlot::day_grid().map(|s| s.hour()).collect();
        assert_eq!(hours, vec![8, 9, 10, 11, 13, 14, 15, 16]);
    }

    #[test]
    fn reservation_covers_only_its_own_date_and_hours() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let other = NaiveDate::from_ymd_opt(2024, 6, 11).unwrap();
        let range = ReservationRange::new(date, TimeSlot::new(9).unwrap(), 2);

        assert!(range.covers(date, 9));
        assert!(range.covers(date, 10));
        assert!(!range.covers(date, 11));
        assert!(!range.covers(date, 8));
        assert!(!range.covers(other, 9));
    }

    #[test]
    fn appointment_reservation_range_from_wire_hours() {
        let appointment = Appointment {
            id: 41,
            date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            start_hour: "09:00".to_string(),
            end_hour: "11:00".to_string(),
            status: AppointmentStatus::Pending,
            patient: PatientSummary { id: 1, full_name: "Ana Calle".to_string() },
            specialist: SpecialistSummary { id: 2, full_name: "Marco Torres".to_string() },
            specialty: SpecialtySummary { id: 3, area: "Psicologia Clinica".to_string() },
        };

        let range = appointment.reservation_range().unwrap();
        assert_eq!(range.start.hour(), 9);
        assert_eq!(range.duration_hours, 2);
    }

    #[test]
    fn status_round_trips_screaming_snake_case() {
        let json = serde_json::to_string(&AppointmentStatus::NoShow).unwrap();
        assert_eq!(json, "\"NO_SHOW\"");
        let back: AppointmentStatus = serde_json::from_str("\"CANCELLED\"").unwrap();
        assert_eq!(back, AppointmentStatus::Cancelled);
    }
}
