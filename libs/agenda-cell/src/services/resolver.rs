// libs/agenda-cell/src/services/resolver.rs
//
// Pure slot and duration arithmetic for the booking grid. Everything here
// operates on already-fetched data; no I/O, no clock reads, no state.

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::{
    CandidateSelection, FreeSlotSet, ReservationRange, TimeSlot, ValidationError,
    MAX_DURATION_HOURS,
};

/// The single free-or-mine predicate shared by selectability, duration and
/// validation. An hour passes when the backend reports it free, or when it is
/// covered by the reservation being moved on the same calendar date; the
/// backend keeps counting those hours as occupied until the move commits.
fn free_or_held(
    slot: TimeSlot,
    date: NaiveDate,
    free: &FreeSlotSet,
    reservation: Option<&ReservationRange>,
) -> bool {
    free.contains(slot) || reservation.is_some_and(|held| held.covers(date, slot.hour()))
}

/// Whether an hour button can be offered to the user: free-or-mine, and the
/// slot's start instant has not already passed.
pub fn is_selectable(
    slot: TimeSlot,
    free: &FreeSlotSet,
    reservation: Option<&ReservationRange>,
    now: NaiveDateTime,
    candidate_date: NaiveDate,
) -> bool {
    free_or_held(slot, candidate_date, free, reservation)
        && slot.start_instant(candidate_date) >= now
}

/// Longest duration purchasable from a selectable start hour: walk forward
/// while each subsequent hour stays free-or-mine, stopping at the containing
/// shift's end or at the 4-hour cap. The start hour itself always counts, so
/// the result is in 1..=MAX_DURATION_HOURS.
pub fn max_duration(
    start: TimeSlot,
    free: &FreeSlotSet,
    reservation: Option<&ReservationRange>,
    candidate_date: NaiveDate,
) -> u8 {
    let shift_end = start.shift().end_hour();
    let mut duration = 1u8;

    while duration < MAX_DURATION_HOURS {
        let next_hour = start.hour() + duration;
        if next_hour >= shift_end {
            break;
        }
        let Some(next) = TimeSlot::new(next_hour) else {
            break;
        };
        if !free_or_held(next, candidate_date, free, reservation) {
            break;
        }
        duration += 1;
    }

    duration
}

/// Last client-side defense before submission: re-check every hour of the
/// span, scanning in increasing hour order so the first conflict reported is
/// deterministic. Availability may have changed since the grid was rendered;
/// the server still re-validates authoritatively after this passes.
pub fn validate(
    selection: &CandidateSelection,
    free: &FreeSlotSet,
    reservation: Option<&ReservationRange>,
    now: NaiveDateTime,
) -> Result<(), ValidationError> {
    if selection.duration_hours == 0 || selection.duration_hours > MAX_DURATION_HOURS {
        return Err(ValidationError::InvalidDuration {
            hours: selection.duration_hours,
        });
    }

    for hour in selection.hours() {
        let Some(slot) = TimeSlot::new(hour) else {
            // Hours outside the grid (lunch, past end of day) read as
            // unavailable, citing the offending hour.
            return Err(ValidationError::SlotNoLongerAvailable { hour });
        };
        if !free_or_held(slot, selection.date, free, reservation) {
            return Err(ValidationError::SlotNoLongerAvailable { hour });
        }
        if slot.start_instant(selection.date) < now {
            return Err(ValidationError::SlotInPast { hour });
        }
    }

    Ok(())
}
