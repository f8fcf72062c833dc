use chrono::{NaiveDate, NaiveDateTime};

use agenda_cell::models::{
    CandidateSelection, FreeSlotSet, ReservationRange, TimeSlot, ValidationError,
};
use agenda_cell::services::resolver::{is_selectable, max_duration, validate};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(day: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    day.and_hms_opt(hour, minute, 0).unwrap()
}

fn slot(hour: u8) -> TimeSlot {
    TimeSlot::new(hour).unwrap()
}

fn free(hours: &[u8]) -> FreeSlotSet {
    FreeSlotSet::from_slots(hours.iter().map(|h| slot(*h)))
}

fn candidate(day: NaiveDate, start: u8, hours: u8) -> CandidateSelection {
    CandidateSelection::new(day, slot(start), hours)
}

// Without a reservation, selectability is exactly free-set membership plus
// the past check.
#[test]
fn selectability_agrees_with_free_set_when_not_rescheduling() {
    let day = date(2024, 6, 10);
    let sets = [free(&[]), free(&[8]), free(&[8, 9, 10]), free(&[8, 9, 10, 11, 13, 14, 15, 16])];

    // Before the day starts nothing is in the past.
    let before_open = at(day, 7, 0);
    for set in &sets {
        for hour in TimeSlot::day_grid() {
            assert_eq!(
                is_selectable(hour, set, None, before_open, day),
                set.contains(hour),
                "hour {} against {:?}",
                hour,
                set
            );
        }
    }

    // Mid-afternoon, morning hours are gone regardless of membership.
    let mid_day = at(day, 13, 30);
    let everything = free(&[8, 9, 10, 11, 13, 14, 15, 16]);
    for hour in TimeSlot::day_grid() {
        let expected = hour.hour() >= 14;
        assert_eq!(is_selectable(hour, &everything, None, mid_day, day), expected);
    }
}

// Hours held by the reservation being moved stay pickable on its date even
// when the backend reports them occupied.
#[test]
fn reservation_carve_out_keeps_held_hours_pickable() {
    let day = date(2024, 6, 10);
    let held = ReservationRange::new(day, slot(9), 2);
    let now = at(day, 7, 0);

    assert!(is_selectable(slot(9), &free(&[]), Some(&held), now, day));
    assert!(is_selectable(slot(10), &free(&[]), Some(&held), now, day));
    assert!(!is_selectable(slot(11), &free(&[]), Some(&held), now, day));

    // The carve-out only applies on the reservation's own date.
    let other_day = date(2024, 6, 11);
    assert!(!is_selectable(slot(9), &free(&[]), Some(&held), now, other_day));

    // And it does not resurrect hours that have already passed.
    let later = at(day, 9, 30);
    assert!(!is_selectable(slot(9), &free(&[]), Some(&held), later, day));
    assert!(is_selectable(slot(10), &free(&[]), Some(&held), later, day));
}

#[test]
fn max_duration_caps_at_four_hours_and_shift_end() {
    let day = date(2024, 6, 10);
    let everything = free(&[8, 9, 10, 11, 13, 14, 15, 16]);

    assert_eq!(max_duration(slot(8), &everything, None, day), 4);
    assert_eq!(max_duration(slot(13), &everything, None, day), 4);

    // Shift boundaries win over the cap.
    assert_eq!(max_duration(slot(10), &everything, None, day), 2);
    assert_eq!(max_duration(slot(11), &everything, None, day), 1);
    assert_eq!(max_duration(slot(15), &everything, None, day), 2);
    assert_eq!(max_duration(slot(16), &everything, None, day), 1);
}

#[test]
fn max_duration_spans_exactly_the_selectable_run() {
    let day = date(2024, 6, 10);
    let gappy = free(&[8, 9, 11]);
    let now = at(day, 7, 0);

    let duration = max_duration(slot(8), &gappy, None, day);
    assert_eq!(duration, 2);

    // Every hour inside the run is selectable, the first one past it is not.
    for hour in 8..8 + duration {
        assert!(is_selectable(slot(hour), &gappy, None, now, day));
    }
    assert!(!is_selectable(slot(10), &gappy, None, now, day));
}

#[test]
fn validate_agrees_with_selectability_hour_by_hour() {
    let day = date(2024, 6, 10);
    let set = free(&[8, 9, 10, 13, 14]);
    let now = at(day, 7, 0);

    assert_eq!(validate(&candidate(day, 8, 3), &set, None, now), Ok(()));
    assert_eq!(validate(&candidate(day, 13, 2), &set, None, now), Ok(()));

    // First conflicting hour is reported, scanning ascending.
    assert_eq!(
        validate(&candidate(day, 9, 3), &set, None, now),
        Err(ValidationError::SlotNoLongerAvailable { hour: 11 })
    );
    assert_eq!(
        validate(&candidate(day, 14, 3), &set, None, now),
        Err(ValidationError::SlotNoLongerAvailable { hour: 15 })
    );
}

#[test]
fn validate_rejects_bad_durations() {
    let day = date(2024, 6, 10);
    let set = free(&[8, 9, 10, 11]);
    let now = at(day, 7, 0);

    assert_eq!(
        validate(&candidate(day, 8, 0), &set, None, now),
        Err(ValidationError::InvalidDuration { hours: 0 })
    );
    assert_eq!(
        validate(&candidate(day, 8, 5), &set, None, now),
        Err(ValidationError::InvalidDuration { hours: 5 })
    );
}

#[test]
fn validate_never_lets_a_span_cross_lunch() {
    let day = date(2024, 6, 10);
    // Even with both sides of the break free, 12:00 is never a slot.
    let set = free(&[11, 13]);
    let now = at(day, 7, 0);

    assert_eq!(
        validate(&candidate(day, 11, 2), &set, None, now),
        Err(ValidationError::SlotNoLongerAvailable { hour: 12 })
    );
}

// Scenario: three free morning hours, booking before the day opens.
#[test]
fn scenario_morning_run() {
    let day = date(2024, 6, 10);
    let set = free(&[8, 9, 10]);
    let now = at(day, 7, 0);

    assert_eq!(max_duration(slot(8), &set, None, day), 3);
    assert!(!is_selectable(slot(11), &set, None, now, day));
}

// Scenario: rescheduling a 09:00-11:00 appointment; the refetched free set
// only lists 08:00 because the backend still counts 09:00/10:00 as taken.
#[test]
fn scenario_rescheduling_own_appointment() {
    let day = date(2024, 6, 10);
    let set = free(&[8]);
    let held = ReservationRange::new(day, slot(9), 2);
    let now = at(day, 7, 0);

    assert!(is_selectable(slot(9), &set, Some(&held), now, day));
    assert!(is_selectable(slot(10), &set, Some(&held), now, day));
    assert_eq!(max_duration(slot(9), &set, Some(&held), day), 2);
    assert_eq!(max_duration(slot(8), &set, Some(&held), day), 3);
}

// Scenario: a two-hour request starting 16:00 runs past the end of the day;
// the first offending hour (17) is the one cited.
#[test]
fn scenario_span_past_end_of_day() {
    let day = date(2024, 6, 10);
    let set = free(&[16]);
    let now = at(day, 7, 0);

    assert_eq!(
        validate(&candidate(day, 16, 2), &set, None, now),
        Err(ValidationError::SlotNoLongerAvailable { hour: 17 })
    );
}

// Scenario: a slot whose start already elapsed is gone no matter what the
// free set says.
#[test]
fn scenario_elapsed_start_hour() {
    let day = date(2024, 6, 10);
    let set = free(&[14, 15]);
    let now = at(day, 14, 30);

    assert!(!is_selectable(slot(14), &set, None, now, day));
    assert!(is_selectable(slot(15), &set, None, now, day));
    assert_eq!(
        validate(&candidate(day, 14, 1), &set, None, now),
        Err(ValidationError::SlotInPast { hour: 14 })
    );

    // A slot starting exactly now has not yet passed.
    let on_the_hour = at(day, 15, 0);
    assert!(is_selectable(slot(15), &set, None, on_the_hour, day));
}
