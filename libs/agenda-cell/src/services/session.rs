// libs/agenda-cell/src/services/session.rs
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    CandidateSelection, FetchError, FreeSlotSet, ReservationRange, TimeSlot, ValidationError,
};
use crate::services::resolver;

/// Where the booking flow currently stands. The session owns this explicitly
/// so the UI never has to reconstruct it from loose flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    NoSpecialist,
    SpecialistChosen,
    /// Specialist and date are set; a fetch may be in flight or may have
    /// failed. Either way there is no availability information yet.
    DateChosen,
    SlotsLoaded,
    StartChosen,
    DurationChosen,
    Submitting,
    Succeeded,
    Rejected,
}

/// Identifies one availability request. Responses are only honored when their
/// token is still the session's latest; anything older is dropped on arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchToken {
    id: Uuid,
    pub specialist_id: i64,
    pub date: NaiveDate,
}

impl FetchToken {
    fn mint(specialist_id: i64, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            specialist_id,
            date,
        }
    }
}

/// One booking (or rescheduling) interaction, from opening the grid to a
/// confirmed or rejected submission. All I/O stays with the caller: the
/// session hands out fetch tokens and consumes the responses.
#[derive(Debug, Clone)]
pub struct BookingSession {
    phase: SessionPhase,
    specialist_id: Option<i64>,
    date: Option<NaiveDate>,
    /// `None` means "no information yet", distinct from an empty set, which
    /// means "fully booked". A failed fetch must never collapse into the
    /// latter.
    free: Option<FreeSlotSet>,
    start: Option<TimeSlot>,
    duration_hours: Option<u8>,
    reservation: Option<ReservationRange>,
    pending_fetch: Option<FetchToken>,
    rejection_message: Option<String>,
    confirmed_appointment_id: Option<i64>,
}

impl BookingSession {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::NoSpecialist,
            specialist_id: None,
            date: None,
            free: None,
            start: None,
            duration_hours: None,
            reservation: None,
            pending_fetch: None,
            rejection_message: None,
            confirmed_appointment_id: None,
        }
    }

    /// A session that moves an existing appointment: the hours it still
    /// occupies stay pickable on its original date.
    pub fn for_reschedule(reservation: ReservationRange) -> Self {
        let mut session = Self::new();
        session.reservation = Some(reservation);
        session
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn specialist_id(&self) -> Option<i64> {
        self.specialist_id
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn free_slots(&self) -> Option<&FreeSlotSet> {
        self.free.as_ref()
    }

    pub fn reservation(&self) -> Option<&ReservationRange> {
        self.reservation.as_ref()
    }

    pub fn is_fetch_in_flight(&self) -> bool {
        self.pending_fetch.is_some()
    }

    pub fn rejection_message(&self) -> Option<&str> {
        self.rejection_message.as_deref()
    }

    pub fn confirmed_appointment_id(&self) -> Option<i64> {
        self.confirmed_appointment_id
    }

    /// Change the specialist. Everything downstream of the choice is
    /// discarded; if a date is already set, a fresh fetch token is minted.
    pub fn choose_specialist(&mut self, specialist_id: i64) -> Option<FetchToken> {
        debug!("Specialist changed to {}", specialist_id);
        self.specialist_id = Some(specialist_id);
        self.discard_downstream();
        self.refresh_token()
    }

    /// Change the date. Same discard-and-refetch discipline as the
    /// specialist.
    pub fn choose_date(&mut self, date: NaiveDate) -> Option<FetchToken> {
        debug!("Date changed to {}", date);
        self.date = Some(date);
        self.discard_downstream();
        self.refresh_token()
    }

    /// Apply a fetched free set. Returns false when the response belonged to
    /// a superseded request and was dropped.
    pub fn slots_loaded(&mut self, token: &FetchToken, slots: FreeSlotSet) -> bool {
        if self.pending_fetch.as_ref() != Some(token) {
            debug!(
                "Discarding stale availability response for specialist {} on {}",
                token.specialist_id, token.date
            );
            return false;
        }

        debug!(
            "Loaded {} free hours for specialist {} on {}",
            slots.len(),
            token.specialist_id,
            token.date
        );
        self.pending_fetch = None;
        self.free = Some(slots);
        self.recompute_selection_phase();
        true
    }

    /// Record a failed fetch. Stale failures are dropped like stale
    /// successes; a current one leaves the session without availability
    /// information so the caller can retry.
    pub fn fetch_failed(&mut self, token: &FetchToken, err: &FetchError) -> bool {
        if self.pending_fetch.as_ref() != Some(token) {
            debug!("Discarding stale availability failure for {}", token.date);
            return false;
        }

        warn!("Availability fetch failed: {}", err);
        self.pending_fetch = None;
        self.free = None;
        self.phase = SessionPhase::DateChosen;
        true
    }

    /// Mint a new token for the current (specialist, date) pair, superseding
    /// any outstanding request. Used by the caller to retry after a failure
    /// or to force a refresh.
    pub fn retry_fetch(&mut self) -> Option<FetchToken> {
        self.refresh_token()
    }

    /// The hours the grid should offer right now.
    pub fn selectable_hours(&self, now: NaiveDateTime) -> Vec<TimeSlot> {
        let (Some(free), Some(date)) = (self.free.as_ref(), self.date) else {
            return Vec::new();
        };
        TimeSlot::day_grid()
            .filter(|slot| resolver::is_selectable(*slot, free, self.reservation.as_ref(), now, date))
            .collect()
    }

    /// Longest duration offered from a start hour, or `None` while the hour
    /// itself is not selectable.
    pub fn max_duration_from(&self, start: TimeSlot, now: NaiveDateTime) -> Option<u8> {
        let (free, date) = (self.free.as_ref()?, self.date?);
        if !resolver::is_selectable(start, free, self.reservation.as_ref(), now, date) {
            return None;
        }
        Some(resolver::max_duration(start, free, self.reservation.as_ref(), date))
    }

    /// Pick a start hour. Validated eagerly (as a one-hour candidate) so the
    /// UI can reject the click in place with the same error the final check
    /// would produce.
    pub fn choose_start(&mut self, start: TimeSlot, now: NaiveDateTime) -> Result<(), ValidationError> {
        let Some(free) = self.free.as_ref() else {
            return Err(ValidationError::AvailabilityUnknown);
        };
        let Some(date) = self.date else {
            return Err(ValidationError::AvailabilityUnknown);
        };

        let candidate = CandidateSelection::new(date, start, 1);
        resolver::validate(&candidate, free, self.reservation.as_ref(), now)?;

        self.start = Some(start);
        self.duration_hours = None;
        self.phase = SessionPhase::StartChosen;
        Ok(())
    }

    /// Pick a duration for the chosen start hour.
    pub fn choose_duration(&mut self, hours: u8, now: NaiveDateTime) -> Result<(), ValidationError> {
        let Some(start) = self.start else {
            return Err(ValidationError::EmptySelection);
        };
        let Some(free) = self.free.as_ref() else {
            return Err(ValidationError::AvailabilityUnknown);
        };
        let Some(date) = self.date else {
            return Err(ValidationError::AvailabilityUnknown);
        };

        let candidate = CandidateSelection::new(date, start, hours);
        resolver::validate(&candidate, free, self.reservation.as_ref(), now)?;

        self.duration_hours = Some(hours);
        self.phase = SessionPhase::DurationChosen;
        Ok(())
    }

    /// Final local check before the submitter is called. On success the
    /// session moves to `Submitting` and the returned selection is handed to
    /// the booking service.
    pub fn begin_submit(&mut self, now: NaiveDateTime) -> Result<CandidateSelection, ValidationError> {
        let Some(free) = self.free.as_ref() else {
            // Covers the post-rejection state too: availability was cleared
            // and must be re-read before another attempt.
            return Err(ValidationError::AvailabilityUnknown);
        };
        let (Some(date), Some(start)) = (self.date, self.start) else {
            return Err(ValidationError::EmptySelection);
        };
        let Some(duration_hours) = self.duration_hours else {
            return Err(ValidationError::EmptySelection);
        };

        let selection = CandidateSelection::new(date, start, duration_hours);
        resolver::validate(&selection, free, self.reservation.as_ref(), now)?;

        self.phase = SessionPhase::Submitting;
        Ok(selection)
    }

    /// The backend confirmed the booking; the selection is consumed.
    pub fn submission_succeeded(&mut self, appointment_id: i64) {
        info!("Booking session confirmed appointment {}", appointment_id);
        self.confirmed_appointment_id = Some(appointment_id);
        self.phase = SessionPhase::Succeeded;
        self.start = None;
        self.duration_hours = None;
        self.free = None;
        self.pending_fetch = None;
    }

    /// The backend rejected the booking. Selections are preserved, but the
    /// free set is cleared and a fresh fetch token minted: availability must
    /// be re-read before the user can try again.
    pub fn submission_rejected(&mut self, message: String) -> Option<FetchToken> {
        warn!("Booking session rejected: {}", message);
        self.rejection_message = Some(message);
        self.free = None;
        let token = self.mint_pending_token();
        self.phase = SessionPhase::Rejected;
        token
    }

    fn discard_downstream(&mut self) {
        self.free = None;
        self.start = None;
        self.duration_hours = None;
        self.pending_fetch = None;
        self.rejection_message = None;
    }

    fn refresh_token(&mut self) -> Option<FetchToken> {
        let token = self.mint_pending_token();
        self.phase = match (self.specialist_id, token.as_ref()) {
            (None, _) => SessionPhase::NoSpecialist,
            (Some(_), None) => SessionPhase::SpecialistChosen,
            (Some(_), Some(_)) => SessionPhase::DateChosen,
        };
        token
    }

    fn mint_pending_token(&mut self) -> Option<FetchToken> {
        match (self.specialist_id, self.date) {
            (Some(specialist_id), Some(date)) => {
                let token = FetchToken::mint(specialist_id, date);
                self.pending_fetch = Some(token.clone());
                Some(token)
            }
            _ => {
                self.pending_fetch = None;
                None
            }
        }
    }

    fn recompute_selection_phase(&mut self) {
        self.phase = if self.duration_hours.is_some() {
            SessionPhase::DurationChosen
        } else if self.start.is_some() {
            SessionPhase::StartChosen
        } else {
            SessionPhase::SlotsLoaded
        };
    }
}

impl Default for BookingSession {
    fn default() -> Self {
        Self::new()
    }
}
