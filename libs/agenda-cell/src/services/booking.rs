// libs/agenda-cell/src/services/booking.rs
use std::sync::Arc;

use reqwest::Method;
use serde_json::json;
use tracing::{info, warn};

use shared_api::{ApiClient, ApiError};

use crate::models::{Appointment, CandidateSelection, SubmissionError};

/// Writes bookings to the backend. Callers are expected to have run the
/// resolver's `validate` first; the server re-validates authoritatively and
/// may still reject.
pub struct BookingService {
    api: Arc<ApiClient>,
}

impl BookingService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Create a new appointment from a locally validated selection.
    pub async fn book(
        &self,
        selection: &CandidateSelection,
        patient_id: i64,
        specialist_id: i64,
        specialty_id: i64,
    ) -> Result<Appointment, SubmissionError> {
        info!(
            "Booking appointment for patient {} with specialist {} on {} at {}",
            patient_id, specialist_id, selection.date, selection.start
        );

        let appointment: Appointment = self
            .api
            .request(
                Method::POST,
                "/appointments",
                Some(booking_payload(selection, patient_id, specialist_id, specialty_id)),
            )
            .await
            .map_err(map_submission_error)?;

        info!("Appointment {} booked successfully", appointment.id);
        Ok(appointment)
    }

    /// Move an existing appointment to a new date/time. The carve-out for the
    /// hours the appointment still occupies is the resolver's concern; by the
    /// time this is called the selection is already validated against it.
    pub async fn reschedule(
        &self,
        appointment_id: i64,
        selection: &CandidateSelection,
        patient_id: i64,
        specialist_id: i64,
        specialty_id: i64,
    ) -> Result<Appointment, SubmissionError> {
        info!(
            "Rescheduling appointment {} to {} at {}",
            appointment_id, selection.date, selection.start
        );

        let path = format!("/appointments/{}/reschedule", appointment_id);
        let appointment: Appointment = self
            .api
            .request(
                Method::PUT,
                &path,
                Some(booking_payload(selection, patient_id, specialist_id, specialty_id)),
            )
            .await
            .map_err(map_submission_error)?;

        info!("Appointment {} rescheduled successfully", appointment.id);
        Ok(appointment)
    }
}

fn booking_payload(
    selection: &CandidateSelection,
    patient_id: i64,
    specialist_id: i64,
    specialty_id: i64,
) -> serde_json::Value {
    json!({
        "patientId": patient_id,
        "specialistId": specialist_id,
        "specialtyId": specialty_id,
        "date": selection.date,
        "startHour": selection.start.to_string(),
        "durationMinutes": selection.duration_hours as i64 * 60,
    })
}

fn map_submission_error(err: ApiError) -> SubmissionError {
    if err.is_rejection() {
        // The backend's message is the authoritative error; pass it through
        // unmodified.
        warn!("Booking rejected by backend: {}", err);
        SubmissionError::Rejected(err.to_string())
    } else {
        SubmissionError::Transport(err.to_string())
    }
}
