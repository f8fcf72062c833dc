// libs/agenda-cell/src/services/appointments.rs
use std::sync::Arc;

use reqwest::Method;
use tracing::{debug, info};

use shared_api::{ApiClient, ApiError};

use crate::models::{AgendaError, Appointment, AppointmentStatus, Page, StatusMessage};

/// The calendar/table side of the dashboard: reading appointments and moving
/// them through their lifecycle (cancel, attend, no-show).
pub struct AppointmentService {
    api: Arc<ApiClient>,
}

impl AppointmentService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn get(&self, appointment_id: i64) -> Result<Appointment, AgendaError> {
        debug!("Fetching appointment {}", appointment_id);

        let path = format!("/appointments/{}", appointment_id);
        self.api
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| map_agenda_error(e, appointment_id))
    }

    /// One page of a specialty's appointments, newest-first as the backend
    /// orders them.
    pub async fn list_by_specialty(
        &self,
        specialty_id: i64,
        page: i64,
        size: i64,
    ) -> Result<Page<Appointment>, AgendaError> {
        debug!("Listing appointments for specialty {} (page {}, size {})", specialty_id, page, size);

        let path = format!(
            "/appointments/specialty/{}?page={}&size={}",
            specialty_id, page, size
        );
        self.api
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| map_agenda_error(e, specialty_id))
    }

    /// The calendar feed: one page of a specialty's appointments with
    /// cancelled entries filtered out, the way the calendar renders them.
    pub async fn calendar_feed(
        &self,
        specialty_id: i64,
        page: i64,
        size: i64,
    ) -> Result<Vec<Appointment>, AgendaError> {
        let listing = self.list_by_specialty(specialty_id, page, size).await?;
        Ok(listing
            .content
            .into_iter()
            .filter(|appointment| appointment.status != AppointmentStatus::Cancelled)
            .collect())
    }

    pub async fn cancel(&self, appointment_id: i64) -> Result<String, AgendaError> {
        self.change_status(appointment_id, "cancel").await
    }

    /// Mark the appointment as attended.
    pub async fn finalize(&self, appointment_id: i64) -> Result<String, AgendaError> {
        self.change_status(appointment_id, "finalize").await
    }

    /// Mark the patient as absent without justification.
    pub async fn mark_missed(&self, appointment_id: i64) -> Result<String, AgendaError> {
        self.change_status(appointment_id, "no-show").await
    }

    async fn change_status(&self, appointment_id: i64, action: &str) -> Result<String, AgendaError> {
        info!("Appointment {} -> {}", appointment_id, action);

        let path = format!("/appointments/{}/{}", appointment_id, action);
        let response: StatusMessage = self
            .api
            .request(Method::PATCH, &path, None)
            .await
            .map_err(|e| map_agenda_error(e, appointment_id))?;

        Ok(response.message)
    }
}

fn map_agenda_error(err: ApiError, entity_id: i64) -> AgendaError {
    if err.is_not_found() {
        AgendaError::NotFound(entity_id)
    } else if err.is_rejection() {
        AgendaError::Rejected(err.to_string())
    } else {
        AgendaError::Transport(err.to_string())
    }
}
