// libs/agenda-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::Method;
use tracing::{debug, warn};

use shared_api::ApiClient;

use crate::models::{FetchError, FreeSlotSet, TimeSlot};

/// Read-only view of a specialist's free hours. The backend owns the
/// computation; this service only fetches and parses.
pub struct AvailabilityService {
    api: Arc<ApiClient>,
}

impl AvailabilityService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Fetch the free hours for one (specialist, date) pair. Any failure is
    /// transient: the caller must treat it as "no information yet", never as
    /// "no slots free".
    pub async fn fetch_free_slots(
        &self,
        specialist_id: i64,
        date: NaiveDate,
    ) -> Result<FreeSlotSet, FetchError> {
        debug!("Fetching free hours for specialist {} on {}", specialist_id, date);

        let path = format!("/appointments/free-hours/{}?date={}", specialist_id, date);
        let raw: Vec<String> = self
            .api
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        let mut slots = Vec::with_capacity(raw.len());
        for entry in &raw {
            match TimeSlot::from_hour_string(entry) {
                Some(slot) => slots.push(slot),
                None => warn!(
                    "Ignoring unrecognized free hour {:?} for specialist {}",
                    entry, specialist_id
                ),
            }
        }

        debug!(
            "Specialist {} has {} free hours on {}",
            specialist_id,
            slots.len(),
            date
        );

        Ok(FreeSlotSet::from_slots(slots))
    }
}
