// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_database::SupabaseClient;

use crate::models::{AppointmentStatus, ScheduledSlot};

/// Moves scheduled appointments whose end time has passed to `completed`.
pub struct AppointmentLifecycleService {
    supabase: Arc<SupabaseClient>,
}

impl AppointmentLifecycleService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Completes every past-due scheduled appointment and returns how many were updated.
    /// Never fails: store errors are logged and the sweep stops or skips the row.
    pub async fn auto_complete_past_due(&self, now: DateTime<Utc>) -> usize {
        let path = "/rest/v1/appointments?status=eq.scheduled&select=id,appointment_date,duration_minutes";

        let slots: Vec<ScheduledSlot> = match self
            .supabase
            .request(Method::GET, path, None, None)
            .await
        {
            Ok(slots) => slots,
            Err(e) => {
                warn!("Auto-complete sweep could not read appointments: {}", e);
                return 0;
            }
        };

        let mut completed = 0;
        for slot in slots.iter().filter(|s| is_past_due(s, now)) {
            // The status filter keeps a concurrent sweep or edit from being overwritten.
            let path = format!(
                "/rest/v1/appointments?id=eq.{}&status=eq.scheduled&select=id",
                slot.id
            );
            let body = json!({
                "status": AppointmentStatus::Completed,
                "updated_at": now,
            });

            match self
                .supabase
                .mutate_returning::<Value>(Method::PATCH, &path, body)
                .await
            {
                Ok(rows) if rows.is_empty() => {
                    debug!("Appointment {} was no longer scheduled", slot.id);
                }
                Ok(rows) => {
                    debug!("Auto-completed appointment {}", slot.id);
                    completed += rows.len();
                }
                Err(e) => warn!("Auto-complete failed for appointment {}: {}", slot.id, e),
            }
        }

        if completed > 0 {
            info!("Auto-completed {} past-due appointments", completed);
        }
        completed
    }
}

/// True when the slot ended strictly before `now`.
pub fn is_past_due(slot: &ScheduledSlot, now: DateTime<Utc>) -> bool {
    let end = slot.appointment_date + Duration::minutes(i64::from(slot.duration_minutes));
    end < now
}
