// libs/appointment-cell/src/services/reminders.rs
use async_trait::async_trait;
use chrono_tz::Tz;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use reminder_cell::{JobConsumer, ReminderError, ReminderJobPayload, ReminderStore};
use shared_utils::time::{format_in_zone, Clock};

use crate::models::BookingError;
use crate::notify::Notifier;
use crate::store::AppointmentStore;

/// Consumer side of the reminder pipeline: fired jobs land here, and the
/// admin "send reminder now" path reuses the same sending logic. Delivery
/// is at-least-once; a retried job may re-send the email.
pub struct ReminderDispatch {
    appointments: Arc<dyn AppointmentStore>,
    reminder_store: Arc<dyn ReminderStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    reference_tz: Tz,
}

impl ReminderDispatch {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        reminder_store: Arc<dyn ReminderStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        reference_tz: Tz,
    ) -> Self {
        Self {
            appointments,
            reminder_store,
            notifier,
            clock,
            reference_tz,
        }
    }

    /// Send the reminder email for an appointment and stamp `sent_at`.
    /// Returns false when there is nothing to send: the appointment was
    /// deleted after the job was scheduled, or it has no agreed slot.
    pub async fn send_for(&self, appointment_id: Uuid) -> Result<bool, BookingError> {
        let Some((appointment, contact)) =
            self.appointments.find_with_contact(appointment_id).await?
        else {
            info!(
                "Appointment {} no longer exists, dropping reminder",
                appointment_id
            );
            return Ok(false);
        };

        let Some(scheduled_at) = appointment.scheduled_at else {
            warn!(
                "Appointment {} has no agreed slot, skipping reminder",
                appointment_id
            );
            return Ok(false);
        };

        let body = format!(
            "<p>Hello {},</p><p>A reminder that your appointment is scheduled for {}.</p>",
            contact.first_name,
            format_in_zone(scheduled_at, &appointment.timezone, self.reference_tz),
        );
        self.notifier
            .send(&contact.email, "Appointment reminder", &body)
            .await
            .map_err(|e| BookingError::Notification(e.to_string()))?;

        self.reminder_store
            .mark_sent(appointment_id, self.clock.now())
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        info!("Reminder sent for appointment {}", appointment_id);
        Ok(true)
    }
}

#[async_trait]
impl JobConsumer for ReminderDispatch {
    async fn handle(&self, payload: Value) -> Result<(), ReminderError> {
        let payload: ReminderJobPayload = serde_json::from_value(payload)
            .map_err(|e| ReminderError::Handler(format!("malformed payload: {}", e)))?;

        self.send_for(payload.appointment_id)
            .await
            .map(|_| ())
            .map_err(|e| ReminderError::Handler(e.to_string()))
    }
}
