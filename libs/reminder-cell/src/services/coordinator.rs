use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_utils::time::Clock;

use crate::error::{ReminderError, SchedulerError};
use crate::models::{NewReminder, Reminder};
use crate::services::scheduler::DelayedJobScheduler;
use crate::store::ReminderStore;

pub const REMINDER_QUEUE: &str = "appointment_reminders";
pub const REMINDER_LEAD_HOURS: i64 = 24;

/// Owns the "at most one live reminder job per appointment" invariant.
/// Callers must serialize mutating calls for a given appointment id.
pub struct ReminderCoordinator {
    scheduler: Arc<dyn DelayedJobScheduler>,
    store: Arc<dyn ReminderStore>,
    clock: Arc<dyn Clock>,
}

impl ReminderCoordinator {
    pub fn new(
        scheduler: Arc<dyn DelayedJobScheduler>,
        store: Arc<dyn ReminderStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            scheduler,
            store,
            clock,
        }
    }

    /// Schedule the reminder for an appointment now agreed at
    /// `scheduled_at`. A firing time already in the past means the slot is
    /// too close to remind; the record is still kept, without a job.
    pub async fn ensure(
        &self,
        appointment_id: Uuid,
        scheduled_at: DateTime<Utc>,
    ) -> Result<Reminder, ReminderError> {
        let due_at = scheduled_at - Duration::hours(REMINDER_LEAD_HOURS);
        let delay = due_at - self.clock.now();

        let provider_ref = if delay <= Duration::zero() {
            debug!(
                "Appointment {} starts within {}h, skipping reminder job",
                appointment_id, REMINDER_LEAD_HOURS
            );
            None
        } else {
            let payload = json!({ "appointment_id": appointment_id });
            let job_id = self
                .scheduler
                .schedule(REMINDER_QUEUE, payload, delay)
                .await?;
            info!(
                "Reminder job {} scheduled for appointment {} at {}",
                job_id, appointment_id, due_at
            );
            Some(job_id)
        };

        self.store
            .upsert(NewReminder {
                appointment_id,
                due_at,
                provider_ref,
            })
            .await
    }

    /// Swap the reminder for a new slot: cancel whatever job is live, then
    /// behave as `ensure`. Covers the first confirmation uniformly.
    pub async fn replace(
        &self,
        appointment_id: Uuid,
        new_scheduled_at: DateTime<Utc>,
    ) -> Result<Reminder, ReminderError> {
        self.cancel_existing_job(appointment_id).await?;
        self.ensure(appointment_id, new_scheduled_at).await
    }

    /// Drop the reminder entirely (appointment cancelled, rejected or
    /// deleted). No-op when none exists.
    pub async fn remove(&self, appointment_id: Uuid) -> Result<(), ReminderError> {
        let Some(_existing) = self.store.find_by_appointment(appointment_id).await? else {
            return Ok(());
        };

        self.cancel_existing_job(appointment_id).await?;
        self.store.delete_by_appointment(appointment_id).await
    }

    async fn cancel_existing_job(&self, appointment_id: Uuid) -> Result<(), ReminderError> {
        let Some(existing) = self.store.find_by_appointment(appointment_id).await? else {
            return Ok(());
        };

        if let Some(provider_ref) = existing.provider_ref {
            match self.scheduler.cancel(&provider_ref).await {
                Ok(()) => {}
                // The job may have already fired or been purged.
                Err(SchedulerError::JobNotFound(_)) => {
                    debug!(
                        "Reminder job {} for appointment {} already gone",
                        provider_ref, appointment_id
                    );
                }
                Err(e) => {
                    warn!(
                        "Failed to cancel reminder job {} for appointment {}: {}",
                        provider_ref, appointment_id, e
                    );
                    return Err(e.into());
                }
            }
        }

        Ok(())
    }
}
