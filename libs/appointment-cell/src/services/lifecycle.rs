// libs/appointment-cell/src/services/lifecycle.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use reminder_cell::ReminderCoordinator;
use shared_config::AppConfig;
use shared_utils::time::{format_in_zone, parse_zone, Clock};
use shared_utils::token::generate_token_pair;

use crate::locks::IdLockRegistry;
use crate::models::{
    Appointment, AppointmentFilter, AppointmentPatch, AppointmentStats, AppointmentStatus,
    BookingError, BookingRules, CanCancelResponse, Contact, CreateAppointmentRequest,
    NewAppointment, NewContact, TransitionOutcome,
};
use crate::notify::Notifier;
use crate::services::reminders::ReminderDispatch;
use crate::services::validation;
use crate::store::{AppointmentStore, ContactStore};

/// Mints single-use tokens for the admin email-action links carried by the
/// "new request" notification.
#[async_trait]
pub trait ActionTokenIssuer: Send + Sync {
    async fn issue(&self, appointment_id: Uuid, action: &str) -> anyhow::Result<String>;
}

/// Get all valid next statuses for a given current status.
pub fn valid_transitions(current_status: &AppointmentStatus) -> Vec<AppointmentStatus> {
    match current_status {
        AppointmentStatus::Pending => vec![
            AppointmentStatus::Confirmed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::Rejected,
        ],
        AppointmentStatus::Confirmed => vec![
            AppointmentStatus::Rescheduled,
            AppointmentStatus::Cancelled,
            AppointmentStatus::Completed,
        ],
        AppointmentStatus::Rescheduled => vec![
            AppointmentStatus::Confirmed,
            AppointmentStatus::Cancelled,
        ],
        // Terminal states - no transitions allowed
        AppointmentStatus::Cancelled
        | AppointmentStatus::Rejected
        | AppointmentStatus::Completed => vec![],
    }
}

/// Validate that a status transition is allowed.
pub fn validate_status_transition(
    current_status: &AppointmentStatus,
    new_status: &AppointmentStatus,
) -> Result<(), BookingError> {
    debug!(
        "Validating status transition from {} to {}",
        current_status, new_status
    );

    if !valid_transitions(current_status).contains(new_status) {
        warn!(
            "Invalid status transition attempted: {} -> {}",
            current_status, new_status
        );
        return Err(BookingError::InvalidState(current_status.clone()));
    }

    Ok(())
}

/// Top-level appointment state machine. Composes the stores, the validation
/// predicates, the reminder coordinator and the notifier; every mutating
/// operation runs under the per-appointment lock and applies side effects in
/// the fixed order: store mutation, reminder coordination, notification.
pub struct AppointmentLifecycleService {
    appointments: Arc<dyn AppointmentStore>,
    contacts: Arc<dyn ContactStore>,
    reminders: Arc<ReminderCoordinator>,
    dispatch: Arc<ReminderDispatch>,
    notifier: Arc<dyn Notifier>,
    action_tokens: Arc<dyn ActionTokenIssuer>,
    clock: Arc<dyn Clock>,
    locks: IdLockRegistry,
    rules: BookingRules,
    reference_tz: Tz,
    public_base_url: String,
    admin_address: String,
}

impl AppointmentLifecycleService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &AppConfig,
        appointments: Arc<dyn AppointmentStore>,
        contacts: Arc<dyn ContactStore>,
        reminders: Arc<ReminderCoordinator>,
        dispatch: Arc<ReminderDispatch>,
        notifier: Arc<dyn Notifier>,
        action_tokens: Arc<dyn ActionTokenIssuer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let reference_tz = parse_zone(&config.reference_timezone).unwrap_or_else(|_| {
            warn!(
                "Unknown reference timezone '{}', falling back to Europe/Paris",
                config.reference_timezone
            );
            chrono_tz::Europe::Paris
        });

        Self {
            appointments,
            contacts,
            reminders,
            dispatch,
            notifier,
            action_tokens,
            clock,
            locks: IdLockRegistry::new(),
            rules: BookingRules::default(),
            reference_tz,
            public_base_url: config.public_base_url.clone(),
            admin_address: config.admin_notification_address.clone(),
        }
    }

    pub fn reference_tz(&self) -> Tz {
        self.reference_tz
    }

    // ==========================================================================
    // PUBLIC OPERATIONS (token-authorized)
    // ==========================================================================

    /// Public "request appointment" entry point. Validates the booking
    /// horizon, upserts the contact and persists a pending appointment with
    /// a fresh token pair.
    pub async fn create(
        &self,
        request: CreateAppointmentRequest,
    ) -> Result<TransitionOutcome, BookingError> {
        info!("Appointment request from {} for {}", request.email, request.requested_at);

        validation::validate_booking_horizon(
            request.requested_at,
            &request.timezone,
            self.reference_tz,
            self.clock.now(),
            &self.rules,
        )?;

        let contact = self
            .contacts
            .upsert(NewContact {
                first_name: request.first_name,
                last_name: request.last_name,
                email: request.email,
                phone: request.phone,
                consent: request.consent,
            })
            .await?;

        let (confirmation_token, cancellation_token) = generate_token_pair();

        let appointment = self
            .appointments
            .insert(NewAppointment {
                contact_id: contact.id,
                requested_at: request.requested_at,
                timezone: request.timezone,
                confirmation_token,
                cancellation_token,
                notes: request.notes,
            })
            .await?;

        let delivered_client = self.notify_request_received(&appointment, &contact).await;
        let delivered_admin = self.notify_admin_new_request(&appointment, &contact).await;

        info!("Appointment {} created for contact {}", appointment.id, contact.id);

        Ok(TransitionOutcome {
            appointment,
            reminder_synced: true,
            notification_delivered: delivered_client && delivered_admin,
        })
    }

    /// Confirm at an explicit slot (admin/system path).
    pub async fn confirm(
        &self,
        appointment_id: Uuid,
        scheduled_at: DateTime<Utc>,
    ) -> Result<TransitionOutcome, BookingError> {
        let _guard = self.locks.acquire(appointment_id).await;
        let appointment = self.load(appointment_id).await?;
        self.apply_confirm(appointment, scheduled_at).await
    }

    /// Client confirmation via the confirmation token. Requires a slot to
    /// have been proposed already.
    pub async fn confirm_by_token(
        &self,
        appointment_id: Uuid,
        token: &str,
    ) -> Result<TransitionOutcome, BookingError> {
        let _guard = self.locks.acquire(appointment_id).await;
        let appointment = self.load(appointment_id).await?;

        if appointment.confirmation_token != token {
            return Err(BookingError::InvalidToken);
        }
        let scheduled_at = appointment.scheduled_at.ok_or(BookingError::MissingSchedule)?;

        self.apply_confirm(appointment, scheduled_at).await
    }

    /// Client cancellation via the cancellation token. Pending and
    /// rescheduled appointments are always cancellable; confirmed ones only
    /// outside the cancellation window.
    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        token: &str,
    ) -> Result<TransitionOutcome, BookingError> {
        let _guard = self.locks.acquire(appointment_id).await;
        let appointment = self.load(appointment_id).await?;

        if appointment.cancellation_token != token {
            return Err(BookingError::InvalidToken);
        }

        validate_status_transition(&appointment.status, &AppointmentStatus::Cancelled)?;

        let (allowed, hours_remaining) = validation::cancellation_window(
            &appointment.status,
            appointment.scheduled_at,
            self.clock.now(),
            &self.rules,
        );
        if !allowed {
            return Err(BookingError::CancellationWindow { hours_remaining });
        }

        self.apply_cancel(appointment).await
    }

    /// Read-only variant of `cancel`: reports whether the token holder
    /// could cancel right now, without mutating anything.
    pub async fn can_cancel(
        &self,
        appointment_id: Uuid,
        token: &str,
    ) -> Result<CanCancelResponse, BookingError> {
        let appointment = self.load(appointment_id).await?;

        if appointment.cancellation_token != token {
            return Err(BookingError::InvalidToken);
        }

        let state_allows = !appointment.status.is_terminal();
        let (window_allows, hours_remaining) = validation::cancellation_window(
            &appointment.status,
            appointment.scheduled_at,
            self.clock.now(),
            &self.rules,
        );

        Ok(CanCancelResponse {
            can_cancel: state_allows && window_allows,
            hours_remaining,
        })
    }

    /// Client accepts the slot proposed by a reschedule. Checked against
    /// the confirmation token.
    pub async fn accept_reschedule(
        &self,
        appointment_id: Uuid,
        token: &str,
    ) -> Result<TransitionOutcome, BookingError> {
        let _guard = self.locks.acquire(appointment_id).await;
        let appointment = self.load(appointment_id).await?;

        if appointment.status != AppointmentStatus::Rescheduled {
            return Err(BookingError::InvalidState(appointment.status));
        }
        if appointment.confirmation_token != token {
            return Err(BookingError::InvalidToken);
        }
        let scheduled_at = appointment.scheduled_at.ok_or(BookingError::MissingSchedule)?;

        self.apply_confirm(appointment, scheduled_at).await
    }

    /// Client rejects the proposed slot. Checked against the cancellation
    /// token; the appointment ends up cancelled.
    pub async fn reject_reschedule(
        &self,
        appointment_id: Uuid,
        token: &str,
    ) -> Result<TransitionOutcome, BookingError> {
        let _guard = self.locks.acquire(appointment_id).await;
        let appointment = self.load(appointment_id).await?;

        if appointment.status != AppointmentStatus::Rescheduled {
            return Err(BookingError::InvalidState(appointment.status));
        }
        if appointment.cancellation_token != token {
            return Err(BookingError::InvalidToken);
        }

        self.apply_cancel(appointment).await
    }

    // ==========================================================================
    // ADMIN OPERATIONS (authorization handled upstream)
    // ==========================================================================

    /// Direct status change. Reminder coordination follows the target
    /// status: confirmed schedules, cancelled/rejected clears.
    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
    ) -> Result<TransitionOutcome, BookingError> {
        let _guard = self.locks.acquire(appointment_id).await;
        let appointment = self.load(appointment_id).await?;

        match new_status {
            AppointmentStatus::Confirmed => {
                validate_status_transition(&appointment.status, &AppointmentStatus::Confirmed)?;
                let scheduled_at =
                    appointment.scheduled_at.ok_or(BookingError::MissingSchedule)?;
                self.apply_confirm(appointment, scheduled_at).await
            }
            AppointmentStatus::Cancelled => self.apply_cancel(appointment).await,
            AppointmentStatus::Rejected => self.apply_reject(appointment).await,
            _ => {
                validate_status_transition(&appointment.status, &new_status)?;
                let updated = self
                    .appointments
                    .update(
                        appointment.id,
                        AppointmentPatch {
                            status: Some(new_status),
                            ..Default::default()
                        },
                    )
                    .await?;
                Ok(TransitionOutcome {
                    appointment: updated,
                    reminder_synced: true,
                    notification_delivered: true,
                })
            }
        }
    }

    /// Move a confirmed appointment to a new slot directly, keeping it
    /// confirmed. The slot must be legal and far enough out.
    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        new_scheduled_at: DateTime<Utc>,
    ) -> Result<TransitionOutcome, BookingError> {
        let _guard = self.locks.acquire(appointment_id).await;
        let appointment = self.load(appointment_id).await?;

        if appointment.status != AppointmentStatus::Confirmed {
            return Err(BookingError::InvalidState(appointment.status));
        }
        validation::validate_slot(new_scheduled_at, self.reference_tz)?;
        validation::validate_reschedule_lead(new_scheduled_at, self.clock.now(), &self.rules)?;

        let updated = self
            .appointments
            .update(
                appointment.id,
                AppointmentPatch {
                    scheduled_at: Some(new_scheduled_at),
                    ..Default::default()
                },
            )
            .await?;

        let reminder_synced = self.sync_reminder_replace(updated.id, new_scheduled_at).await;
        let notification_delivered = self.notify_rescheduled(&updated, new_scheduled_at).await;

        Ok(TransitionOutcome {
            appointment: updated,
            reminder_synced,
            notification_delivered,
        })
    }

    /// Propose a new slot, pending client acceptance. On a pending request
    /// this records the proposed slot (the client will use the confirm
    /// link); on a confirmed appointment it moves to rescheduled and the
    /// client must accept or reject. The live reminder, if any, keeps
    /// pointing at the old slot until the client decides.
    pub async fn propose_reschedule(
        &self,
        appointment_id: Uuid,
        new_scheduled_at: DateTime<Utc>,
    ) -> Result<TransitionOutcome, BookingError> {
        let _guard = self.locks.acquire(appointment_id).await;
        let appointment = self.load(appointment_id).await?;

        if !matches!(
            appointment.status,
            AppointmentStatus::Pending | AppointmentStatus::Confirmed
        ) {
            return Err(BookingError::InvalidState(appointment.status));
        }
        validation::validate_slot(new_scheduled_at, self.reference_tz)?;
        validation::validate_reschedule_lead(new_scheduled_at, self.clock.now(), &self.rules)?;

        let new_status = match appointment.status {
            AppointmentStatus::Confirmed => Some(AppointmentStatus::Rescheduled),
            _ => None,
        };

        let updated = self
            .appointments
            .update(
                appointment.id,
                AppointmentPatch {
                    status: new_status,
                    scheduled_at: Some(new_scheduled_at),
                    ..Default::default()
                },
            )
            .await?;

        let notification_delivered = self.notify_slot_proposed(&updated, new_scheduled_at).await;

        Ok(TransitionOutcome {
            appointment: updated,
            reminder_synced: true,
            notification_delivered,
        })
    }

    /// Hard delete. The outstanding reminder is cancelled first so a
    /// failure there aborts before the row disappears.
    pub async fn delete(&self, appointment_id: Uuid) -> Result<(), BookingError> {
        let _guard = self.locks.acquire(appointment_id).await;
        let _ = self.load(appointment_id).await?;

        self.reminders
            .remove(appointment_id)
            .await
            .map_err(|e| BookingError::Scheduler(e.to_string()))?;

        self.appointments.delete(appointment_id).await?;
        info!("Appointment {} deleted", appointment_id);
        Ok(())
    }

    /// Send the reminder notification immediately, regardless of the
    /// scheduled job.
    pub async fn send_reminder(&self, appointment_id: Uuid) -> Result<bool, BookingError> {
        let _ = self.load(appointment_id).await?;
        self.dispatch.send_for(appointment_id).await
    }

    pub async fn get(&self, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        self.load(appointment_id).await
    }

    pub async fn list(
        &self,
        filter: AppointmentFilter,
    ) -> Result<Vec<Appointment>, BookingError> {
        self.appointments.list(filter).await
    }

    /// Counts per status over the whole book.
    pub async fn stats(&self) -> Result<AppointmentStats, BookingError> {
        let appointments = self.appointments.list(AppointmentFilter::default()).await?;

        let mut stats = AppointmentStats {
            total: appointments.len() as i64,
            pending: 0,
            confirmed: 0,
            rescheduled: 0,
            cancelled: 0,
            rejected: 0,
            completed: 0,
        };
        for appointment in &appointments {
            match appointment.status {
                AppointmentStatus::Pending => stats.pending += 1,
                AppointmentStatus::Confirmed => stats.confirmed += 1,
                AppointmentStatus::Rescheduled => stats.rescheduled += 1,
                AppointmentStatus::Cancelled => stats.cancelled += 1,
                AppointmentStatus::Rejected => stats.rejected += 1,
                AppointmentStatus::Completed => stats.completed += 1,
            }
        }

        Ok(stats)
    }

    /// Appointments with an agreed slot in the next `days` days, active
    /// statuses only.
    pub async fn upcoming(&self, days: i64) -> Result<Vec<Appointment>, BookingError> {
        let now = self.clock.now();
        let mut appointments = self
            .appointments
            .list(AppointmentFilter {
                from_date: Some(now),
                to_date: Some(now + chrono::Duration::days(days)),
                ..Default::default()
            })
            .await?;

        appointments.retain(|a| !a.status.is_terminal());
        Ok(appointments)
    }

    // ==========================================================================
    // TRANSITION BODIES
    // ==========================================================================

    async fn load(&self, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        self.appointments
            .find(appointment_id)
            .await?
            .ok_or(BookingError::NotFound)
    }

    async fn apply_confirm(
        &self,
        appointment: Appointment,
        scheduled_at: DateTime<Utc>,
    ) -> Result<TransitionOutcome, BookingError> {
        validate_status_transition(&appointment.status, &AppointmentStatus::Confirmed)?;

        let updated = self
            .appointments
            .update(
                appointment.id,
                AppointmentPatch {
                    status: Some(AppointmentStatus::Confirmed),
                    scheduled_at: Some(scheduled_at),
                    confirmed_at: Some(self.clock.now()),
                    ..Default::default()
                },
            )
            .await?;

        let reminder_synced = self.sync_reminder_replace(updated.id, scheduled_at).await;
        let notification_delivered = self.notify_confirmed(&updated, scheduled_at).await;

        info!("Appointment {} confirmed for {}", updated.id, scheduled_at);

        Ok(TransitionOutcome {
            appointment: updated,
            reminder_synced,
            notification_delivered,
        })
    }

    async fn apply_cancel(
        &self,
        appointment: Appointment,
    ) -> Result<TransitionOutcome, BookingError> {
        validate_status_transition(&appointment.status, &AppointmentStatus::Cancelled)?;

        let updated = self
            .appointments
            .update(
                appointment.id,
                AppointmentPatch {
                    status: Some(AppointmentStatus::Cancelled),
                    cancelled_at: Some(self.clock.now()),
                    ..Default::default()
                },
            )
            .await?;

        let reminder_synced = self.sync_reminder_remove(updated.id).await;
        let notification_delivered = self.notify_cancelled(&updated).await;

        info!("Appointment {} cancelled", updated.id);

        Ok(TransitionOutcome {
            appointment: updated,
            reminder_synced,
            notification_delivered,
        })
    }

    async fn apply_reject(
        &self,
        appointment: Appointment,
    ) -> Result<TransitionOutcome, BookingError> {
        validate_status_transition(&appointment.status, &AppointmentStatus::Rejected)?;

        let updated = self
            .appointments
            .update(
                appointment.id,
                AppointmentPatch {
                    status: Some(AppointmentStatus::Rejected),
                    ..Default::default()
                },
            )
            .await?;

        let reminder_synced = self.sync_reminder_remove(updated.id).await;
        let notification_delivered = self.notify_rejected(&updated).await;

        info!("Appointment {} rejected", updated.id);

        Ok(TransitionOutcome {
            appointment: updated,
            reminder_synced,
            notification_delivered,
        })
    }

    // ==========================================================================
    // SIDE EFFECTS
    // ==========================================================================

    /// Reminder sync after a committed status change: a failure degrades
    /// the response instead of rolling the transition back.
    async fn sync_reminder_replace(&self, appointment_id: Uuid, scheduled_at: DateTime<Utc>) -> bool {
        match self.reminders.replace(appointment_id, scheduled_at).await {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    "Reminder for appointment {} may be stale after confirm/reschedule: {}",
                    appointment_id, e
                );
                false
            }
        }
    }

    async fn sync_reminder_remove(&self, appointment_id: Uuid) -> bool {
        match self.reminders.remove(appointment_id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Reminder for appointment {} may be stale after cancel: {}",
                    appointment_id, e
                );
                false
            }
        }
    }

    async fn notify(&self, recipient: &str, subject: &str, body: &str) -> bool {
        if recipient.is_empty() {
            return false;
        }
        match self.notifier.send(recipient, subject, body).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Notification '{}' to {} failed: {}", subject, recipient, e);
                false
            }
        }
    }

    fn render(&self, instant: DateTime<Utc>, zone: &str) -> String {
        format_in_zone(instant, zone, self.reference_tz)
    }

    async fn notify_request_received(
        &self,
        appointment: &Appointment,
        contact: &Contact,
    ) -> bool {
        let body = format!(
            "<p>Hello {},</p><p>We received your appointment request for {}. \
             We will get back to you shortly to confirm the slot.</p>",
            contact.first_name,
            self.render(appointment.requested_at, &appointment.timezone),
        );
        self.notify(&contact.email, "We received your appointment request", &body)
            .await
    }

    async fn notify_admin_new_request(
        &self,
        appointment: &Appointment,
        contact: &Contact,
    ) -> bool {
        let mut links = Vec::new();
        for (action, path) in [
            ("accept", "accept"),
            ("reject", "reject"),
            ("reschedule", "propose-reschedule"),
        ] {
            match self.action_tokens.issue(appointment.id, action).await {
                Ok(token) => links.push(format!(
                    "<a href=\"{}/actions/appointments/{}/{}?token={}\">{}</a>",
                    self.public_base_url, appointment.id, path, token, action
                )),
                Err(e) => {
                    warn!(
                        "Failed to mint {} token for appointment {}: {}",
                        action, appointment.id, e
                    );
                    return false;
                }
            }
        }

        let body = format!(
            "<p>New appointment request from {} ({}) for {}.</p><p>{}</p>",
            contact.full_name(),
            contact.email,
            self.render(appointment.requested_at, &appointment.timezone),
            links.join(" | "),
        );
        self.notify(&self.admin_address, "New appointment request", &body)
            .await
    }

    async fn notify_confirmed(&self, appointment: &Appointment, scheduled_at: DateTime<Utc>) -> bool {
        let Some(email) = self.contact_email(appointment).await else {
            return false;
        };
        let body = format!(
            "<p>Your appointment is confirmed for {}.</p>\
             <p>If you need to cancel, use your cancellation link at least 24 hours ahead.</p>",
            self.render(scheduled_at, &appointment.timezone),
        );
        self.notify(&email, "Your appointment is confirmed", &body).await
    }

    async fn notify_cancelled(&self, appointment: &Appointment) -> bool {
        let Some(email) = self.contact_email(appointment).await else {
            return false;
        };
        let body = "<p>Your appointment has been cancelled.</p>".to_string();
        self.notify(&email, "Your appointment was cancelled", &body).await
    }

    async fn notify_rejected(&self, appointment: &Appointment) -> bool {
        let Some(email) = self.contact_email(appointment).await else {
            return false;
        };
        let body = "<p>Unfortunately we cannot take your appointment request at this time.</p>"
            .to_string();
        self.notify(&email, "About your appointment request", &body).await
    }

    async fn notify_rescheduled(&self, appointment: &Appointment, new_at: DateTime<Utc>) -> bool {
        let Some(email) = self.contact_email(appointment).await else {
            return false;
        };
        let body = format!(
            "<p>Your appointment has been moved to {}.</p>",
            self.render(new_at, &appointment.timezone),
        );
        self.notify(&email, "Your appointment was rescheduled", &body).await
    }

    async fn notify_slot_proposed(&self, appointment: &Appointment, new_at: DateTime<Utc>) -> bool {
        let Some(email) = self.contact_email(appointment).await else {
            return false;
        };
        let confirm_link = format!(
            "{}/appointments/{}/confirm?token={}",
            self.public_base_url, appointment.id, appointment.confirmation_token
        );
        let cancel_link = format!(
            "{}/appointments/{}/cancel?token={}",
            self.public_base_url, appointment.id, appointment.cancellation_token
        );
        let body = format!(
            "<p>We propose {} for your appointment.</p>\
             <p><a href=\"{}\">Accept</a> | <a href=\"{}\">Decline</a></p>",
            self.render(new_at, &appointment.timezone),
            confirm_link,
            cancel_link,
        );
        self.notify(&email, "Proposed appointment slot", &body).await
    }

    async fn contact_email(&self, appointment: &Appointment) -> Option<String> {
        match self.contacts.find(appointment.contact_id).await {
            Ok(Some(contact)) => Some(contact.email),
            Ok(None) => {
                warn!("Contact {} not found for appointment {}", appointment.contact_id, appointment.id);
                None
            }
            Err(e) => {
                warn!("Failed to load contact for appointment {}: {}", appointment.id, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_reach_confirmed_cancelled_rejected() {
        let targets = valid_transitions(&AppointmentStatus::Pending);
        assert!(targets.contains(&AppointmentStatus::Confirmed));
        assert!(targets.contains(&AppointmentStatus::Cancelled));
        assert!(targets.contains(&AppointmentStatus::Rejected));
        assert_eq!(targets.len(), 3);
    }

    #[test]
    fn confirmed_can_reach_rescheduled_cancelled_completed() {
        let targets = valid_transitions(&AppointmentStatus::Confirmed);
        assert!(targets.contains(&AppointmentStatus::Rescheduled));
        assert!(targets.contains(&AppointmentStatus::Cancelled));
        assert!(targets.contains(&AppointmentStatus::Completed));
        assert_eq!(targets.len(), 3);
    }

    #[test]
    fn rescheduled_can_only_be_accepted_or_cancelled() {
        let targets = valid_transitions(&AppointmentStatus::Rescheduled);
        assert_eq!(
            targets,
            vec![AppointmentStatus::Confirmed, AppointmentStatus::Cancelled]
        );
    }

    #[test]
    fn terminal_states_allow_nothing() {
        for status in [
            AppointmentStatus::Cancelled,
            AppointmentStatus::Rejected,
            AppointmentStatus::Completed,
        ] {
            assert!(valid_transitions(&status).is_empty(), "{status} is terminal");
        }
    }

    #[test]
    fn transition_validation_reports_current_state() {
        let err = validate_status_transition(
            &AppointmentStatus::Completed,
            &AppointmentStatus::Confirmed,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            BookingError::InvalidState(AppointmentStatus::Completed)
        ));
    }
}
