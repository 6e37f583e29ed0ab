// Shared in-memory collaborators for the lifecycle and handler tests.
#![allow(dead_code)]
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use appointment_cell::services::lifecycle::{ActionTokenIssuer, AppointmentLifecycleService};
use appointment_cell::{
    Appointment, AppointmentFilter, AppointmentPatch, AppointmentStatus, BookingError, Contact,
    ContactStore, CreateAppointmentRequest, NewAppointment, NewContact, NotificationError, Notifier,
    ReminderDispatch,
};
use reminder_cell::{
    DelayedJobScheduler, NewReminder, Reminder, ReminderCoordinator, ReminderError, ReminderStore,
    SchedulerError,
};
use shared_config::AppConfig;
use shared_utils::test_utils::TestConfig;
use shared_utils::time::FixedClock;

pub fn test_now() -> DateTime<Utc> {
    // 2025-06-01 12:00 Paris
    Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()
}

pub fn paris() -> Tz {
    "Europe/Paris".parse().unwrap()
}

pub fn paris_time(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    paris()
        .from_local_datetime(
            &NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(h, min, 0)
                .unwrap(),
        )
        .unwrap()
        .with_timezone(&Utc)
}

// ==============================================================================
// SCHEDULER + REMINDER FAKES
// ==============================================================================

#[derive(Clone)]
pub struct FakeJob {
    pub queue: String,
    pub delay: Duration,
}

pub struct FakeScheduler {
    jobs: Mutex<HashMap<String, FakeJob>>,
    next_id: AtomicU64,
}

impl FakeScheduler {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn live_jobs(&self) -> Vec<(String, FakeJob)> {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .map(|(id, job)| (id.clone(), job.clone()))
            .collect()
    }
}

#[async_trait]
impl DelayedJobScheduler for FakeScheduler {
    async fn schedule(
        &self,
        queue: &str,
        _payload: Value,
        delay: Duration,
    ) -> Result<String, SchedulerError> {
        let job_id = format!("job-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.jobs.lock().unwrap().insert(
            job_id.clone(),
            FakeJob {
                queue: queue.to_string(),
                delay,
            },
        );
        Ok(job_id)
    }

    async fn cancel(&self, job_id: &str) -> Result<(), SchedulerError> {
        match self.jobs.lock().unwrap().remove(job_id) {
            Some(_) => Ok(()),
            None => Err(SchedulerError::JobNotFound(job_id.to_string())),
        }
    }
}

pub struct InMemoryReminderStore {
    rows: Mutex<HashMap<Uuid, Reminder>>,
}

impl InMemoryReminderStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, appointment_id: Uuid) -> Option<Reminder> {
        self.rows.lock().unwrap().get(&appointment_id).cloned()
    }
}

#[async_trait]
impl ReminderStore for InMemoryReminderStore {
    async fn upsert(&self, reminder: NewReminder) -> Result<Reminder, ReminderError> {
        let now = Utc::now();
        let row = Reminder {
            id: Uuid::new_v4(),
            appointment_id: reminder.appointment_id,
            due_at: reminder.due_at,
            provider_ref: reminder.provider_ref,
            sent_at: None,
            created_at: now,
            updated_at: now,
        };
        self.rows
            .lock()
            .unwrap()
            .insert(reminder.appointment_id, row.clone());
        Ok(row)
    }

    async fn find_by_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<Reminder>, ReminderError> {
        Ok(self.rows.lock().unwrap().get(&appointment_id).cloned())
    }

    async fn delete_by_appointment(&self, appointment_id: Uuid) -> Result<(), ReminderError> {
        self.rows.lock().unwrap().remove(&appointment_id);
        Ok(())
    }

    async fn mark_sent(
        &self,
        appointment_id: Uuid,
        sent_at: DateTime<Utc>,
    ) -> Result<(), ReminderError> {
        if let Some(row) = self.rows.lock().unwrap().get_mut(&appointment_id) {
            row.sent_at = Some(sent_at);
        }
        Ok(())
    }
}

// ==============================================================================
// STORE FAKES
// ==============================================================================

pub struct InMemoryContactStore {
    rows: Mutex<HashMap<Uuid, Contact>>,
}

impl InMemoryContactStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl appointment_cell::ContactStore for InMemoryContactStore {
    async fn upsert(&self, contact: NewContact) -> Result<Contact, BookingError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(existing) = rows.values_mut().find(|c| c.email == contact.email) {
            existing.first_name = contact.first_name;
            existing.last_name = contact.last_name;
            existing.phone = contact.phone;
            existing.consent = contact.consent;
            return Ok(existing.clone());
        }
        let now = Utc::now();
        let row = Contact {
            id: Uuid::new_v4(),
            first_name: contact.first_name,
            last_name: contact.last_name,
            email: contact.email,
            phone: contact.phone,
            consent: contact.consent,
            created_at: now,
            updated_at: now,
        };
        rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Contact>, BookingError> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }
}

pub struct InMemoryAppointmentStore {
    rows: Mutex<HashMap<Uuid, Appointment>>,
    contacts: Arc<InMemoryContactStore>,
}

impl InMemoryAppointmentStore {
    pub fn new(contacts: Arc<InMemoryContactStore>) -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            contacts,
        }
    }
}

#[async_trait]
impl appointment_cell::AppointmentStore for InMemoryAppointmentStore {
    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, BookingError> {
        let now = Utc::now();
        let row = Appointment {
            id: Uuid::new_v4(),
            contact_id: appointment.contact_id,
            status: AppointmentStatus::Pending,
            requested_at: appointment.requested_at,
            scheduled_at: None,
            timezone: appointment.timezone,
            confirmation_token: appointment.confirmation_token,
            cancellation_token: appointment.cancellation_token,
            confirmed_at: None,
            cancelled_at: None,
            notes: appointment.notes,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().insert(row.id, row.clone());
        Ok(row)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Appointment>, BookingError> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn find_with_contact(
        &self,
        id: Uuid,
    ) -> Result<Option<(Appointment, Contact)>, BookingError> {
        let Some(appointment) = self.find(id).await? else {
            return Ok(None);
        };
        let contact = self
            .contacts
            .find(appointment.contact_id)
            .await?
            .ok_or_else(|| BookingError::Database("contact missing".to_string()))?;
        Ok(Some((appointment, contact)))
    }

    async fn update(
        &self,
        id: Uuid,
        patch: AppointmentPatch,
    ) -> Result<Appointment, BookingError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows.get_mut(&id).ok_or(BookingError::NotFound)?;
        if let Some(status) = patch.status {
            row.status = status;
        }
        if let Some(scheduled_at) = patch.scheduled_at {
            row.scheduled_at = Some(scheduled_at);
        }
        if let Some(confirmed_at) = patch.confirmed_at {
            row.confirmed_at = Some(confirmed_at);
        }
        if let Some(cancelled_at) = patch.cancelled_at {
            row.cancelled_at = Some(cancelled_at);
        }
        if let Some(notes) = patch.notes {
            row.notes = Some(notes);
        }
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), BookingError> {
        self.rows.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn list(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, BookingError> {
        let rows = self.rows.lock().unwrap();
        let mut result: Vec<Appointment> = rows
            .values()
            .filter(|a| {
                filter
                    .status
                    .as_ref()
                    .map(|s| &a.status == s)
                    .unwrap_or(true)
                    && filter
                        .from_date
                        .map(|from| a.scheduled_at.map(|at| at >= from).unwrap_or(false))
                        .unwrap_or(true)
                    && filter
                        .to_date
                        .map(|to| a.scheduled_at.map(|at| at <= to).unwrap_or(false))
                        .unwrap_or(true)
            })
            .cloned()
            .collect();
        result.sort_by_key(|a| a.created_at);
        Ok(result)
    }
}

// ==============================================================================
// NOTIFIER + TOKEN ISSUER FAKES
// ==============================================================================

pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn subjects_for(&self, recipient: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to == recipient)
            .map(|(_, subject)| subject.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        _body_html: &str,
    ) -> Result<(), NotificationError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotificationError::Dispatch("mail API down".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), subject.to_string()));
        Ok(())
    }
}

pub struct FakeIssuer;

#[async_trait]
impl ActionTokenIssuer for FakeIssuer {
    async fn issue(&self, appointment_id: Uuid, action: &str) -> anyhow::Result<String> {
        Ok(format!("tok-{}-{}", action, appointment_id))
    }
}

// ==============================================================================
// WORLD
// ==============================================================================

pub struct World {
    pub config: Arc<AppConfig>,
    pub lifecycle: Arc<AppointmentLifecycleService>,
    pub scheduler: Arc<FakeScheduler>,
    pub reminder_store: Arc<InMemoryReminderStore>,
    pub appointments: Arc<InMemoryAppointmentStore>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn build_world() -> World {
    let config = TestConfig::default().to_arc();
    let clock = Arc::new(FixedClock::at(test_now()));

    let contacts = Arc::new(InMemoryContactStore::new());
    let appointments = Arc::new(InMemoryAppointmentStore::new(contacts.clone()));
    let scheduler = Arc::new(FakeScheduler::new());
    let reminder_store = Arc::new(InMemoryReminderStore::new());
    let notifier = Arc::new(RecordingNotifier::new());

    let coordinator = Arc::new(ReminderCoordinator::new(
        scheduler.clone(),
        reminder_store.clone(),
        clock.clone(),
    ));
    let dispatch = Arc::new(ReminderDispatch::new(
        appointments.clone(),
        reminder_store.clone(),
        notifier.clone(),
        clock.clone(),
        paris(),
    ));

    let lifecycle = Arc::new(AppointmentLifecycleService::new(
        &config,
        appointments.clone(),
        contacts,
        coordinator,
        dispatch,
        notifier.clone(),
        Arc::new(FakeIssuer),
        clock,
    ));

    World {
        config,
        lifecycle,
        scheduler,
        reminder_store,
        appointments,
        notifier,
    }
}

pub fn create_request(requested_at: DateTime<Utc>) -> CreateAppointmentRequest {
    CreateAppointmentRequest {
        first_name: "Jean".to_string(),
        last_name: "Moreau".to_string(),
        email: "jean.moreau@example.com".to_string(),
        phone: Some("+33612345678".to_string()),
        consent: true,
        requested_at,
        timezone: "Europe/Paris".to_string(),
        notes: None,
    }
}
