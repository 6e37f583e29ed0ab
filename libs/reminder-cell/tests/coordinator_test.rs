use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use reminder_cell::{
    DelayedJobScheduler, NewReminder, Reminder, ReminderCoordinator, ReminderError, ReminderStore,
    SchedulerError,
};
use shared_utils::time::FixedClock;

#[derive(Clone)]
struct FakeJob {
    queue: String,
    #[allow(dead_code)]
    payload: Value,
    delay: Duration,
}

/// In-memory stand-in for the Redis scheduler, recording live jobs so the
/// exactly-one-job invariant can be asserted directly.
struct FakeScheduler {
    jobs: Mutex<HashMap<String, FakeJob>>,
    next_id: AtomicU64,
}

impl FakeScheduler {
    fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn live_jobs(&self) -> Vec<(String, FakeJob)> {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .map(|(id, job)| (id.clone(), job.clone()))
            .collect()
    }

    /// Simulate the job having fired (or been purged) behind the
    /// coordinator's back.
    fn drop_job(&self, job_id: &str) {
        self.jobs.lock().unwrap().remove(job_id);
    }
}

#[async_trait]
impl DelayedJobScheduler for FakeScheduler {
    async fn schedule(
        &self,
        queue: &str,
        payload: Value,
        delay: Duration,
    ) -> Result<String, SchedulerError> {
        let job_id = format!("job-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.jobs.lock().unwrap().insert(
            job_id.clone(),
            FakeJob {
                queue: queue.to_string(),
                payload,
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

struct InMemoryReminderStore {
    rows: Mutex<HashMap<Uuid, Reminder>>,
}

impl InMemoryReminderStore {
    fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
        }
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

fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

fn coordinator() -> (
    ReminderCoordinator,
    Arc<FakeScheduler>,
    Arc<InMemoryReminderStore>,
) {
    let scheduler = Arc::new(FakeScheduler::new());
    let store = Arc::new(InMemoryReminderStore::new());
    let coordinator = ReminderCoordinator::new(
        scheduler.clone(),
        store.clone(),
        Arc::new(FixedClock::at(test_now())),
    );
    (coordinator, scheduler, store)
}

#[tokio::test]
async fn ensure_schedules_one_job_24h_before_slot() {
    let (coordinator, scheduler, _store) = coordinator();
    let appointment_id = Uuid::new_v4();
    let scheduled_at = test_now() + Duration::hours(72);

    let reminder = coordinator
        .ensure(appointment_id, scheduled_at)
        .await
        .unwrap();

    assert_eq!(reminder.due_at, scheduled_at - Duration::hours(24));
    assert!(reminder.provider_ref.is_some());

    let jobs = scheduler.live_jobs();
    assert_eq!(jobs.len(), 1);
    let (_, job) = &jobs[0];
    assert_eq!(job.queue, "appointment_reminders");
    // fire time = now + delay must equal scheduled_at - 24h
    assert_eq!(test_now() + job.delay, scheduled_at - Duration::hours(24));
}

#[tokio::test]
async fn ensure_skips_job_when_slot_is_within_lead_time() {
    let (coordinator, scheduler, store) = coordinator();
    let appointment_id = Uuid::new_v4();
    let scheduled_at = test_now() + Duration::hours(23);

    let reminder = coordinator
        .ensure(appointment_id, scheduled_at)
        .await
        .unwrap();

    assert!(reminder.provider_ref.is_none());
    assert!(scheduler.live_jobs().is_empty());
    // The record still exists, it just has no job behind it.
    assert!(store
        .find_by_appointment(appointment_id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn replace_always_leaves_exactly_one_job() {
    let (coordinator, scheduler, _store) = coordinator();
    let appointment_id = Uuid::new_v4();

    let first = coordinator
        .ensure(appointment_id, test_now() + Duration::hours(72))
        .await
        .unwrap();
    let first_job = first.provider_ref.unwrap();

    let second = coordinator
        .replace(appointment_id, test_now() + Duration::hours(96))
        .await
        .unwrap();
    let second_job = second.provider_ref.unwrap();

    assert_ne!(first_job, second_job);
    let jobs = scheduler.live_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].0, second_job);
}

#[tokio::test]
async fn replace_survives_a_job_that_already_fired() {
    let (coordinator, scheduler, _store) = coordinator();
    let appointment_id = Uuid::new_v4();

    let first = coordinator
        .ensure(appointment_id, test_now() + Duration::hours(48))
        .await
        .unwrap();
    scheduler.drop_job(&first.provider_ref.unwrap());

    // Cancel of the vanished job must be swallowed, not bubbled.
    let second = coordinator
        .replace(appointment_id, test_now() + Duration::hours(72))
        .await
        .unwrap();

    assert!(second.provider_ref.is_some());
    assert_eq!(scheduler.live_jobs().len(), 1);
}

#[tokio::test]
async fn replace_without_prior_reminder_behaves_as_ensure() {
    let (coordinator, scheduler, _store) = coordinator();
    let appointment_id = Uuid::new_v4();

    let reminder = coordinator
        .replace(appointment_id, test_now() + Duration::hours(48))
        .await
        .unwrap();

    assert!(reminder.provider_ref.is_some());
    assert_eq!(scheduler.live_jobs().len(), 1);
}

#[tokio::test]
async fn remove_cancels_job_and_deletes_record() {
    let (coordinator, scheduler, store) = coordinator();
    let appointment_id = Uuid::new_v4();

    coordinator
        .ensure(appointment_id, test_now() + Duration::hours(72))
        .await
        .unwrap();

    coordinator.remove(appointment_id).await.unwrap();

    assert!(scheduler.live_jobs().is_empty());
    assert!(store
        .find_by_appointment(appointment_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn remove_is_a_noop_without_a_reminder() {
    let (coordinator, scheduler, _store) = coordinator();

    coordinator.remove(Uuid::new_v4()).await.unwrap();

    assert!(scheduler.live_jobs().is_empty());
}
