use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// At most one live reminder exists per appointment. `provider_ref` is the
/// opaque handle into the delayed-job scheduler; `None` means the
/// appointment was confirmed too close to its slot for a reminder to make
/// sense, which is the defined policy rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub due_at: DateTime<Utc>,
    pub provider_ref: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReminder {
    pub appointment_id: Uuid,
    pub due_at: DateTime<Utc>,
    pub provider_ref: Option<String>,
}

/// Payload carried by a scheduled reminder job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderJobPayload {
    pub appointment_id: Uuid,
}

/// A job popped from the durable queue, ready for dispatch.
#[derive(Debug, Clone)]
pub struct ScheduledJob {
    pub job_id: String,
    pub queue: String,
    pub payload: Value,
    pub fire_at: DateTime<Utc>,
    pub retry_count: u32,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: String,
    pub poll_interval_ms: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: format!("reminder-worker-{}", Uuid::new_v4()),
            poll_interval_ms: 500,
            max_retries: 3,
            retry_delay_seconds: 60,
        }
    }
}
