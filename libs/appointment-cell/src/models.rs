// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub contact_id: Uuid,
    pub status: AppointmentStatus,
    /// The slot the client asked for when the request came in.
    pub requested_at: DateTime<Utc>,
    /// The agreed slot, set when a slot is proposed or confirmed.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// IANA zone captured at creation, used to render times back to the
    /// client consistently.
    pub timezone: String,
    pub confirmation_token: String,
    pub cancellation_token: String,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Rescheduled,
    Cancelled,
    Rejected,
    Completed,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Cancelled
                | AppointmentStatus::Rejected
                | AppointmentStatus::Completed
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Rescheduled => write!(f, "rescheduled"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Rejected => write!(f, "rejected"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub consent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// ==============================================================================
// STORE-LEVEL RECORDS
// ==============================================================================

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub contact_id: Uuid,
    pub requested_at: DateTime<Utc>,
    pub timezone: String,
    pub confirmation_token: String,
    pub cancellation_token: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AppointmentPatch {
    pub status: Option<AppointmentStatus>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewContact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub consent: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub consent: bool,
    pub requested_at: DateTime<Utc>,
    pub timezone: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleRequest {
    pub new_scheduled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentStats {
    pub total: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub rescheduled: i64,
    pub cancelled: i64,
    pub rejected: i64,
    pub completed: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanCancelResponse {
    pub can_cancel: bool,
    /// Hours until the scheduled slot, clamped to >= 0, two decimals.
    pub hours_remaining: f64,
}

/// Result of a lifecycle transition. The store mutation always committed;
/// the two flags report the best-effort side effects.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub appointment: Appointment,
    pub reminder_synced: bool,
    pub notification_delivered: bool,
}

// ==============================================================================
// BUSINESS RULES
// ==============================================================================

#[derive(Debug, Clone)]
pub struct BookingRules {
    pub cancellation_window_hours: i64,
    pub reschedule_lead_hours: i64,
    pub horizon_months: u32,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            cancellation_window_hours: 24,
            reschedule_lead_hours: 24,
            horizon_months: 1,
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Invalid or unknown token")]
    InvalidToken,

    #[error("Appointment has no proposed time slot yet")]
    MissingSchedule,

    #[error("Operation not allowed while appointment is {0}")]
    InvalidState(AppointmentStatus),

    #[error("Invalid appointment date: {0}")]
    InvalidDate(String),

    #[error("Cancellation window closed: {hours_remaining:.2}h before the slot")]
    CancellationWindow { hours_remaining: f64 },

    #[error("Requested slot is outside bookable hours: {0}")]
    SlotLegality(String),

    #[error("Reminder scheduling failed: {0}")]
    Scheduler(String),

    #[error("Notification dispatch failed: {0}")]
    Notification(String),

    #[error("Database error: {0}")]
    Database(String),
}
