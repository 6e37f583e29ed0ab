pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use error::*;
pub use models::*;
pub use services::coordinator::{ReminderCoordinator, REMINDER_LEAD_HOURS, REMINDER_QUEUE};
pub use services::scheduler::{DelayedJobScheduler, RedisJobScheduler};
pub use services::worker::{JobConsumer, ReminderWorker};
pub use store::{ReminderStore, SupabaseReminderStore};
