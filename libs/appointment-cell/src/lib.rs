pub mod handlers;
pub mod locks;
pub mod models;
pub mod notify;
pub mod router;
pub mod services;
pub mod store;

pub use models::*;
pub use notify::{HttpMailNotifier, NotificationError, Notifier};
pub use services::lifecycle::{ActionTokenIssuer, AppointmentLifecycleService};
pub use services::reminders::ReminderDispatch;
pub use store::{
    AppointmentStore, ContactStore, SupabaseAppointmentStore, SupabaseContactStore,
};
