// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};

use shared_utils::extractor::{auth_middleware, require_admin};

use crate::handlers::{self, AppointmentState};

/// Public surface: token-authorized links, no login.
pub fn appointment_routes(state: Arc<AppointmentState>) -> Router {
    Router::new()
        .route("/", post(handlers::create_appointment))
        .route("/{appointment_id}/confirm", get(handlers::confirm_appointment))
        .route("/{appointment_id}/cancel", get(handlers::cancel_appointment))
        .route("/{appointment_id}/can-cancel", get(handlers::can_cancel_appointment))
        .with_state(state)
}

/// Backoffice surface: bearer JWT plus the admin role.
pub fn admin_appointment_routes(state: Arc<AppointmentState>) -> Router {
    let config = state.config.clone();

    Router::new()
        .route("/", get(handlers::list_appointments))
        .route("/stats", get(handlers::get_appointment_stats))
        .route("/upcoming", get(handlers::get_upcoming_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}", delete(handlers::delete_appointment))
        .route("/{appointment_id}/status", patch(handlers::update_appointment_status))
        .route("/{appointment_id}/reschedule", patch(handlers::reschedule_appointment))
        .route("/{appointment_id}/propose-reschedule", post(handlers::propose_reschedule))
        .route("/{appointment_id}/send-reminder", post(handlers::send_appointment_reminder))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(state)
}
