use std::sync::Arc;

use axum::{routing::get, Router};

use action_token_cell::handlers::ActionState;
use action_token_cell::router::action_routes;
use appointment_cell::handlers::AppointmentState;
use appointment_cell::router::{admin_appointment_routes, appointment_routes};

pub fn create_router(
    appointments: Arc<AppointmentState>,
    actions: Arc<ActionState>,
) -> Router {
    Router::new()
        .route("/", get(|| async { "Atelier Booking API is running!" }))
        .nest("/appointments", appointment_routes(appointments.clone()))
        .nest("/admin/appointments", admin_appointment_routes(appointments))
        .nest("/actions", action_routes(actions))
}
