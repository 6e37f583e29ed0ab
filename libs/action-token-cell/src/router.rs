// libs/action-token-cell/src/router.rs
use std::sync::Arc;

use axum::{routing::get, Router};

use crate::handlers::{self, ActionState};

/// Email-action surface. GET variants exist so the links work straight
/// from a mail client; POST variants serve programmatic callers.
pub fn action_routes(state: Arc<ActionState>) -> Router {
    Router::new()
        .route("/verify", get(handlers::verify_token))
        .route(
            "/appointments/{appointment_id}/accept",
            get(handlers::accept_appointment).post(handlers::accept_appointment),
        )
        .route(
            "/appointments/{appointment_id}/reject",
            get(handlers::reject_appointment).post(handlers::reject_appointment),
        )
        .route(
            "/appointments/{appointment_id}/propose-reschedule",
            get(handlers::propose_appointment_reschedule)
                .post(handlers::propose_appointment_reschedule),
        )
        .with_state(state)
}
