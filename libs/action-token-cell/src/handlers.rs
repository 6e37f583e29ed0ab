// libs/action-token-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use appointment_cell::services::lifecycle::AppointmentLifecycleService;
use appointment_cell::AppointmentStatus;
use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{EntityType, TokenAction, TokenError, VerifyOutcome};
use crate::services::registry::ActionTokenRegistry;

/// State for the email-action surface: the registry authorizes, the
/// lifecycle service executes.
pub struct ActionState {
    pub config: Arc<AppConfig>,
    pub registry: Arc<ActionTokenRegistry>,
    pub lifecycle: Arc<AppointmentLifecycleService>,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
    /// Alternative to the JSON body for GET email links.
    pub new_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ProposeBody {
    pub new_scheduled_at: DateTime<Utc>,
}

fn token_error(e: TokenError) -> AppError {
    AppError::Internal(e.to_string())
}

fn booking_error(e: appointment_cell::BookingError) -> AppError {
    use appointment_cell::BookingError;
    match e {
        BookingError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        BookingError::InvalidState(status) => AppError::Conflict(format!(
            "Operation not allowed while appointment is {}",
            status
        )),
        BookingError::MissingSchedule => {
            AppError::BadRequest("Appointment has no proposed time slot yet".to_string())
        }
        BookingError::InvalidDate(msg) | BookingError::SlotLegality(msg) => {
            AppError::BadRequest(msg)
        }
        other => AppError::Internal(other.to_string()),
    }
}

/// Spend the token and check it actually authorizes this appointment and
/// this action. Every failure mode collapses into an opaque refusal.
async fn consume_for(
    state: &ActionState,
    token: &str,
    appointment_id: Uuid,
    expected_action: TokenAction,
) -> Result<(), AppError> {
    let outcome = state
        .registry
        .verify_and_consume(token)
        .await
        .map_err(token_error)?;

    match outcome {
        VerifyOutcome::Invalid => Err(AppError::Gone(
            "This action link has expired or was already used".to_string(),
        )),
        VerifyOutcome::Valid {
            entity_type,
            entity_id,
            action,
        } => {
            if entity_type != EntityType::Appointment
                || entity_id != appointment_id
                || action != expected_action
            {
                return Err(AppError::Auth(
                    "Token does not authorize this action".to_string(),
                ));
            }
            Ok(())
        }
    }
}

#[axum::debug_handler]
pub async fn verify_token(
    State(state): State<Arc<ActionState>>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<Value>, AppError> {
    let outcome = state
        .registry
        .verify(&query.token)
        .await
        .map_err(token_error)?;

    let body = match outcome {
        VerifyOutcome::Invalid => json!({ "valid": false }),
        VerifyOutcome::Valid {
            entity_type,
            entity_id,
            action,
        } => json!({
            "valid": true,
            "entity_type": entity_type,
            "entity_id": entity_id,
            "action": action,
        }),
    };

    Ok(Json(body))
}

/// Accept the request: confirm at the proposed slot if one exists,
/// otherwise at the slot the client originally asked for.
#[axum::debug_handler]
pub async fn accept_appointment(
    State(state): State<Arc<ActionState>>,
    Path(appointment_id): Path<Uuid>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<Value>, AppError> {
    consume_for(&state, &query.token, appointment_id, TokenAction::Accept).await?;

    let appointment = state
        .lifecycle
        .get(appointment_id)
        .await
        .map_err(booking_error)?;
    let slot = appointment.scheduled_at.unwrap_or(appointment.requested_at);

    let outcome = state
        .lifecycle
        .confirm(appointment_id, slot)
        .await
        .map_err(booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": outcome.appointment,
        "reminder_synced": outcome.reminder_synced,
        "notification_delivered": outcome.notification_delivered,
        "message": "Appointment accepted and confirmed"
    })))
}

#[axum::debug_handler]
pub async fn reject_appointment(
    State(state): State<Arc<ActionState>>,
    Path(appointment_id): Path<Uuid>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<Value>, AppError> {
    consume_for(&state, &query.token, appointment_id, TokenAction::Reject).await?;

    let outcome = state
        .lifecycle
        .update_status(appointment_id, AppointmentStatus::Rejected)
        .await
        .map_err(booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": outcome.appointment,
        "notification_delivered": outcome.notification_delivered,
        "message": "Appointment request rejected"
    })))
}

#[axum::debug_handler]
pub async fn propose_appointment_reschedule(
    State(state): State<Arc<ActionState>>,
    Path(appointment_id): Path<Uuid>,
    Query(query): Query<TokenQuery>,
    body: Option<Json<ProposeBody>>,
) -> Result<Json<Value>, AppError> {
    let new_time = body
        .map(|Json(b)| b.new_scheduled_at)
        .or(query.new_time)
        .ok_or_else(|| AppError::BadRequest("A new time slot is required".to_string()))?;

    consume_for(&state, &query.token, appointment_id, TokenAction::Reschedule).await?;

    let outcome = state
        .lifecycle
        .propose_reschedule(appointment_id, new_time)
        .await
        .map_err(booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": outcome.appointment,
        "notification_delivered": outcome.notification_delivered,
        "message": "New slot proposed, pending client acceptance"
    })))
}
