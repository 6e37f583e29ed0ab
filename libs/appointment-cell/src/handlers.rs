// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    AppointmentFilter, AppointmentStatus, BookingError, CreateAppointmentRequest,
    RescheduleRequest, UpdateStatusRequest,
};
use crate::services::lifecycle::AppointmentLifecycleService;

/// Shared state for the appointment routers. The lifecycle service is built
/// once at startup and carries all collaborators.
pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub lifecycle: Arc<AppointmentLifecycleService>,
}

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct AppointmentQueryParams {
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    pub days: Option<i64>,
}

fn into_app_error(e: BookingError) -> AppError {
    match e {
        BookingError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        BookingError::InvalidToken => AppError::Auth("Invalid or unknown token".to_string()),
        BookingError::MissingSchedule => {
            AppError::BadRequest("Appointment has no proposed time slot yet".to_string())
        }
        BookingError::InvalidState(status) => AppError::Conflict(format!(
            "Operation not allowed while appointment is {}",
            status
        )),
        BookingError::InvalidDate(msg) | BookingError::SlotLegality(msg) => {
            AppError::BadRequest(msg)
        }
        BookingError::CancellationWindow { hours_remaining } => AppError::BadRequest(format!(
            "Cancellations require 24 hours notice ({:.2}h remaining)",
            hours_remaining
        )),
        BookingError::Scheduler(msg) => AppError::Internal(msg),
        BookingError::Notification(msg) => AppError::ExternalService(msg),
        BookingError::Database(msg) => AppError::Internal(msg),
    }
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppointmentState>>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = state
        .lifecycle
        .create(request)
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": outcome.appointment,
        "notification_delivered": outcome.notification_delivered,
        "message": "Appointment request received"
    })))
}

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<Value>, AppError> {
    let outcome = state
        .lifecycle
        .confirm_by_token(appointment_id, &query.token)
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": outcome.appointment,
        "reminder_synced": outcome.reminder_synced,
        "notification_delivered": outcome.notification_delivered,
        "message": "Appointment confirmed"
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<Value>, AppError> {
    let outcome = state
        .lifecycle
        .cancel(appointment_id, &query.token)
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": outcome.appointment,
        "reminder_synced": outcome.reminder_synced,
        "notification_delivered": outcome.notification_delivered,
        "message": "Appointment cancelled"
    })))
}

#[axum::debug_handler]
pub async fn can_cancel_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<Value>, AppError> {
    let response = state
        .lifecycle
        .can_cancel(appointment_id, &query.token)
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!(response)))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppointmentState>>,
    Query(params): Query<AppointmentQueryParams>,
) -> Result<Json<Value>, AppError> {
    let appointments = state
        .lifecycle
        .list(AppointmentFilter {
            status: params.status,
            from_date: params.from_date,
            to_date: params.to_date,
            limit: params.limit,
            offset: params.offset,
        })
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "count": appointments.len(),
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .lifecycle
        .get(appointment_id)
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn get_appointment_stats(
    State(state): State<Arc<AppointmentState>>,
) -> Result<Json<Value>, AppError> {
    let stats = state.lifecycle.stats().await.map_err(into_app_error)?;
    Ok(Json(json!(stats)))
}

#[axum::debug_handler]
pub async fn get_upcoming_appointments(
    State(state): State<Arc<AppointmentState>>,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<Value>, AppError> {
    let appointments = state
        .lifecycle
        .upcoming(query.days.unwrap_or(7))
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "count": appointments.len(),
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = state
        .lifecycle
        .update_status(appointment_id, request.status)
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": outcome.appointment,
        "reminder_synced": outcome.reminder_synced,
        "notification_delivered": outcome.notification_delivered
    })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = state
        .lifecycle
        .reschedule(appointment_id, request.new_scheduled_at)
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": outcome.appointment,
        "reminder_synced": outcome.reminder_synced,
        "notification_delivered": outcome.notification_delivered,
        "message": "Appointment rescheduled"
    })))
}

#[axum::debug_handler]
pub async fn propose_reschedule(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = state
        .lifecycle
        .propose_reschedule(appointment_id, request.new_scheduled_at)
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": outcome.appointment,
        "notification_delivered": outcome.notification_delivered,
        "message": "New slot proposed, pending client acceptance"
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state
        .lifecycle
        .delete(appointment_id)
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment deleted"
    })))
}

#[axum::debug_handler]
pub async fn send_appointment_reminder(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let sent = state
        .lifecycle
        .send_reminder(appointment_id)
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "success": true,
        "sent": sent
    })))
}
