use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::error::ReminderError;
use crate::models::{NewReminder, Reminder};

/// Persistence seam for reminder records (one row per appointment).
#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn upsert(&self, reminder: NewReminder) -> Result<Reminder, ReminderError>;
    async fn find_by_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<Reminder>, ReminderError>;
    async fn delete_by_appointment(&self, appointment_id: Uuid) -> Result<(), ReminderError>;
    async fn mark_sent(
        &self,
        appointment_id: Uuid,
        sent_at: DateTime<Utc>,
    ) -> Result<(), ReminderError>;
}

pub struct SupabaseReminderStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseReminderStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }
}

#[async_trait]
impl ReminderStore for SupabaseReminderStore {
    async fn upsert(&self, reminder: NewReminder) -> Result<Reminder, ReminderError> {
        let existing = self.find_by_appointment(reminder.appointment_id).await?;
        let now = Utc::now();

        let result: Vec<Value> = if existing.is_some() {
            let body = json!({
                "due_at": reminder.due_at.to_rfc3339(),
                "provider_ref": reminder.provider_ref,
                "sent_at": null,
                "updated_at": now.to_rfc3339(),
            });
            let path = format!(
                "/rest/v1/appointment_reminders?appointment_id=eq.{}",
                reminder.appointment_id
            );
            self.supabase
                .request_with_headers(Method::PATCH, &path, Some(body), Self::representation_headers())
                .await
                .map_err(|e| ReminderError::Database(e.to_string()))?
        } else {
            let body = json!({
                "id": Uuid::new_v4(),
                "appointment_id": reminder.appointment_id,
                "due_at": reminder.due_at.to_rfc3339(),
                "provider_ref": reminder.provider_ref,
                "sent_at": null,
                "created_at": now.to_rfc3339(),
                "updated_at": now.to_rfc3339(),
            });
            self.supabase
                .request_with_headers(
                    Method::POST,
                    "/rest/v1/appointment_reminders",
                    Some(body),
                    Self::representation_headers(),
                )
                .await
                .map_err(|e| ReminderError::Database(e.to_string()))?
        };

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| ReminderError::Database("upsert returned no row".to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| ReminderError::Database(format!("Failed to parse reminder: {}", e)))
    }

    async fn find_by_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<Reminder>, ReminderError> {
        let path = format!(
            "/rest/v1/appointment_reminders?appointment_id=eq.{}&limit=1",
            appointment_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| ReminderError::Database(e.to_string()))?;

        match result.into_iter().next() {
            None => Ok(None),
            Some(row) => serde_json::from_value(row)
                .map(Some)
                .map_err(|e| ReminderError::Database(format!("Failed to parse reminder: {}", e))),
        }
    }

    async fn delete_by_appointment(&self, appointment_id: Uuid) -> Result<(), ReminderError> {
        debug!("Deleting reminder record for appointment {}", appointment_id);
        let path = format!(
            "/rest/v1/appointment_reminders?appointment_id=eq.{}",
            appointment_id
        );
        self.supabase
            .execute(Method::DELETE, &path, None)
            .await
            .map_err(|e| ReminderError::Database(e.to_string()))
    }

    async fn mark_sent(
        &self,
        appointment_id: Uuid,
        sent_at: DateTime<Utc>,
    ) -> Result<(), ReminderError> {
        let path = format!(
            "/rest/v1/appointment_reminders?appointment_id=eq.{}",
            appointment_id
        );
        let body = json!({
            "sent_at": sent_at.to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });
        self.supabase
            .execute(Method::PATCH, &path, Some(body))
            .await
            .map_err(|e| ReminderError::Database(e.to_string()))
    }
}
