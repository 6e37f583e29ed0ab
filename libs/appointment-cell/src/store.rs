// libs/appointment-cell/src/store.rs
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::models::{
    Appointment, AppointmentFilter, AppointmentPatch, BookingError, Contact, NewAppointment,
    NewContact,
};

/// Persistence seam for appointments.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, BookingError>;
    async fn find(&self, id: Uuid) -> Result<Option<Appointment>, BookingError>;
    async fn find_with_contact(
        &self,
        id: Uuid,
    ) -> Result<Option<(Appointment, Contact)>, BookingError>;
    async fn update(
        &self,
        id: Uuid,
        patch: AppointmentPatch,
    ) -> Result<Appointment, BookingError>;
    async fn delete(&self, id: Uuid) -> Result<(), BookingError>;
    async fn list(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, BookingError>;
}

/// Persistence seam for contacts.
#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn upsert(&self, contact: NewContact) -> Result<Contact, BookingError>;
    async fn find(&self, id: Uuid) -> Result<Option<Contact>, BookingError>;
}

fn representation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}

fn parse_row<T: serde::de::DeserializeOwned>(rows: Vec<Value>, what: &str) -> Result<T, BookingError> {
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| BookingError::Database(format!("{} returned no row", what)))?;
    serde_json::from_value(row)
        .map_err(|e| BookingError::Database(format!("Failed to parse {}: {}", what, e)))
}

pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, BookingError> {
        let now = Utc::now();
        let appointment_data = json!({
            "id": Uuid::new_v4(),
            "contact_id": appointment.contact_id,
            "status": "pending",
            "requested_at": appointment.requested_at.to_rfc3339(),
            "scheduled_at": null,
            "timezone": appointment.timezone,
            "confirmation_token": appointment.confirmation_token,
            "cancellation_token": appointment.cancellation_token,
            "confirmed_at": null,
            "cancelled_at": null,
            "notes": appointment.notes,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(appointment_data),
                representation_headers(),
            )
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        parse_row(result, "created appointment")
    }

    async fn find(&self, id: Uuid) -> Result<Option<Appointment>, BookingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        match result.into_iter().next() {
            None => Ok(None),
            Some(row) => serde_json::from_value(row).map(Some).map_err(|e| {
                BookingError::Database(format!("Failed to parse appointment: {}", e))
            }),
        }
    }

    async fn find_with_contact(
        &self,
        id: Uuid,
    ) -> Result<Option<(Appointment, Contact)>, BookingError> {
        let Some(appointment) = self.find(id).await? else {
            return Ok(None);
        };

        let path = format!("/rest/v1/contacts?id=eq.{}", appointment.contact_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        let contact: Contact = parse_row(result, "contact")?;
        Ok(Some((appointment, contact)))
    }

    async fn update(
        &self,
        id: Uuid,
        patch: AppointmentPatch,
    ) -> Result<Appointment, BookingError> {
        let mut update_data = serde_json::Map::new();

        if let Some(status) = patch.status {
            update_data.insert("status".to_string(), json!(status.to_string()));
        }
        if let Some(scheduled_at) = patch.scheduled_at {
            update_data.insert("scheduled_at".to_string(), json!(scheduled_at.to_rfc3339()));
        }
        if let Some(confirmed_at) = patch.confirmed_at {
            update_data.insert("confirmed_at".to_string(), json!(confirmed_at.to_rfc3339()));
        }
        if let Some(cancelled_at) = patch.cancelled_at {
            update_data.insert("cancelled_at".to_string(), json!(cancelled_at.to_rfc3339()));
        }
        if let Some(notes) = patch.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(Value::Object(update_data)),
                representation_headers(),
            )
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        if result.is_empty() {
            return Err(BookingError::NotFound);
        }
        parse_row(result, "updated appointment")
    }

    async fn delete(&self, id: Uuid) -> Result<(), BookingError> {
        debug!("Deleting appointment {}", id);
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        self.supabase
            .execute(Method::DELETE, &path, None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))
    }

    async fn list(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, BookingError> {
        let mut query_parts = Vec::new();

        if let Some(status) = filter.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(from_date) = filter.from_date {
            // URL-encoded RFC3339 so PostgREST accepts the timestamp
            let encoded = urlencoding::encode(&from_date.to_rfc3339()).into_owned();
            query_parts.push(format!("scheduled_at=gte.{}", encoded));
        }
        if let Some(to_date) = filter.to_date {
            let encoded = urlencoding::encode(&to_date.to_rfc3339()).into_owned();
            query_parts.push(format!("scheduled_at=lte.{}", encoded));
        }

        let mut path = format!(
            "/rest/v1/appointments?{}&order=created_at.desc",
            query_parts.join("&")
        );

        if let Some(limit) = filter.limit {
            path.push_str(&format!("&limit={}", limit));
        }
        if let Some(offset) = filter.offset {
            path.push_str(&format!("&offset={}", offset));
        }

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        result
            .into_iter()
            .map(|row| serde_json::from_value(row))
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| BookingError::Database(format!("Failed to parse appointments: {}", e)))
    }
}

pub struct SupabaseContactStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseContactStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl ContactStore for SupabaseContactStore {
    async fn upsert(&self, contact: NewContact) -> Result<Contact, BookingError> {
        let now = Utc::now();
        let path = format!(
            "/rest/v1/contacts?email=eq.{}",
            urlencoding::encode(&contact.email)
        );
        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        let result: Vec<Value> = if existing.is_empty() {
            let contact_data = json!({
                "id": Uuid::new_v4(),
                "first_name": contact.first_name,
                "last_name": contact.last_name,
                "email": contact.email,
                "phone": contact.phone,
                "consent": contact.consent,
                "created_at": now.to_rfc3339(),
                "updated_at": now.to_rfc3339(),
            });
            self.supabase
                .request_with_headers(
                    Method::POST,
                    "/rest/v1/contacts",
                    Some(contact_data),
                    representation_headers(),
                )
                .await
                .map_err(|e| BookingError::Database(e.to_string()))?
        } else {
            let contact_data = json!({
                "first_name": contact.first_name,
                "last_name": contact.last_name,
                "phone": contact.phone,
                "consent": contact.consent,
                "updated_at": now.to_rfc3339(),
            });
            self.supabase
                .request_with_headers(
                    Method::PATCH,
                    &path,
                    Some(contact_data),
                    representation_headers(),
                )
                .await
                .map_err(|e| BookingError::Database(e.to_string()))?
        };

        parse_row(result, "contact")
    }

    async fn find(&self, id: Uuid) -> Result<Option<Contact>, BookingError> {
        let path = format!("/rest/v1/contacts?id=eq.{}", id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        match result.into_iter().next() {
            None => Ok(None),
            Some(row) => serde_json::from_value(row)
                .map(Some)
                .map_err(|e| BookingError::Database(format!("Failed to parse contact: {}", e))),
        }
    }
}
