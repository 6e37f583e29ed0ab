use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    /// Point the PostgREST client at a wiremock server.
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            redis_url: None,
            mail_api_url: String::new(),
            mail_api_key: String::new(),
            mail_from_address: "no-reply@test.local".to_string(),
            admin_notification_address: "admin@test.local".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            reference_timezone: "Europe/Paris".to_string(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "client".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn client(email: &str) -> Self {
        Self::new(email, "client")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned PostgREST row bodies for wiremock-backed store tests.
pub struct MockPostgrestResponses;

impl MockPostgrestResponses {
    pub fn contact_response(contact_id: Uuid, email: &str) -> serde_json::Value {
        json!({
            "id": contact_id,
            "first_name": "Test",
            "last_name": "Contact",
            "email": email,
            "phone": null,
            "consent": true,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn appointment_response(
        appointment_id: Uuid,
        contact_id: Uuid,
        status: &str,
        requested_at: DateTime<Utc>,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "contact_id": contact_id,
            "status": status,
            "requested_at": requested_at.to_rfc3339(),
            "scheduled_at": scheduled_at.map(|dt| dt.to_rfc3339()),
            "timezone": "Europe/Paris",
            "confirmation_token": "confirmation-token-fixture-aaaaaaaaaaaaaaaaaaaaaaaa",
            "cancellation_token": "cancellation-token-fixture-bbbbbbbbbbbbbbbbbbbbbbbb",
            "confirmed_at": null,
            "cancelled_at": null,
            "notes": null,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn reminder_response(
        appointment_id: Uuid,
        due_at: DateTime<Utc>,
        provider_ref: Option<&str>,
    ) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "appointment_id": appointment_id,
            "due_at": due_at.to_rfc3339(),
            "provider_ref": provider_ref,
            "sent_at": null,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn action_token_response(
        token: &str,
        entity_id: Uuid,
        action: &str,
        expires_at: DateTime<Utc>,
        is_used: bool,
    ) -> serde_json::Value {
        json!({
            "token": token,
            "entity_type": "appointment",
            "entity_id": entity_id,
            "action": action,
            "expires_at": expires_at.to_rfc3339(),
            "is_used": is_used,
            "created_at": "2025-01-01T00:00:00Z"
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.reference_timezone, "Europe/Paris");
        assert!(app_config.is_configured());
    }

    #[test]
    fn admin_test_user_maps_to_admin_role() {
        let user = TestUser::admin("boss@example.com").to_user();
        assert!(user.is_admin());
    }
}
