use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use shared_database::SupabaseClient;

use crate::models::{ActionToken, TokenError};

/// Persistence seam for action tokens.
#[async_trait]
pub trait ActionTokenStore: Send + Sync {
    async fn insert(&self, token: ActionToken) -> Result<(), TokenError>;
    async fn find(&self, token: &str) -> Result<Option<ActionToken>, TokenError>;
    /// Atomically flip `is_used` from false to true. Returns false when the
    /// token was already spent, so two concurrent consumers can never both
    /// win.
    async fn consume(&self, token: &str) -> Result<bool, TokenError>;
}

pub struct SupabaseActionTokenStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseActionTokenStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl ActionTokenStore for SupabaseActionTokenStore {
    async fn insert(&self, token: ActionToken) -> Result<(), TokenError> {
        let body = json!({
            "token": token.token,
            "entity_type": token.entity_type.to_string(),
            "entity_id": token.entity_id,
            "action": token.action.to_string(),
            "expires_at": token.expires_at.to_rfc3339(),
            "is_used": token.is_used,
            "created_at": token.created_at.to_rfc3339(),
        });

        self.supabase
            .execute(Method::POST, "/rest/v1/action_tokens", Some(body))
            .await
            .map_err(|e| TokenError::Database(e.to_string()))
    }

    async fn find(&self, token: &str) -> Result<Option<ActionToken>, TokenError> {
        let path = format!(
            "/rest/v1/action_tokens?token=eq.{}&limit=1",
            urlencoding::encode(token)
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| TokenError::Database(e.to_string()))?;

        match result.into_iter().next() {
            None => Ok(None),
            Some(row) => serde_json::from_value(row)
                .map(Some)
                .map_err(|e| TokenError::Database(format!("Failed to parse action token: {}", e))),
        }
    }

    async fn consume(&self, token: &str) -> Result<bool, TokenError> {
        // The is_used filter makes the flip conditional server-side; an
        // empty representation means someone else spent it first.
        let path = format!(
            "/rest/v1/action_tokens?token=eq.{}&is_used=eq.false",
            urlencoding::encode(token)
        );
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let updated: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(json!({ "is_used": true })),
                headers,
            )
            .await
            .map_err(|e| TokenError::Database(e.to_string()))?;

        debug!("Consume of action token matched {} row(s)", updated.len());
        Ok(!updated.is_empty())
    }
}
