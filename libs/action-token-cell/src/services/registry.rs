use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use appointment_cell::ActionTokenIssuer;
use shared_utils::time::Clock;
use shared_utils::token::generate_secure_token;

use crate::models::{
    ActionToken, EntityType, TokenAction, TokenError, VerifyOutcome, DEFAULT_TTL_HOURS,
};
use crate::store::ActionTokenStore;

/// Generic single-use token registry backing the email-action links.
/// Verification fails closed: anything not a live, unspent, unexpired token
/// is simply invalid.
pub struct ActionTokenRegistry {
    store: Arc<dyn ActionTokenStore>,
    clock: Arc<dyn Clock>,
}

impl ActionTokenRegistry {
    pub fn new(store: Arc<dyn ActionTokenStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
        action: TokenAction,
        ttl_hours: Option<i64>,
    ) -> Result<String, TokenError> {
        let now = self.clock.now();
        let token = generate_secure_token();
        let entity_label = format!("{} {}", entity_type, entity_id);

        self.store
            .insert(ActionToken {
                token: token.clone(),
                entity_type,
                entity_id,
                action,
                expires_at: now + Duration::hours(ttl_hours.unwrap_or(DEFAULT_TTL_HOURS)),
                is_used: false,
                created_at: now,
            })
            .await?;

        info!("Action token minted for {}", entity_label);
        Ok(token)
    }

    /// Read-only check, no mutation.
    pub async fn verify(&self, token: &str) -> Result<VerifyOutcome, TokenError> {
        let Some(record) = self.store.find(token).await? else {
            return Ok(VerifyOutcome::Invalid);
        };

        if record.is_used || record.expires_at <= self.clock.now() {
            return Ok(VerifyOutcome::Invalid);
        }

        Ok(VerifyOutcome::Valid {
            entity_type: record.entity_type,
            entity_id: record.entity_id,
            action: record.action,
        })
    }

    /// Verify and, if valid, atomically mark the token spent. A concurrent
    /// consumer losing the conditional update gets `Invalid`.
    pub async fn verify_and_consume(&self, token: &str) -> Result<VerifyOutcome, TokenError> {
        let outcome = self.verify(token).await?;
        if matches!(outcome, VerifyOutcome::Invalid) {
            return Ok(VerifyOutcome::Invalid);
        }

        if !self.store.consume(token).await? {
            debug!("Action token lost the consume race");
            return Ok(VerifyOutcome::Invalid);
        }

        Ok(outcome)
    }
}

#[async_trait]
impl ActionTokenIssuer for ActionTokenRegistry {
    async fn issue(&self, appointment_id: Uuid, action: &str) -> anyhow::Result<String> {
        let action = TokenAction::parse(action)
            .ok_or_else(|| anyhow::anyhow!("unknown action '{}'", action))?;
        let token = self
            .create(EntityType::Appointment, appointment_id, action, None)
            .await?;
        Ok(token)
    }
}
