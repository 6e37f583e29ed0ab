use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use action_token_cell::{
    ActionToken, ActionTokenRegistry, ActionTokenStore, EntityType, TokenAction, TokenError,
    VerifyOutcome,
};
use shared_utils::time::FixedClock;

struct InMemoryActionTokenStore {
    rows: Mutex<HashMap<String, ActionToken>>,
}

impl InMemoryActionTokenStore {
    fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ActionTokenStore for InMemoryActionTokenStore {
    async fn insert(&self, token: ActionToken) -> Result<(), TokenError> {
        self.rows.lock().unwrap().insert(token.token.clone(), token);
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<ActionToken>, TokenError> {
        Ok(self.rows.lock().unwrap().get(token).cloned())
    }

    async fn consume(&self, token: &str) -> Result<bool, TokenError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(token) {
            Some(record) if !record.is_used => {
                record.is_used = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

fn registry_at(
    store: Arc<InMemoryActionTokenStore>,
    now: DateTime<Utc>,
) -> ActionTokenRegistry {
    ActionTokenRegistry::new(store, Arc::new(FixedClock::at(now)))
}

#[tokio::test]
async fn fresh_token_verifies_without_being_spent() {
    let store = Arc::new(InMemoryActionTokenStore::new());
    let registry = registry_at(store.clone(), test_now());
    let entity_id = Uuid::new_v4();

    let token = registry
        .create(EntityType::Appointment, entity_id, TokenAction::Accept, None)
        .await
        .unwrap();

    // verify twice: read-only, so both succeed
    for _ in 0..2 {
        let outcome = registry.verify(&token).await.unwrap();
        assert_eq!(
            outcome,
            VerifyOutcome::Valid {
                entity_type: EntityType::Appointment,
                entity_id,
                action: TokenAction::Accept,
            }
        );
    }
}

#[tokio::test]
async fn consume_succeeds_exactly_once() {
    let store = Arc::new(InMemoryActionTokenStore::new());
    let registry = registry_at(store.clone(), test_now());

    let token = registry
        .create(
            EntityType::Appointment,
            Uuid::new_v4(),
            TokenAction::Reject,
            None,
        )
        .await
        .unwrap();

    let first = registry.verify_and_consume(&token).await.unwrap();
    assert!(matches!(first, VerifyOutcome::Valid { .. }));

    let second = registry.verify_and_consume(&token).await.unwrap();
    assert_eq!(second, VerifyOutcome::Invalid);

    // And plain verify agrees the token is dead.
    assert_eq!(registry.verify(&token).await.unwrap(), VerifyOutcome::Invalid);
}

#[tokio::test]
async fn expired_token_is_invalid_even_if_unused() {
    let store = Arc::new(InMemoryActionTokenStore::new());
    let minted_at = registry_at(store.clone(), test_now());

    let token = minted_at
        .create(
            EntityType::Appointment,
            Uuid::new_v4(),
            TokenAction::Reschedule,
            Some(72),
        )
        .await
        .unwrap();

    // 73 hours later the link is dead.
    let later = registry_at(store.clone(), test_now() + Duration::hours(73));
    assert_eq!(later.verify(&token).await.unwrap(), VerifyOutcome::Invalid);
    assert_eq!(
        later.verify_and_consume(&token).await.unwrap(),
        VerifyOutcome::Invalid
    );
}

#[tokio::test]
async fn unknown_token_is_invalid() {
    let store = Arc::new(InMemoryActionTokenStore::new());
    let registry = registry_at(store, test_now());

    assert_eq!(
        registry.verify("no-such-token").await.unwrap(),
        VerifyOutcome::Invalid
    );
}

#[tokio::test]
async fn tokens_for_different_actions_are_distinct() {
    let store = Arc::new(InMemoryActionTokenStore::new());
    let registry = registry_at(store, test_now());
    let entity_id = Uuid::new_v4();

    let accept = registry
        .create(EntityType::Appointment, entity_id, TokenAction::Accept, None)
        .await
        .unwrap();
    let reject = registry
        .create(EntityType::Appointment, entity_id, TokenAction::Reject, None)
        .await
        .unwrap();

    assert_ne!(accept, reject);

    let outcome = registry.verify(&reject).await.unwrap();
    assert!(matches!(
        outcome,
        VerifyOutcome::Valid {
            action: TokenAction::Reject,
            ..
        }
    ));
}
