use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Default lifetime of an emailed action link.
pub const DEFAULT_TTL_HOURS: i64 = 72;

/// A short-lived, single-use secret authorizing one action on one entity.
/// The token string itself is the lookup key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionToken {
    pub token: String,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub action: TokenAction,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Appointment,
    Quote,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::Appointment => write!(f, "appointment"),
            EntityType::Quote => write!(f, "quote"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenAction {
    Accept,
    Reject,
    Reschedule,
}

impl fmt::Display for TokenAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenAction::Accept => write!(f, "accept"),
            TokenAction::Reject => write!(f, "reject"),
            TokenAction::Reschedule => write!(f, "reschedule"),
        }
    }
}

impl TokenAction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "accept" => Some(TokenAction::Accept),
            "reject" => Some(TokenAction::Reject),
            "reschedule" => Some(TokenAction::Reschedule),
            _ => None,
        }
    }
}

/// Outcome of a verification. Expired, spent and unknown tokens all
/// collapse into `Invalid`: the caller learns nothing about why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Invalid,
    Valid {
        entity_type: EntityType,
        entity_id: Uuid,
        action: TokenAction,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Database error: {0}")]
    Database(String),
}
