use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimeError {
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}

/// Injected wall clock so every time-window rule can be tested against a
/// pinned instant instead of the ambient system time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock frozen at a fixed instant.
pub struct FixedClock {
    instant: DateTime<Utc>,
}

impl FixedClock {
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self { instant }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.instant
    }
}

/// Resolve an IANA timezone identifier, failing closed on anything
/// unrecognised.
pub fn parse_zone(name: &str) -> Result<Tz, TimeError> {
    name.parse::<Tz>()
        .map_err(|_| TimeError::UnknownTimezone(name.to_string()))
}

/// Render an instant in the caller's zone for human-facing messages,
/// falling back to the reference zone when the stored zone is unparseable.
pub fn format_in_zone(instant: DateTime<Utc>, zone_name: &str, fallback: Tz) -> String {
    let zone = parse_zone(zone_name).unwrap_or(fallback);
    instant
        .with_timezone(&zone)
        .format("%A %d %B %Y, %H:%M (%Z)")
        .to_string()
}
