// libs/appointment-cell/src/services/validation.rs
//
// Pure time-window predicates. Every function takes the current instant and
// the zones it needs as arguments so tests can pin arbitrary clocks.
use chrono::{DateTime, Duration, Months, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use shared_utils::time::parse_zone;

use crate::models::{AppointmentStatus, BookingError, BookingRules};

/// A booking request must land strictly after tomorrow 00:00:00 and
/// strictly before the same day next month at 23:59:59. Both bounds are
/// computed in the reference zone, then compared in the caller's zone.
/// Fails closed on an unknown timezone.
pub fn validate_booking_horizon(
    requested_at: DateTime<Utc>,
    caller_timezone: &str,
    reference_tz: Tz,
    now: DateTime<Utc>,
    rules: &BookingRules,
) -> Result<(), BookingError> {
    let caller_zone = parse_zone(caller_timezone)
        .map_err(|_| BookingError::InvalidDate(format!("unknown timezone '{}'", caller_timezone)))?;

    let today = now.with_timezone(&reference_tz).date_naive();

    let earliest_naive = today
        .succ_opt()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .ok_or_else(|| BookingError::InvalidDate("date out of range".to_string()))?;
    let latest_naive = today
        .checked_add_months(Months::new(rules.horizon_months))
        .and_then(|day| day.and_hms_opt(23, 59, 59))
        .ok_or_else(|| BookingError::InvalidDate("date out of range".to_string()))?;

    let earliest = reference_tz
        .from_local_datetime(&earliest_naive)
        .earliest()
        .ok_or_else(|| BookingError::InvalidDate("date out of range".to_string()))?;
    let latest = reference_tz
        .from_local_datetime(&latest_naive)
        .latest()
        .ok_or_else(|| BookingError::InvalidDate("date out of range".to_string()))?;

    let requested = requested_at.with_timezone(&caller_zone);
    let earliest = earliest.with_timezone(&caller_zone);
    let latest = latest.with_timezone(&caller_zone);

    if requested <= earliest || requested >= latest {
        return Err(BookingError::InvalidDate(format!(
            "requested slot must fall between {} and {}",
            earliest.to_rfc3339(),
            latest.to_rfc3339()
        )));
    }

    Ok(())
}

/// Bookable slots, evaluated in the reference zone: 08:00-11:30 and
/// 14:00-16:30 on the hour or half hour, plus 17:00 exactly.
pub fn validate_slot(proposed: DateTime<Utc>, reference_tz: Tz) -> Result<(), BookingError> {
    let local = proposed.with_timezone(&reference_tz);
    let hour = local.hour();
    let minute = local.minute();

    if minute != 0 && minute != 30 {
        return Err(BookingError::SlotLegality(format!(
            "slots start on the hour or half hour, got {:02}:{:02}",
            hour, minute
        )));
    }

    let in_morning = (8..12).contains(&hour);
    let in_afternoon = (14..17).contains(&hour) || (hour == 17 && minute == 0);

    if !in_morning && !in_afternoon {
        return Err(BookingError::SlotLegality(format!(
            "{:02}:{:02} is outside opening hours",
            hour, minute
        )));
    }

    Ok(())
}

/// A newly proposed slot needs at least the configured lead time.
pub fn validate_reschedule_lead(
    new_at: DateTime<Utc>,
    now: DateTime<Utc>,
    rules: &BookingRules,
) -> Result<(), BookingError> {
    if new_at - now < Duration::hours(rules.reschedule_lead_hours) {
        return Err(BookingError::InvalidDate(format!(
            "a new slot must be at least {} hours ahead",
            rules.reschedule_lead_hours
        )));
    }
    Ok(())
}

/// Whether the public flow may cancel, plus the remaining hours until the
/// slot (clamped to >= 0, rounded to two decimals). Pending requests are
/// always cancellable; rescheduled ones too, since the client never agreed
/// to the proposed time; confirmed ones only outside the window.
pub fn cancellation_window(
    status: &AppointmentStatus,
    scheduled_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    rules: &BookingRules,
) -> (bool, f64) {
    let hours_remaining = scheduled_at
        .map(|at| {
            let hours = (at - now).num_seconds() as f64 / 3600.0;
            (hours.max(0.0) * 100.0).round() / 100.0
        })
        .unwrap_or(0.0);

    let allowed = match status {
        AppointmentStatus::Pending | AppointmentStatus::Rescheduled => true,
        AppointmentStatus::Confirmed => match scheduled_at {
            Some(at) => at - now >= Duration::hours(rules.cancellation_window_hours),
            None => true,
        },
        _ => false,
    };

    (allowed, hours_remaining)
}
