//! Flight duration across timezones
//!
//! Scheduled times arrive as naive local timestamps; the timezone of each end
//! comes from its airport. Both ends are converted to UTC before subtracting.

use chrono::{LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use crate::data::Leg;

/// Timestamp layouts seen from the timetable provider, tried in order
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Errors raised while computing a duration
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DurationError {
    /// Timestamp did not match any known layout
    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    /// Not an IANA timezone identifier
    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),

    /// Local time skipped by a daylight-saving transition
    #[error("'{timestamp}' does not exist in {timezone}")]
    NonexistentLocalTime { timestamp: String, timezone: String },

    /// Leg has no resolved airport to take a timezone from
    #[error("no timezone known for airport {0}")]
    MissingAirport(String),

    /// Delay values too large to apply
    #[error("delay out of range (departure {departure}, arrival {arrival})")]
    DelayOutOfRange { departure: i64, arrival: i64 },
}

/// Parses a naive provider timestamp
pub fn parse_naive_timestamp(value: &str) -> Result<NaiveDateTime, DurationError> {
    let trimmed = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| DurationError::InvalidTimestamp(value.to_string()))
}

/// Parses an IANA timezone identifier
pub fn parse_timezone(name: &str) -> Result<Tz, DurationError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| DurationError::UnknownTimezone(name.to_string()))
}

/// Converts a naive local timestamp in `timezone` to UTC
///
/// Ambiguous local times (clocks going back) resolve to the earlier instant.
fn to_utc(timestamp: &str, timezone: &str) -> Result<chrono::DateTime<Utc>, DurationError> {
    let naive = parse_naive_timestamp(timestamp)?;
    let tz = parse_timezone(timezone)?;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(local) => Ok(local.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(DurationError::NonexistentLocalTime {
            timestamp: timestamp.to_string(),
            timezone: timezone.to_string(),
        }),
    }
}

/// Computes scheduled flight time in whole minutes
///
/// # Arguments
/// * `departure_scheduled` - Naive local departure time
/// * `arrival_scheduled` - Naive local arrival time
/// * `departure_tz` - IANA zone of the departure airport
/// * `arrival_tz` - IANA zone of the arrival airport
///
/// # Returns
/// * `Ok(minutes)` - UTC difference, floored to whole minutes
/// * `Err(DurationError)` - Malformed timestamp or unknown zone
pub fn compute_flight_minutes(
    departure_scheduled: &str,
    arrival_scheduled: &str,
    departure_tz: &str,
    arrival_tz: &str,
) -> Result<i64, DurationError> {
    let departure = to_utc(departure_scheduled, departure_tz)?;
    let arrival = to_utc(arrival_scheduled, arrival_tz)?;

    Ok((arrival - departure).num_seconds().div_euclid(60))
}

/// Applies the observed delay delta to a scheduled duration
///
/// Only adjusts when both legs report a delay.
pub fn adjust_for_delays(
    minutes: i64,
    departure_delay: Option<i64>,
    arrival_delay: Option<i64>,
) -> Result<i64, DurationError> {
    match (departure_delay, arrival_delay) {
        (Some(departure), Some(arrival)) => arrival
            .checked_sub(departure)
            .and_then(|delta| minutes.checked_add(delta))
            .ok_or(DurationError::DelayOutOfRange { departure, arrival }),
        _ => Ok(minutes),
    }
}

/// Effective flight time for two resolved legs
///
/// Both legs must carry their airport metadata, which supplies the zones.
pub fn flight_minutes(departure: &Leg, arrival: &Leg) -> Result<i64, DurationError> {
    let departure_tz = leg_timezone(departure)?;
    let arrival_tz = leg_timezone(arrival)?;

    let scheduled = compute_flight_minutes(
        &departure.scheduled_time,
        &arrival.scheduled_time,
        departure_tz,
        arrival_tz,
    )?;

    adjust_for_delays(scheduled, departure.delay, arrival.delay)
}

fn leg_timezone(leg: &Leg) -> Result<&str, DurationError> {
    leg.persistent
        .as_ref()
        .map(|airport| airport.timezone.as_str())
        .ok_or_else(|| DurationError::MissingAirport(leg.iata.clone()))
}
