//! Core data models for the FlightBar server
//!
//! This module contains the normalized record types served to clients and
//! cached between requests, plus the upstream provider clients that produce
//! them.

pub mod airport;
pub mod live;
pub mod schedule;

pub use airport::AirportClient;
pub use live::LiveClient;
pub use schedule::ScheduleClient;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Flight status as reported by the schedule provider
///
/// Upstream statuses outside this set (cancelled, diverted, ...) normalize to
/// `Unknown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightStatus {
    Scheduled,
    Active,
    Landed,
    #[default]
    Unknown,
}

impl FlightStatus {
    /// Maps a provider status string onto a known status, case-insensitively
    pub fn from_upstream(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Self::Scheduled,
            "active" | "en-route" | "airborne" => Self::Active,
            "landed" => Self::Landed,
            _ => Self::Unknown,
        }
    }

    /// Whether live telemetry is worth fetching for a flight in this state.
    ///
    /// Only airborne or ambiguous flights are tracked; landed and
    /// not-yet-departed flights have no useful position.
    pub fn wants_live_telemetry(self) -> bool {
        matches!(self, Self::Active | Self::Unknown)
    }
}

/// Which timetable listing a schedule lookup searches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Departure,
    Arrival,
}

impl Direction {
    /// Value of the provider's `type` query parameter
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Departure => "departure",
            Self::Arrival => "arrival",
        }
    }
}

/// Operating airline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airline {
    pub iata: String,
    pub name: String,
}

/// Static airport metadata, cached independently of flights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportInfo {
    pub name: String,
    pub country: String,
    /// IANA timezone identifier, e.g. `America/Vancouver`
    pub timezone: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// One directional segment of a flight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    /// Airport IATA code
    pub iata: String,
    /// Naive local timestamp; the timezone comes from the airport
    pub scheduled_time: String,
    pub estimated_time: Option<String>,
    pub actual_time: Option<String>,
    /// Delay in minutes
    pub delay: Option<i64>,
    /// Airport metadata, attached once resolved
    pub persistent: Option<AirportInfo>,
}

/// Vertical and horizontal speed from live tracking
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Speed {
    pub vertical: Option<f64>,
    pub horizontal: Option<f64>,
}

/// Position and heading from live tracking
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geography {
    pub altitude: Option<f64>,
    pub direction: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Live kinematic data for a flight
///
/// The default value (every field null) stands in when telemetry is skipped
/// or unavailable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Telemetry {
    pub speed: Speed,
    pub geography: Geography,
}

impl Telemetry {
    /// True when the aircraft reports sitting on the ground, stationary
    pub fn indicates_landed(&self) -> bool {
        self.geography.altitude == Some(0.0) && self.speed.horizontal == Some(0.0)
    }
}

/// A schedule entry as normalized from the timetable provider
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub flight_no: String,
    pub airline: Airline,
    pub departure: Leg,
    pub arrival: Leg,
    pub status: FlightStatus,
}

/// The merged record served to clients and cached under `FLIGHT_<code>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub flight_no: String,
    pub airline: Airline,
    pub departure: Leg,
    pub arrival: Leg,
    pub status: FlightStatus,
    pub speed: Speed,
    pub geography: Geography,
    /// When this record was assembled from upstream data
    pub timestamp: DateTime<Utc>,
    pub flight_mins: i64,
}

impl FlightRecord {
    /// Merges a schedule with (possibly empty) telemetry
    ///
    /// Duration and timestamp are filled in by the aggregator once airports
    /// have been resolved.
    pub fn from_parts(schedule: Schedule, telemetry: Telemetry) -> Self {
        Self {
            flight_no: schedule.flight_no,
            airline: schedule.airline,
            departure: schedule.departure,
            arrival: schedule.arrival,
            status: schedule.status,
            speed: telemetry.speed,
            geography: telemetry.geography,
            timestamp: Utc::now(),
            flight_mins: 0,
        }
    }
}

/// Error object some providers return in place of a result list
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ProviderError {
    error: Option<serde_json::Value>,
    success: Option<bool>,
}

impl ProviderError {
    /// Sentinel meaning "this lookup has no result"
    const NO_RECORD: &'static str = "No Record Found";

    /// Whether this is the explicit no-record sentinel
    pub(crate) fn is_no_record(&self) -> bool {
        let sentinel = self
            .error
            .as_ref()
            .and_then(|e| e.as_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(Self::NO_RECORD));
        sentinel && self.success != Some(true)
    }

    /// Human-readable summary of the error object
    pub(crate) fn message(&self) -> String {
        match &self.error {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "response object without results".to_string(),
        }
    }
}

/// Accepts a number, a numeric string, an empty string or null.
///
/// Providers are inconsistent about quoting numeric fields.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// Like [`lenient_f64`] but for whole minutes
pub(crate) fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(serde_json::Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}
