//! Aviation Edge timetable client
//!
//! Looks up a flight in the departure or arrival timetable and normalizes the
//! first matching entry into a [`Schedule`].

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{lenient_i64, Airline, Direction, FlightStatus, Leg, ProviderError, Schedule};
use crate::upstream::UpstreamError;

/// Base URL for the Aviation Edge public API
pub const AVIATION_EDGE_BASE_URL: &str = "https://aviation-edge.com/v2/public";

/// Timetable responses are either a list of entries or an error object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TimetableResponse {
    Entries(Vec<RawTimetableEntry>),
    Error(ProviderError),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTimetableEntry {
    flight: Option<RawFlight>,
    airline: Option<RawAirline>,
    departure: Option<RawLeg>,
    arrival: Option<RawLeg>,
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawFlight {
    iata_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawAirline {
    iata_code: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawLeg {
    iata_code: Option<String>,
    scheduled_time: Option<String>,
    estimated_time: Option<String>,
    actual_time: Option<String>,
    #[serde(deserialize_with = "lenient_i64")]
    delay: Option<i64>,
}

/// Client for the Aviation Edge timetable endpoint
#[derive(Debug, Clone)]
pub struct ScheduleClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl ScheduleClient {
    /// Creates a client against the public Aviation Edge API
    pub fn new(http_client: Client, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            base_url: AVIATION_EDGE_BASE_URL.to_string(),
        }
    }

    /// Points the client at a different base URL
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Fetches the schedule for a flight from one timetable listing
    ///
    /// # Arguments
    /// * `flight_code` - IATA flight code, e.g. `AC39`
    /// * `direction` - Which listing (departure or arrival) to search
    ///
    /// # Returns
    /// * `Ok(Schedule)` - The first matching timetable entry
    /// * `Err(UpstreamError::NotFound)` - The provider has no such flight
    /// * `Err(UpstreamError::Unavailable)` - Network error or non-2xx status
    pub async fn fetch_schedule(
        &self,
        flight_code: &str,
        direction: Direction,
    ) -> Result<Schedule, UpstreamError> {
        let url = format!("{}/timetable", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("type", direction.as_str()),
                ("flight_iata", flight_code),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(flight = flight_code, %status, "timetable request failed");
            return Err(UpstreamError::Unavailable(format!(
                "timetable returned HTTP {status}"
            )));
        }

        let body = response.text().await?;
        parse_schedule_response(&body, flight_code)
    }
}

/// Normalizes a timetable response body
///
/// `flight_code` is used as the flight number when the entry omits one.
pub(crate) fn parse_schedule_response(
    body: &str,
    flight_code: &str,
) -> Result<Schedule, UpstreamError> {
    let response: TimetableResponse = serde_json::from_str(body)
        .map_err(|e| UpstreamError::Malformed(format!("timetable: {e}")))?;

    let entry = match response {
        TimetableResponse::Entries(entries) => entries.into_iter().next(),
        TimetableResponse::Error(err) if err.is_no_record() => None,
        TimetableResponse::Error(err) => return Err(UpstreamError::Rejected(err.message())),
    };

    let Some(entry) = entry else {
        debug!(flight = flight_code, "no timetable record");
        return Err(UpstreamError::NotFound);
    };

    let flight_no = entry
        .flight
        .and_then(|f| f.iata_number)
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| flight_code.to_string());

    let airline = entry.airline.unwrap_or_default();
    let airline = Airline {
        iata: airline.iata_code.unwrap_or_else(|| "N/A".to_string()),
        name: airline.name.unwrap_or_else(|| "Unknown".to_string()),
    };

    Ok(Schedule {
        flight_no: flight_no.to_uppercase(),
        airline,
        departure: normalize_leg(entry.departure.unwrap_or_default(), "departure")?,
        arrival: normalize_leg(entry.arrival.unwrap_or_default(), "arrival")?,
        status: entry
            .status
            .as_deref()
            .map(FlightStatus::from_upstream)
            .unwrap_or_default(),
    })
}

/// Validates the fields a leg cannot do without
fn normalize_leg(raw: RawLeg, which: &str) -> Result<Leg, UpstreamError> {
    let iata = raw
        .iata_code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| UpstreamError::Malformed(format!("{which} leg has no airport code")))?;
    let scheduled_time = raw
        .scheduled_time
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| UpstreamError::Malformed(format!("{which} leg has no scheduled time")))?;

    Ok(Leg {
        iata: iata.trim().to_uppercase(),
        scheduled_time,
        estimated_time: raw.estimated_time,
        actual_time: raw.actual_time,
        delay: raw.delay,
        persistent: None,
    })
}
