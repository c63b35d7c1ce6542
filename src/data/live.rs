//! Aviation Edge live flights client

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::schedule::AVIATION_EDGE_BASE_URL;
use super::{lenient_f64, Geography, ProviderError, Speed, Telemetry};
use crate::upstream::UpstreamError;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LiveResponse {
    Entries(Vec<RawLiveEntry>),
    Error(ProviderError),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawLiveEntry {
    speed: Option<RawSpeed>,
    geography: Option<RawGeography>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSpeed {
    #[serde(deserialize_with = "lenient_f64")]
    horizontal: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    vspeed: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawGeography {
    #[serde(deserialize_with = "lenient_f64")]
    altitude: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    direction: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    latitude: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    longitude: Option<f64>,
}

/// Client for the Aviation Edge live flights endpoint
#[derive(Debug, Clone)]
pub struct LiveClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl LiveClient {
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

    /// Fetches live telemetry for a flight
    ///
    /// An empty result and the provider's no-record sentinel both map to
    /// `NotFound`. Any other shape is `Malformed`.
    pub async fn fetch_live_telemetry(&self, flight_code: &str) -> Result<Telemetry, UpstreamError> {
        let url = format!("{}/flights", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("flightIata", flight_code)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(flight = flight_code, %status, "live flights request failed");
            return Err(UpstreamError::Unavailable(format!(
                "live flights returned HTTP {status}"
            )));
        }

        let body = response.text().await?;
        parse_live_response(&body, flight_code)
    }
}

/// Normalizes a live flights response body
pub(crate) fn parse_live_response(body: &str, flight_code: &str) -> Result<Telemetry, UpstreamError> {
    let response: LiveResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) => {
            warn!(flight = flight_code, error = %e, "unexpected live flights response");
            return Err(UpstreamError::Malformed(format!("live flights: {e}")));
        }
    };

    match response {
        LiveResponse::Entries(entries) => match entries.into_iter().next() {
            Some(entry) => Ok(normalize_entry(entry)),
            None => {
                debug!(flight = flight_code, "no live position");
                Err(UpstreamError::NotFound)
            }
        },
        LiveResponse::Error(err) if err.is_no_record() => {
            debug!(flight = flight_code, "no live position");
            Err(UpstreamError::NotFound)
        }
        LiveResponse::Error(err) => {
            let message = err.message();
            warn!(flight = flight_code, error = %message, "unexpected live flights response");
            Err(UpstreamError::Malformed(message))
        }
    }
}

fn normalize_entry(entry: RawLiveEntry) -> Telemetry {
    let speed = entry.speed.unwrap_or_default();
    let geography = entry.geography.unwrap_or_default();

    Telemetry {
        speed: Speed {
            vertical: speed.vspeed,
            horizontal: speed.horizontal,
        },
        geography: Geography {
            altitude: geography.altitude,
            direction: geography.direction,
            latitude: geography.latitude,
            longitude: geography.longitude,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_airborne_entry() {
        let body = r#"[{
            "aircraft": {"iataCode": "B789"},
            "geography": {"altitude": 11277.6, "direction": 214, "latitude": -12.5, "longitude": -160.25},
            "speed": {"horizontal": 905.12, "isGround": 0, "vspeed": 0},
            "status": "en-route"
        }]"#;
        let telemetry = parse_live_response(body, "AC39").unwrap();

        assert_eq!(telemetry.speed.horizontal, Some(905.12));
        assert_eq!(telemetry.speed.vertical, Some(0.0));
        assert_eq!(telemetry.geography.altitude, Some(11277.6));
        assert_eq!(telemetry.geography.direction, Some(214.0));
        assert_eq!(telemetry.geography.latitude, Some(-12.5));
        assert_eq!(telemetry.geography.longitude, Some(-160.25));
        assert!(!telemetry.indicates_landed());
    }

    #[test]
    fn test_entry_without_speed_has_null_fields() {
        let body = r#"[{"geography": {"altitude": 0, "latitude": 49.19, "longitude": -123.18}}]"#;
        let telemetry = parse_live_response(body, "AC39").unwrap();

        assert_eq!(telemetry.speed, Speed::default());
        assert_eq!(telemetry.geography.altitude, Some(0.0));
        assert_eq!(telemetry.geography.direction, None);
    }

    #[test]
    fn test_empty_list_is_not_found() {
        assert_eq!(parse_live_response("[]", "AC39"), Err(UpstreamError::NotFound));
    }

    #[test]
    fn test_no_record_sentinel_is_not_found() {
        let body = r#"{"error": "No Record Found"}"#;
        assert_eq!(parse_live_response(body, "AC39"), Err(UpstreamError::NotFound));
    }

    #[test]
    fn test_unexpected_shape_is_malformed() {
        let err = parse_live_response(r#"{"message": "rate limited"}"#, "AC39").unwrap_err();
        assert!(matches!(err, UpstreamError::Malformed(_)));

        let err = parse_live_response("\"surprise\"", "AC39").unwrap_err();
        assert!(matches!(err, UpstreamError::Malformed(_)));
    }
}
