//! API Ninjas airport metadata client
//!
//! Resolves an airport IATA code into [`AirportInfo`]. The timezone is the
//! field the rest of the pipeline depends on, so entries without one are
//! rejected here rather than at the point of use.

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{lenient_f64, AirportInfo, ProviderError};
use crate::upstream::UpstreamError;

/// Base URL for the API Ninjas API
pub const API_NINJAS_BASE_URL: &str = "https://api.api-ninjas.com/v1";

/// Header carrying the API Ninjas key
const API_KEY_HEADER: &str = "X-Api-Key";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AirportResponse {
    Entries(Vec<RawAirport>),
    Error(ProviderError),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAirport {
    name: Option<String>,
    country: Option<String>,
    timezone: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    latitude: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    longitude: Option<f64>,
}

/// Client for the API Ninjas airports endpoint
#[derive(Debug, Clone)]
pub struct AirportClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl AirportClient {
    /// Creates a client against the public API Ninjas API
    pub fn new(http_client: Client, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            base_url: API_NINJAS_BASE_URL.to_string(),
        }
    }

    /// Points the client at a different base URL
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Fetches metadata for an airport
    ///
    /// # Arguments
    /// * `iata_code` - Three-letter airport code
    ///
    /// # Returns
    /// * `Ok(AirportInfo)` - Name, country, timezone and coordinates
    /// * `Err(UpstreamError::NotFound)` - Unknown airport code
    /// * `Err(UpstreamError::Unavailable)` - Network error or non-2xx status
    pub async fn fetch_airport_info(&self, iata_code: &str) -> Result<AirportInfo, UpstreamError> {
        let url = format!("{}/airports", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .query(&[("iata", iata_code)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(airport = iata_code, %status, "airport request failed");
            return Err(UpstreamError::Unavailable(format!(
                "airports returned HTTP {status}"
            )));
        }

        let body = response.text().await?;
        parse_airport_response(&body, iata_code)
    }
}

/// Normalizes an airports response body
pub(crate) fn parse_airport_response(body: &str, iata_code: &str) -> Result<AirportInfo, UpstreamError> {
    let response: AirportResponse = serde_json::from_str(body)
        .map_err(|e| UpstreamError::Malformed(format!("airports: {e}")))?;

    let raw = match response {
        AirportResponse::Entries(entries) => entries.into_iter().next(),
        AirportResponse::Error(err) if err.is_no_record() => None,
        AirportResponse::Error(err) => return Err(UpstreamError::Rejected(err.message())),
    };

    let Some(raw) = raw else {
        debug!(airport = iata_code, "no airport record");
        return Err(UpstreamError::NotFound);
    };

    let missing = |field: &str| UpstreamError::Malformed(format!("airport {iata_code} has no {field}"));

    Ok(AirportInfo {
        name: raw.name.filter(|n| !n.trim().is_empty()).ok_or_else(|| missing("name"))?,
        country: raw.country.unwrap_or_default(),
        timezone: raw
            .timezone
            .filter(|tz| !tz.trim().is_empty())
            .ok_or_else(|| missing("timezone"))?,
        latitude: raw.latitude.ok_or_else(|| missing("latitude"))?,
        longitude: raw.longitude.ok_or_else(|| missing("longitude"))?,
    })
}
