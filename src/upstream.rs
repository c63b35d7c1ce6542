//! Upstream provider boundary
//!
//! [`FlightSource`] is the seam the aggregator talks to. [`HttpFlightSource`]
//! is the production implementation: it owns the provider clients and wraps
//! every call in the configured [`RetryPolicy`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::config::UpstreamConfig;
use crate::data::{
    AirportClient, AirportInfo, Direction, LiveClient, Schedule, ScheduleClient, Telemetry,
};
use crate::retry::RetryPolicy;

/// Errors returned by upstream provider calls
#[derive(Debug, Clone, Error, PartialEq)]
pub enum UpstreamError {
    /// The provider has no record for the lookup
    #[error("no record found")]
    NotFound,

    /// Network failure, timeout or non-success HTTP status
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    /// The provider answered with an explicit error object
    #[error("upstream rejected the request: {0}")]
    Rejected(String),

    /// The response did not have any shape we know how to read
    #[error("unexpected upstream response: {0}")]
    Malformed(String),
}

impl UpstreamError {
    /// Only transient failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Unavailable(err.to_string())
        }
    }
}

/// Source of schedule, live and airport data for the aggregator
#[async_trait]
pub trait FlightSource: Send + Sync {
    /// Looks up a flight in the departure or arrival timetable
    async fn fetch_schedule(
        &self,
        flight_code: &str,
        direction: Direction,
    ) -> Result<Schedule, UpstreamError>;

    /// Fetches the current position and speed of a flight
    async fn fetch_live_telemetry(&self, flight_code: &str) -> Result<Telemetry, UpstreamError>;

    /// Fetches static metadata for an airport
    async fn fetch_airport_info(&self, iata_code: &str) -> Result<AirportInfo, UpstreamError>;
}

/// Provider credentials, supplied out of band
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// Aviation Edge key (timetable and live flights)
    pub aviation_edge_key: String,
    /// API Ninjas key (airport metadata)
    pub airports_key: String,
}

/// [`FlightSource`] backed by the Aviation Edge and API Ninjas HTTP APIs
#[derive(Debug, Clone)]
pub struct HttpFlightSource {
    schedule: ScheduleClient,
    live: LiveClient,
    airports: AirportClient,
    retry: RetryPolicy,
}

impl HttpFlightSource {
    /// Builds the provider clients sharing one connection pool
    ///
    /// # Arguments
    /// * `config` - Base URLs, per-call timeout and retry settings
    /// * `credentials` - Provider API keys
    ///
    /// # Returns
    /// * `Err(UpstreamError::Unavailable)` if the HTTP client cannot be built
    pub fn new(config: &UpstreamConfig, credentials: Credentials) -> Result<Self, UpstreamError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            schedule: ScheduleClient::new(http_client.clone(), credentials.aviation_edge_key.clone())
                .with_base_url(&config.aviation_edge_url),
            live: LiveClient::new(http_client.clone(), credentials.aviation_edge_key)
                .with_base_url(&config.aviation_edge_url),
            airports: AirportClient::new(http_client, credentials.airports_key)
                .with_base_url(&config.airports_url),
            retry: RetryPolicy::from(&config.retry),
        })
    }
}

#[async_trait]
impl FlightSource for HttpFlightSource {
    async fn fetch_schedule(
        &self,
        flight_code: &str,
        direction: Direction,
    ) -> Result<Schedule, UpstreamError> {
        debug!(flight = flight_code, direction = direction.as_str(), "fetching schedule");
        self.retry
            .run("schedule", || self.schedule.fetch_schedule(flight_code, direction))
            .await
    }

    async fn fetch_live_telemetry(&self, flight_code: &str) -> Result<Telemetry, UpstreamError> {
        debug!(flight = flight_code, "fetching live telemetry");
        self.retry
            .run("live", || self.live.fetch_live_telemetry(flight_code))
            .await
    }

    async fn fetch_airport_info(&self, iata_code: &str) -> Result<AirportInfo, UpstreamError> {
        debug!(airport = iata_code, "fetching airport info");
        self.retry
            .run("airport", || self.airports.fetch_airport_info(iata_code))
            .await
    }
}
