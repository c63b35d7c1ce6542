//! Shared fakes for integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use flightbar::cache::{CacheError, CacheGateway, MemoryCache};
use flightbar::data::{Airline, AirportInfo, Direction, FlightStatus, Leg, Schedule, Telemetry};
use flightbar::upstream::{FlightSource, UpstreamError};

/// In-memory [`FlightSource`] that counts every call
#[derive(Default)]
pub struct FakeSource {
    pub departures: HashMap<String, Schedule>,
    pub arrivals: HashMap<String, Schedule>,
    pub schedule_error: Option<UpstreamError>,
    pub live: Option<Result<Telemetry, UpstreamError>>,
    pub airports: HashMap<String, AirportInfo>,
    pub latency: Option<Duration>,
    pub schedule_calls: AtomicUsize,
    pub live_calls: AtomicUsize,
    pub airport_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_departure(mut self, schedule: Schedule) -> Self {
        self.departures.insert(schedule.flight_no.clone(), schedule);
        self
    }

    pub fn with_arrival(mut self, schedule: Schedule) -> Self {
        self.arrivals.insert(schedule.flight_no.clone(), schedule);
        self
    }

    pub fn with_schedule_error(mut self, err: UpstreamError) -> Self {
        self.schedule_error = Some(err);
        self
    }

    pub fn with_live(mut self, live: Result<Telemetry, UpstreamError>) -> Self {
        self.live = Some(live);
        self
    }

    pub fn with_airport(mut self, iata: &str, info: AirportInfo) -> Self {
        self.airports.insert(iata.to_string(), info);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn schedule_calls(&self) -> usize {
        self.schedule_calls.load(Ordering::SeqCst)
    }

    pub fn live_calls(&self) -> usize {
        self.live_calls.load(Ordering::SeqCst)
    }

    pub fn airport_calls(&self) -> usize {
        self.airport_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.schedule_calls() + self.live_calls() + self.airport_calls()
    }
}

#[async_trait]
impl FlightSource for FakeSource {
    async fn fetch_schedule(
        &self,
        flight_code: &str,
        direction: Direction,
    ) -> Result<Schedule, UpstreamError> {
        self.schedule_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(err) = &self.schedule_error {
            return Err(err.clone());
        }

        let listing = match direction {
            Direction::Departure => &self.departures,
            Direction::Arrival => &self.arrivals,
        };
        listing.get(flight_code).cloned().ok_or(UpstreamError::NotFound)
    }

    async fn fetch_live_telemetry(&self, _flight_code: &str) -> Result<Telemetry, UpstreamError> {
        self.live_calls.fetch_add(1, Ordering::SeqCst);
        self.live.clone().unwrap_or(Err(UpstreamError::NotFound))
    }

    async fn fetch_airport_info(&self, iata_code: &str) -> Result<AirportInfo, UpstreamError> {
        self.airport_calls.fetch_add(1, Ordering::SeqCst);
        self.airports.get(iata_code).cloned().ok_or(UpstreamError::NotFound)
    }
}

/// [`MemoryCache`] that records the TTL of every write
#[derive(Default)]
pub struct RecordingCache {
    pub inner: MemoryCache,
    pub writes: Mutex<Vec<(String, Option<u64>)>>,
    pub unreachable: bool,
}

impl RecordingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    /// TTL of the last write to `key`
    pub fn ttl_for(&self, key: &str) -> Option<Option<u64>> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, ttl)| *ttl)
    }

    pub fn write_count(&self, key: &str) -> usize {
        self.writes.lock().unwrap().iter().filter(|(k, _)| k == key).count()
    }
}

#[async_trait]
impl CacheGateway for RecordingCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl_secs: Option<u64>) -> Result<(), CacheError> {
        self.writes.lock().unwrap().push((key.to_string(), ttl_secs));
        self.inner.set(key, value, ttl_secs).await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        if self.unreachable {
            return Err(CacheError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "cache offline",
            )));
        }
        self.inner.ping().await
    }
}

pub fn leg(iata: &str, scheduled_time: &str) -> Leg {
    Leg {
        iata: iata.to_string(),
        scheduled_time: scheduled_time.to_string(),
        estimated_time: None,
        actual_time: None,
        delay: None,
        persistent: None,
    }
}

pub fn schedule(flight_no: &str, departure: Leg, arrival: Leg, status: FlightStatus) -> Schedule {
    Schedule {
        flight_no: flight_no.to_string(),
        airline: Airline {
            iata: flight_no.chars().take(2).collect(),
            name: "Test Air".to_string(),
        },
        departure,
        arrival,
        status,
    }
}

/// AC39 Vancouver to Auckland, 855 minutes, already landed
pub fn ac39(status: FlightStatus) -> Schedule {
    schedule(
        "AC39",
        leg("YVR", "2025-01-15T23:45:00.000"),
        leg("AKL", "2025-01-17T11:00:00.000"),
        status,
    )
}

/// AC123 Vancouver to Calgary, 90 minutes
pub fn ac123(status: FlightStatus) -> Schedule {
    schedule(
        "AC123",
        leg("YVR", "2025-03-01T08:00:00"),
        leg("YYC", "2025-03-01T10:30:00"),
        status,
    )
}

pub fn airport(name: &str, country: &str, timezone: &str) -> AirportInfo {
    AirportInfo {
        name: name.to_string(),
        country: country.to_string(),
        timezone: timezone.to_string(),
        latitude: 0.0,
        longitude: 0.0,
    }
}

pub fn yvr() -> AirportInfo {
    airport("Vancouver International Airport", "CA", "America/Vancouver")
}

pub fn akl() -> AirportInfo {
    airport("Auckland International Airport", "NZ", "Pacific/Auckland")
}

pub fn yyc() -> AirportInfo {
    airport("Calgary International Airport", "CA", "America/Edmonton")
}

/// A source knowing every airport used by the fixtures
pub fn source_with_airports() -> FakeSource {
    FakeSource::new()
        .with_airport("YVR", yvr())
        .with_airport("AKL", akl())
        .with_airport("YYC", yyc())
}
