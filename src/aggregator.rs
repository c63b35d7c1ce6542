//! Flight aggregation pipeline
//!
//! Turns a flight code into a merged [`FlightRecord`]:
//!
//! 1. cache lookup (`FLIGHT_<code>`), returning immediately on a hit
//! 2. schedule from the departure listing, falling back to the arrival listing
//! 3. live telemetry, only for airborne or ambiguous flights, best effort
//! 4. status override to landed when telemetry shows a stationary aircraft
//! 5. airport metadata for both legs, read through `AIRPORT_<iata>`
//! 6. flight minutes and TTL
//! 7. cache write with that TTL
//!
//! Concurrent requests for the same code queue on a per-key lock so only the
//! first one goes upstream; the rest are served by the cache it fills.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

use crate::cache::{self, CacheGateway};
use crate::data::{AirportInfo, Direction, FlightRecord, FlightStatus, Leg, Schedule, Telemetry};
use crate::duration;
use crate::error::FlightError;
use crate::freshness::FreshnessPolicy;
use crate::upstream::{FlightSource, UpstreamError};

/// Orchestrates upstream fetches, merging and caching
pub struct Aggregator {
    upstream: Arc<dyn FlightSource>,
    cache: Arc<dyn CacheGateway>,
    freshness: FreshnessPolicy,
    /// TTL for airport entries; `None` = never expire
    airport_ttl_secs: Option<u64>,
    in_flight: InFlight,
}

impl Aggregator {
    /// Creates an aggregator with the default freshness policy and
    /// non-expiring airport entries
    pub fn new(upstream: Arc<dyn FlightSource>, cache: Arc<dyn CacheGateway>) -> Self {
        Self {
            upstream,
            cache,
            freshness: FreshnessPolicy::default(),
            airport_ttl_secs: None,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_freshness(mut self, freshness: FreshnessPolicy) -> Self {
        self.freshness = freshness;
        self
    }

    pub fn with_airport_ttl(mut self, airport_ttl_secs: Option<u64>) -> Self {
        self.airport_ttl_secs = airport_ttl_secs;
        self
    }

    /// The cache this aggregator reads and writes
    pub fn cache(&self) -> &Arc<dyn CacheGateway> {
        &self.cache
    }

    /// Returns the merged record for `flight_code`, from cache or upstream
    ///
    /// # Arguments
    /// * `flight_code` - Normalized (uppercase) IATA flight code
    ///
    /// # Returns
    /// * `Ok(FlightRecord)` - Cached or freshly aggregated record
    /// * `Err(FlightError)` - Schedule or airport missing, upstream outage,
    ///   unparseable data or cache failure
    #[instrument(skip_all, fields(flight = %flight_code))]
    pub async fn get_flight(&self, flight_code: &str) -> Result<FlightRecord, FlightError> {
        let key = cache::flight_key(flight_code);

        if let Some(record) = self.cached_flight(&key).await? {
            debug!("cache hit");
            return Ok(record);
        }

        let slot = self.key_slot(&key);
        let _held = slot.lock().await;
        self.refresh(flight_code, &key).await
    }

    /// Aggregates and caches a record while holding the key's lock
    async fn refresh(&self, flight_code: &str, key: &str) -> Result<FlightRecord, FlightError> {
        // Another request may have filled the cache while we waited
        if let Some(record) = self.cached_flight(key).await? {
            debug!("cache filled by concurrent request");
            return Ok(record);
        }

        info!("cache miss, aggregating from upstream");
        let (record, ttl) = self.aggregate(flight_code).await?;

        cache::set_json(self.cache.as_ref(), key, &record, Some(ttl)).await?;
        info!(ttl, status = ?record.status, flight_mins = record.flight_mins, "cached flight record");
        Ok(record)
    }

    async fn cached_flight(&self, key: &str) -> Result<Option<FlightRecord>, FlightError> {
        Ok(cache::get_json(self.cache.as_ref(), key).await?)
    }

    /// Runs the upstream part of the pipeline; returns the record and its TTL
    async fn aggregate(&self, flight_code: &str) -> Result<(FlightRecord, u64), FlightError> {
        let mut schedule = self.resolve_schedule(flight_code).await?;
        let telemetry = self.live_telemetry(flight_code, &schedule).await;
        schedule.status = reconcile_status(schedule.status, &telemetry);

        let mut record = FlightRecord::from_parts(schedule, telemetry);

        self.attach_airport(&mut record.departure).await?;
        self.attach_airport(&mut record.arrival).await?;

        record.flight_mins = duration::flight_minutes(&record.departure, &record.arrival)?;
        record.timestamp = Utc::now();
        let ttl = self.freshness.choose_ttl(record.flight_mins, record.status);

        Ok((record, ttl))
    }

    /// Departure listing first, then arrival
    async fn resolve_schedule(&self, flight_code: &str) -> Result<Schedule, FlightError> {
        for direction in [Direction::Departure, Direction::Arrival] {
            match self.upstream.fetch_schedule(flight_code, direction).await {
                Ok(schedule) => {
                    debug!(direction = direction.as_str(), "schedule resolved");
                    return Ok(schedule);
                }
                Err(UpstreamError::NotFound) => {
                    debug!(direction = direction.as_str(), "not in timetable listing");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(FlightError::ScheduleNotFound(flight_code.to_string()))
    }

    /// Live telemetry for airborne or ambiguous flights; nulls otherwise
    async fn live_telemetry(&self, flight_code: &str, schedule: &Schedule) -> Telemetry {
        if !schedule.status.wants_live_telemetry() {
            debug!(status = ?schedule.status, "skipping live telemetry");
            return Telemetry::default();
        }

        match self.upstream.fetch_live_telemetry(flight_code).await {
            Ok(telemetry) => telemetry,
            Err(UpstreamError::NotFound) => {
                debug!("no live telemetry");
                Telemetry::default()
            }
            Err(err) => {
                warn!(error = %err, "live telemetry unavailable, continuing without it");
                Telemetry::default()
            }
        }
    }

    /// Resolves and attaches the airport of one leg
    async fn attach_airport(&self, leg: &mut Leg) -> Result<(), FlightError> {
        let info = self.airport_info(&leg.iata).await?;
        leg.persistent = Some(info);
        Ok(())
    }

    /// Airport metadata, read through the cache
    async fn airport_info(&self, iata: &str) -> Result<AirportInfo, FlightError> {
        let key = cache::airport_key(iata);
        if let Some(info) = cache::get_json::<AirportInfo>(self.cache.as_ref(), &key).await? {
            debug!(airport = iata, "airport cache hit");
            return Ok(info);
        }

        let info = match self.upstream.fetch_airport_info(iata).await {
            Ok(info) => info,
            Err(UpstreamError::NotFound) => return Err(FlightError::AirportNotFound(iata.to_string())),
            Err(err) => return Err(err.into()),
        };

        cache::set_json(self.cache.as_ref(), &key, &info, self.airport_ttl_secs).await?;
        debug!(airport = iata, "airport cached");
        Ok(info)
    }

    /// Registers interest in the per-key lock
    ///
    /// The slot forgets the key when dropped, including when the request
    /// future is cancelled or unwinds.
    fn key_slot(&self, key: &str) -> KeySlot<'_> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        let lock = in_flight.entry(key.to_string()).or_default().clone();
        KeySlot {
            in_flight: &self.in_flight,
            key: key.to_string(),
            lock: Some(lock),
        }
    }
}

type InFlight = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

/// Interest in a key's lock; the key is forgotten once no slot remains
struct KeySlot<'a> {
    in_flight: &'a InFlight,
    key: String,
    /// `None` only while dropping
    lock: Option<Arc<AsyncMutex<()>>>,
}

impl KeySlot<'_> {
    async fn lock(&self) -> Option<MutexGuard<'_, ()>> {
        match &self.lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        }
    }
}

impl Drop for KeySlot<'_> {
    fn drop(&mut self) {
        self.lock.take();
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if in_flight.get(&self.key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            in_flight.remove(&self.key);
        }
    }
}

/// Ground-stationary telemetry means the flight has landed, whatever the
/// timetable says
fn reconcile_status(status: FlightStatus, telemetry: &Telemetry) -> FlightStatus {
    if telemetry.indicates_landed() && status != FlightStatus::Landed {
        info!(previous = ?status, "telemetry shows aircraft on the ground, marking landed");
        return FlightStatus::Landed;
    }
    status
}
