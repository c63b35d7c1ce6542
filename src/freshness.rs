//! Cache freshness policy for merged flight records
//!
//! TTL bands sit one minute short of a round 24/48 minute cycle, so a client
//! polling on a round-minute boundary sees fresh data at its next check-in
//! instead of racing the expiry.

use serde::{Deserialize, Serialize};

use crate::data::FlightStatus;

/// Short band: 23 minutes
pub const SHORT_TTL_SECS: u64 = 23 * 60;

/// Long band: 47 minutes
pub const LONG_TTL_SECS: u64 = 47 * 60;

/// Flights longer than this use the long band
pub const LONG_HAUL_THRESHOLD_MINS: i64 = 240;

/// Maps flight duration and status to a cache TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreshnessPolicy {
    pub short_ttl_secs: u64,
    pub long_ttl_secs: u64,
    pub long_haul_threshold_mins: i64,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            short_ttl_secs: SHORT_TTL_SECS,
            long_ttl_secs: LONG_TTL_SECS,
            long_haul_threshold_mins: LONG_HAUL_THRESHOLD_MINS,
        }
    }
}

impl FreshnessPolicy {
    /// TTL in seconds for a flight record
    ///
    /// Landed flights always get the short band: the same flight code comes
    /// back on the next rotation and the cached leg must give way to it.
    pub fn choose_ttl(&self, flight_minutes: i64, status: FlightStatus) -> u64 {
        if status == FlightStatus::Landed || flight_minutes <= self.long_haul_threshold_mins {
            self.short_ttl_secs
        } else {
            self.long_ttl_secs
        }
    }
}

/// [`FreshnessPolicy::choose_ttl`] with the default bands
pub fn choose_ttl(flight_minutes: i64, status: FlightStatus) -> u64 {
    FreshnessPolicy::default().choose_ttl(flight_minutes, status)
}
