//! Error taxonomy of the aggregation pipeline
//!
//! Inner components return their own typed errors; [`FlightError`] is what the
//! aggregator hands to the HTTP layer, which is the only place errors become
//! responses.

use thiserror::Error;

use crate::cache::CacheError;
use crate::duration::DurationError;
use crate::upstream::UpstreamError;

/// Failure of a flight lookup
#[derive(Debug, Error)]
pub enum FlightError {
    /// Neither timetable listing knows the flight
    #[error("schedule not found for flight {0}")]
    ScheduleNotFound(String),

    /// An airport on the route could not be resolved
    #[error("airport details not found for {0}")]
    AirportNotFound(String),

    /// An upstream provider failed after retries
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    /// Upstream data could not be interpreted
    #[error("parse error: {0}")]
    Parse(String),

    /// Shared secret missing or wrong
    #[error("missing or invalid shared secret")]
    AuthFailure,

    /// Flight code is not something we can look up
    #[error("invalid flight code '{0}'")]
    InvalidFlightCode(String),

    /// Anything else, e.g. the cache backend failing
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl FlightError {
    /// Machine-readable kind, used in error response bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ScheduleNotFound(_) | Self::AirportNotFound(_) => "not_found",
            Self::Unavailable(_) => "unavailable",
            Self::Parse(_) => "parse_error",
            Self::AuthFailure => "auth_failure",
            Self::InvalidFlightCode(_) => "invalid_flight_code",
            Self::Unexpected(_) => "unexpected",
        }
    }
}

impl From<DurationError> for FlightError {
    fn from(err: DurationError) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<CacheError> for FlightError {
    fn from(err: CacheError) -> Self {
        Self::Unexpected(err.to_string())
    }
}

impl From<serde_json::Error> for FlightError {
    fn from(err: serde_json::Error) -> Self {
        Self::Unexpected(err.to_string())
    }
}

/// Maps upstream failures that are not a plain "no record"
///
/// `NotFound` needs call-site context (schedule or airport) and is handled by
/// the aggregator before reaching this conversion.
impl From<UpstreamError> for FlightError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::NotFound => Self::Unexpected("upstream record not found".to_string()),
            UpstreamError::Unavailable(msg) | UpstreamError::Rejected(msg) => Self::Unavailable(msg),
            UpstreamError::Malformed(msg) => Self::Parse(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_errors_map_to_kinds() {
        let err: FlightError = UpstreamError::Unavailable("timeout".to_string()).into();
        assert_eq!(err.kind(), "unavailable");

        let err: FlightError = UpstreamError::Rejected("bad key".to_string()).into();
        assert_eq!(err.kind(), "unavailable");

        let err: FlightError = UpstreamError::Malformed("[]".to_string()).into();
        assert_eq!(err.kind(), "parse_error");
    }

    #[test]
    fn test_duration_error_is_parse_error() {
        let err: FlightError = DurationError::UnknownTimezone("Mars/Base".to_string()).into();
        assert_eq!(err.kind(), "parse_error");
        assert!(err.to_string().contains("Mars/Base"));
    }

    #[test]
    fn test_cache_error_is_unexpected_and_keeps_message() {
        let err: FlightError = CacheError::InvalidKey("../x".to_string()).into();
        assert_eq!(err.kind(), "unexpected");
        assert!(err.to_string().contains("../x"));
    }
}
