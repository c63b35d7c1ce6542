//! Cache gateway for flight and airport records
//!
//! [`CacheGateway`] is the key-value seam the aggregator reads through and
//! writes through. Values are JSON bytes; an absent TTL means the entry never
//! expires. Two backends are provided: an in-process [`MemoryCache`] and a
//! file-per-key [`FileCache`].

mod manager;
mod memory;

pub use manager::FileCache;
pub use memory::MemoryCache;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::warn;

/// Errors raised by cache backends
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem or network I/O failed
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key contains characters the backend cannot store
    #[error("invalid cache key '{0}'")]
    InvalidKey(String),

    /// Value could not be encoded or decoded
    #[error("invalid cache data: {0}")]
    InvalidData(String),
}

/// Key-value access with optional per-entry TTL
#[async_trait]
pub trait CacheGateway: Send + Sync {
    /// Returns the value for `key`, or `None` if absent or expired
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Stores `value` under `key`; `ttl_secs = None` never expires
    async fn set(&self, key: &str, value: Vec<u8>, ttl_secs: Option<u64>) -> Result<(), CacheError>;

    /// Checks that the backend is reachable
    async fn ping(&self) -> Result<(), CacheError>;
}

/// Cache key for a merged flight record
pub fn flight_key(flight_code: &str) -> String {
    format!("FLIGHT_{}", flight_code.trim().to_uppercase())
}

/// Cache key for airport metadata
pub fn airport_key(iata_code: &str) -> String {
    format!("AIRPORT_{}", iata_code.trim().to_uppercase())
}

/// Reads and decodes a JSON value
///
/// A value that no longer decodes (e.g. written by an older schema) is logged
/// and reported as a miss.
pub async fn get_json<T: DeserializeOwned>(
    cache: &dyn CacheGateway,
    key: &str,
) -> Result<Option<T>, CacheError> {
    let Some(bytes) = cache.get(key).await? else {
        return Ok(None);
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(key, error = %e, "discarding undecodable cache entry");
            Ok(None)
        }
    }
}

/// Encodes a value as JSON and stores it
pub async fn set_json<T: Serialize + Sync>(
    cache: &dyn CacheGateway,
    key: &str,
    value: &T,
    ttl_secs: Option<u64>,
) -> Result<(), CacheError> {
    let bytes = serde_json::to_vec(value).map_err(|e| CacheError::InvalidData(e.to_string()))?;
    cache.set(key, bytes, ttl_secs).await
}
