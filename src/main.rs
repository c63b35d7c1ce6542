//! FlightBar server - caching aggregation proxy for flight data
//!
//! Loads configuration, wires the cache and upstream providers into the
//! aggregator and serves the HTTP API until ctrl-c.

use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use flightbar::aggregator::Aggregator;
use flightbar::cache::{CacheGateway, FileCache, MemoryCache};
use flightbar::cli::Cli;
use flightbar::config::{CacheBackend, CacheConfig, Config, Secrets};
use flightbar::logging::initialize_logging;
use flightbar::server::{self, AppState};
use flightbar::upstream::HttpFlightSource;

/// Builds the configured cache backend
fn build_cache(config: &CacheConfig) -> Result<Arc<dyn CacheGateway>, String> {
    match config.backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryCache::new())),
        CacheBackend::File => {
            let cache = match &config.dir {
                Some(dir) => FileCache::with_dir(dir.clone()),
                None => FileCache::new()
                    .ok_or_else(|| "could not determine a cache directory, set cache.dir".to_string())?,
            };
            info!(dir = %cache.dir().display(), "using file cache");
            Ok(Arc::new(cache))
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let (config, source) = match Config::load_with_source(cli.config.as_deref()) {
        Ok((config, source)) => (cli.apply(config), source),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let _log_guard = initialize_logging(&config.logging);
    match source {
        Some(path) => info!(path = %path.display(), "loaded configuration"),
        None => info!("no config file found, using defaults"),
    }

    if let Err(e) = run(config).await {
        error!("{}", e);
        process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), String> {
    let secrets = Secrets::from_env().map_err(|e| e.to_string())?;
    if secrets.credentials.aviation_edge_key.is_empty() {
        warn!("API_KEY is not set, timetable and live lookups will be rejected");
    }
    if secrets.credentials.airports_key.is_empty() {
        warn!("AIRPORTS_API_KEY is not set, airport lookups will be rejected");
    }

    let cache = build_cache(&config.cache)?;
    let upstream = HttpFlightSource::new(&config.upstream, secrets.credentials)
        .map_err(|e| format!("failed to build upstream clients: {}", e))?;

    let aggregator = Aggregator::new(Arc::new(upstream), cache)
        .with_freshness(config.freshness)
        .with_airport_ttl(config.cache.airport_ttl_secs);

    let state = AppState::new(Arc::new(aggregator), secrets.shared_secret);
    let router = server::router(state, Duration::from_secs(config.server.request_timeout_secs));

    let listener = TcpListener::bind(config.server.bind)
        .await
        .map_err(|e| format!("failed to bind {}: {}", config.server.bind, e))?;

    server::serve(listener, router)
        .await
        .map_err(|e| format!("server error: {}", e))
}
