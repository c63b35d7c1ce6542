//! Command-line interface parsing for the FlightBar server
//!
//! Flags override the matching settings of the loaded configuration file.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::config::{CacheBackend, Config};

/// FlightBar server - cached flight schedule, live tracking and airport data
#[derive(Parser, Debug)]
#[command(name = "flightbar")]
#[command(about = "Caching aggregation proxy for flight schedule, tracking and airport data")]
#[command(version)]
pub struct Cli {
    /// Path to a TOML config file (defaults to ./flightbar.toml when present)
    #[arg(long, short, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:8000
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<SocketAddr>,

    /// Cache backend to use
    #[arg(long, value_enum, value_name = "BACKEND")]
    pub cache_backend: Option<CacheBackend>,

    /// Directory for the file cache backend
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

impl Cli {
    /// Applies command-line overrides on top of `config`.
    ///
    /// # Arguments
    /// * `config` - Configuration loaded from file or defaults
    ///
    /// # Returns
    /// The configuration with every flag that was given taking precedence
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if let Some(backend) = self.cache_backend {
            config.cache.backend = backend;
        }
        if let Some(dir) = &self.cache_dir {
            config.cache.dir = Some(dir.clone());
        }
        config
    }
}
