//! FlightBar server library
//!
//! A caching aggregation proxy: one lookup per flight code combines the
//! timetable, live tracking and airport metadata providers into a single
//! record, kept in a cache for a duration-dependent TTL.

pub mod aggregator;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod duration;
pub mod error;
pub mod freshness;
pub mod logging;
pub mod retry;
pub mod server;
pub mod upstream;
