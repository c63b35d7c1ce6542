//! Integration tests for CLI argument handling
//!
//! Runs the built binary with flags that exit before the server starts.

use std::process::Command;

/// Helper to run the CLI with given args and capture output
fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_flightbar"))
        .args(args)
        .env_remove("FLIGHTBAR_SECRET")
        .output()
        .expect("Failed to execute flightbar")
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(output.status.success(), "Expected --help to exit successfully");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("flightbar"), "Help should mention flightbar");
    assert!(stdout.contains("--config"), "Help should mention --config");
    assert!(stdout.contains("--bind"), "Help should mention --bind");
    assert!(stdout.contains("--cache-backend"), "Help should mention --cache-backend");
}

#[test]
fn test_version_flag_prints_version() {
    let output = run_cli(&["--version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_invalid_backend_prints_error_and_exits() {
    let output = run_cli(&["--cache-backend", "redis"]);
    assert!(!output.status.success(), "Expected unknown backend to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("redis"), "Should name the bad value: {}", stderr);
}

#[test]
fn test_missing_config_file_fails() {
    let output = run_cli(&["--config", "/nonexistent/flightbar.toml"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("flightbar.toml"), "Should name the config file: {}", stderr);
}

#[test]
fn test_missing_shared_secret_refuses_to_start() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let config = temp_dir.path().join("flightbar.toml");
    std::fs::write(&config, "[server]\nbind = \"127.0.0.1:0\"\n").unwrap();

    let output = run_cli(&["--config", config.to_str().unwrap()]);
    assert!(!output.status.success(), "Server must not start without a shared secret");
}

#[test]
fn test_config_source_is_logged_once_logging_is_up() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let config = temp_dir.path().join("flightbar.toml");
    std::fs::write(&config, "[server]\nbind = \"127.0.0.1:0\"\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_flightbar"))
        .args(["--config", config.to_str().unwrap()])
        .env_remove("FLIGHTBAR_SECRET")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute flightbar");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("loaded configuration"), "Config source should be logged: {}", stdout);
}

#[cfg(test)]
mod unit_tests {
    //! Unit tests for CLI parsing that don't require running the binary

    use clap::Parser;
    use flightbar::cli::Cli;
    use flightbar::config::{CacheBackend, Config};

    #[test]
    fn test_cli_no_args_keeps_defaults() {
        let cli = Cli::parse_from(["flightbar"]);
        let config = cli.apply(Config::default());
        assert_eq!(config.server.bind.port(), 8000);
        assert_eq!(config.cache.backend, CacheBackend::Memory);
    }

    #[test]
    fn test_cli_file_backend_with_dir() {
        let cli = Cli::parse_from(["flightbar", "--cache-backend", "file", "--cache-dir", "/tmp/fb"]);
        let config = cli.apply(Config::default());
        assert_eq!(config.cache.backend, CacheBackend::File);
        assert_eq!(config.cache.dir.unwrap().to_str(), Some("/tmp/fb"));
    }

    #[test]
    fn test_cli_short_config_flag() {
        let cli = Cli::parse_from(["flightbar", "-c", "custom.toml"]);
        assert_eq!(cli.config.unwrap().to_str(), Some("custom.toml"));
    }
}
