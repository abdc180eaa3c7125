//! TM BT LED Daemon
//!
//! Connects to a paired steering wheel cluster over Bluetooth LE and keeps
//! its display in sync with a telemetry client.

mod clients;
mod config;
mod display;
mod driver;
mod format;
mod indicators;
mod link;
mod modes;
mod timers;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::time::Duration;
use tmbtled_hw::{BleRadio, PairingStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

use clients::{Client, DemoClient, IdleClient};
use config::{Config, UnitSetting};
use driver::Driver;
use link::LinkManager;

#[derive(Parser, Debug)]
#[command(name = "tmbtledd")]
#[command(about = "Drive a Thrustmaster BT LED steering wheel display")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Connection interval requested in performance mode, in milliseconds
    #[arg(long)]
    interval: Option<f64>,

    /// Use metric units
    #[arg(long, conflicts_with = "imperial")]
    metric: bool,

    /// Use imperial units
    #[arg(long)]
    imperial: bool,

    /// Scroll a message instead of waiting for a game
    #[arg(short, long)]
    message: Option<String>,

    /// Turn on every lamp while idle
    #[arg(long)]
    message_lights: bool,

    /// Run the built-in demo client
    #[arg(long)]
    demo: bool,

    /// Directory holding pairing metadata
    #[arg(long)]
    pairing_dir: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Applies command line overrides on top of the file configuration.
    fn apply(&self, config: &mut Config) {
        if let Some(interval) = self.interval {
            config.link.performance_interval_ms = interval;
        }
        if self.metric {
            config.units = UnitSetting::Metric;
        } else if self.imperial {
            config.units = UnitSetting::Imperial;
        }
        if let Some(dir) = &self.pairing_dir {
            config.link.pairing_dir = dir.clone();
        }
    }
}

fn load_config(path: &str) -> Result<Config> {
    if Path::new(path).exists() {
        let config = Config::load(path).context("Failed to load configuration")?;
        info!("Loaded configuration from: {}", path);
        Ok(config)
    } else {
        info!("No configuration at {}, using defaults", path);
        Ok(Config::default())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .init();

    let mut config = load_config(&args.config)?;
    args.apply(&mut config);

    let units = config.units.resolve();
    info!("Using {} units", units);

    let mut driver = Driver::new(
        units,
        Duration::from_millis(config.display.temporary_duration_ms),
    );

    let (radio, mut events) = BleRadio::open()
        .await
        .context("Failed to open Bluetooth adapter")?;
    let store = PairingStore::new(&config.link.pairing_dir);
    info!("Pairing metadata in: {}", store.dir().display());

    let mut client: Box<dyn Client> = if args.demo {
        Box::new(DemoClient::new(Duration::from_millis(
            config.display.client_poll_ms,
        )))
    } else {
        Box::new(IdleClient::new(args.message.clone(), args.message_lights))
    };

    // Setup Unix signal handlers
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;
    let shutdown = async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
            _ = sigint.recv() => info!("Received SIGINT, shutting down"),
        }
    };

    let mut link = LinkManager::new(radio, store, &config.link);
    link.run(&mut events, &mut driver, client.as_mut(), shutdown)
        .await;

    info!("Wrote {} frames", link.writes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "tmbtledd",
            "--interval",
            "20",
            "--imperial",
            "--pairing-dir",
            "/var/lib/tmbtled",
        ]);
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.link.performance_interval_ms, 20.0);
        assert_eq!(config.units, UnitSetting::Imperial);
        assert_eq!(config.link.pairing_dir, "/var/lib/tmbtled");
    }

    #[test]
    fn test_metric_conflicts_with_imperial() {
        assert!(Args::try_parse_from(["tmbtledd", "--metric", "--imperial"]).is_err());
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let config = load_config("/nonexistent/tmbtled.toml").unwrap();
        assert_eq!(config.link.rescan_delay_ms, 1000);
    }
}
