mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::time::interval;

use netpulse_telemetry::{Category, SnmpTransport, TelemetryCollector};

use crate::config::{DeviceEntry, LogFormat, LoggingConfig, PollerConfig};

/// Poll SNMP devices and print telemetry records as JSON lines.
#[derive(Parser, Debug)]
#[command(name = "netpulse-poll")]
#[command(about = "Sample device telemetry over SNMP", long_about = None)]
struct Args {
    /// Path to the configuration file (JSON5 format).
    #[arg(short, long, default_value = "netpulse.json5")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = PollerConfig::load(&args.config)
        .with_context(|| format!("failed to load config from {:?}", args.config))?;

    init_tracing(&config.logging).context("failed to initialize tracing")?;

    tracing::info!(
        config = ?args.config,
        devices = config.devices.len(),
        "Starting netpulse-poll"
    );

    let collector = Arc::new(TelemetryCollector::new());
    let filter = config.poll.category_filter;

    match config.poll.interval_secs {
        None => poll_all(&collector, &config.devices, filter).await,
        Some(secs) => {
            let mut ticker = interval(Duration::from_secs(secs.max(1)));
            loop {
                tokio::select! {
                    _ = ticker.tick() => poll_all(&collector, &config.devices, filter).await,
                    _ = signal::ctrl_c() => {
                        tracing::info!("Shutting down");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Poll every configured device concurrently; each device gets its own
/// transport session, the rate cache is the only shared state.
async fn poll_all(
    collector: &Arc<TelemetryCollector>,
    devices: &[DeviceEntry],
    filter: Option<Category>,
) {
    let mut tasks = Vec::new();

    for entry in devices {
        let collector = collector.clone();
        let entry = entry.clone();
        tasks.push(tokio::spawn(async move {
            poll_device(&collector, &entry, filter).await;
        }));
    }

    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "device poll task panicked");
        }
    }
}

async fn poll_device(collector: &TelemetryCollector, entry: &DeviceEntry, filter: Option<Category>) {
    let device = entry.device();

    let mut transport = match SnmpTransport::connect(&device).await {
        Ok(transport) => transport,
        Err(e) => {
            tracing::warn!(device = %entry.name, error = %e, "failed to open session");
            return;
        }
    };

    match collector.device_info(&mut transport).await {
        Ok(info) => emit(&entry.name, "device_info", &info),
        Err(e) => tracing::warn!(device = %entry.name, error = %e, "device info probe failed"),
    }

    let indices = match collector.interface_report(&mut transport, filter, None).await {
        Ok(report) => {
            if report.filter_unmatched {
                tracing::warn!(device = %entry.name, "category filter matched no interfaces");
            }
            let indices = if entry.interfaces.is_empty() {
                report
                    .interfaces
                    .iter()
                    .filter(|r| r.category == Category::Physical)
                    .map(|r| r.descriptor.index)
                    .collect()
            } else {
                entry.interfaces.clone()
            };
            emit(&entry.name, "interfaces", &report);
            indices
        }
        Err(e) => {
            tracing::warn!(device = %entry.name, error = %e, "interface enumeration failed");
            Vec::new()
        }
    };

    if !indices.is_empty() {
        match collector
            .traffic(&mut transport, &device.cache_key(), &indices)
            .await
        {
            Ok(samples) => emit(&entry.name, "traffic", &samples),
            Err(e) => tracing::warn!(device = %entry.name, error = %e, "traffic sampling failed"),
        }
    }

    match collector.storage(&mut transport).await {
        Ok(report) => emit(&entry.name, "storage", &report),
        Err(e) => tracing::warn!(device = %entry.name, error = %e, "storage probe failed"),
    }
}

fn emit<T: serde::Serialize>(device: &str, record: &str, payload: &T) {
    let line = serde_json::json!({
        "device": device,
        "record": record,
        "data": payload,
    });
    println!("{line}");
}

/// Initialize tracing with the configured level and output format.
fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?,
    }

    Ok(())
}
