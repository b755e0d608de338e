// SPDX-License-Identifier: MIT
use anyhow::Result;
use clap::Parser;
use opentelemetry::{global, KeyValue};
use otel_setup::telemetry::{config, init_telemetry, ExporterKind, TelemetryConfig};
use tracing::{info, instrument};

/// Emit a few spans, events and metrics through the configured exporter.
///
/// Flags take precedence over the environment variables of the same meaning.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Export path: `stdout` or `grpc` (overrides `TELEMETRY_EXPORTER`).
    #[arg(long)]
    exporter: Option<ExporterKind>,

    /// Service name reported in the resource (overrides `APP_NAME`).
    #[arg(long)]
    service_name: Option<String>,

    /// Collector endpoint for the gRPC path (overrides `OTEL_EXPORTER_OTLP_ENDPOINT`).
    #[arg(long)]
    endpoint: Option<String>,
}

impl Args {
    /// Flag values keyed like the environment variables they override.
    fn lookup(&self, key: &str) -> Option<String> {
        match key {
            config::TELEMETRY_EXPORTER => self.exporter.map(|e| e.to_string()),
            config::APP_NAME => self.service_name.clone(),
            config::OTEL_EXPORTER_OTLP_ENDPOINT => self.endpoint.clone(),
            _ => None,
        }
    }
}

#[instrument]
async fn simulated_work(iteration: u64) {
    info!(task = "simulated_work", iteration, "starting task");
    // Placeholder for actual business logic
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;
    info!(task = "simulated_work", iteration, "completed task");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let cfg = TelemetryConfig::from_lookup(config::layered(
        |key| args.lookup(key),
        |key| std::env::var(key).ok(),
    ))?;

    let telemetry = init_telemetry(cfg)?;
    info!("application started");

    let iterations = global::meter("otel-setup-demo")
        .u64_counter("demo.iterations")
        .with_description("Number of simulated work iterations")
        .build();

    for i in 0..3 {
        simulated_work(i).await;
        iterations.add(1, &[KeyValue::new("outcome", "ok")]);
    }

    info!("shutting down");
    telemetry.shutdown()?;
    Ok(())
}
