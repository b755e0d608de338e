// SPDX-License-Identifier: MIT
//! Crate wiring an OpenTelemetry SDK (traces, metrics, optional logs) into an application.
//!
//! Two export paths are offered:
//! * **stdout** – human-readable telemetry on standard output, for demos and debugging.
//! * **gRPC** – OTLP over a single shared tonic channel to a collector.
//!
//! The primary entry points are found in the [`telemetry`] module: [`telemetry::TelemetryConfig`],
//! [`telemetry::init_telemetry`], and [`telemetry::TelemetryHandle`].
//!
//! # Feature Flags
//! * `console-log` – add a compact console formatter (file/line/thread id).
//! * `logs` – enable a logger provider and bridge tracing events into logs.
//!
//! # Quick Start
//! ```no_run
//! use otel_setup::telemetry::{init_telemetry, TelemetryConfig};
//! fn main() -> anyhow::Result<()> {
//!     let handle = init_telemetry(TelemetryConfig::default().with_service_name("my-app"))?;
//!     // business logic
//!     handle.shutdown()?;
//!     Ok(())
//! }
//! ```
pub mod telemetry;

#[cfg(test)]
mod tests {
    use super::telemetry::{init_telemetry, TelemetryConfig};

    #[tokio::test]
    async fn telemetry_init_works() {
        let mut cfg = TelemetryConfig::default();
        cfg.install_subscriber = false;
        let handle = init_telemetry(cfg).expect("telemetry init");
        handle.shutdown().expect("shutdown");
    }
}
