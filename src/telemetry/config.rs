// SPDX-License-Identifier: MIT
//! Telemetry configuration sourced from environment-style key lookups.
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Key holding the application name, the one value every deployment must set.
pub const APP_NAME: &str = "APP_NAME";
/// Standard OpenTelemetry fallback for the service name.
pub const OTEL_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";
/// Selects the export path (`stdout` or `grpc`).
pub const TELEMETRY_EXPORTER: &str = "TELEMETRY_EXPORTER";
/// Collector endpoint for the gRPC path.
pub const OTEL_EXPORTER_OTLP_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
/// Export (and connect) timeout in milliseconds.
pub const OTEL_EXPORTER_OTLP_TIMEOUT: &str = "OTEL_EXPORTER_OTLP_TIMEOUT";
/// Batch span processor scheduled delay in milliseconds.
pub const OTEL_BSP_SCHEDULE_DELAY: &str = "OTEL_BSP_SCHEDULE_DELAY";
/// Periodic metric reader interval in milliseconds.
pub const OTEL_METRIC_EXPORT_INTERVAL: &str = "OTEL_METRIC_EXPORT_INTERVAL";
/// Deployment environment (`deployment.environment`).
pub const RUST_ENV: &str = "RUST_ENV";

const DEFAULT_ENDPOINT: &str = "http://localhost:4317";

/// Where telemetry is exported to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExporterKind {
    /// Human-readable output on standard output.
    #[default]
    Stdout,
    /// OTLP over gRPC to a collector.
    Grpc,
}

impl fmt::Display for ExporterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExporterKind::Stdout => f.write_str("stdout"),
            ExporterKind::Grpc => f.write_str("grpc"),
        }
    }
}

/// Returned when an exporter name is neither `stdout` nor `grpc`.
#[derive(Debug, thiserror::Error)]
#[error("unknown exporter `{0}` (expected `stdout` or `grpc`)")]
pub struct ParseExporterError(String);

impl FromStr for ExporterKind {
    type Err = ParseExporterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdout" => Ok(ExporterKind::Stdout),
            "grpc" | "otlp" => Ok(ExporterKind::Grpc),
            other => Err(ParseExporterError(other.to_string())),
        }
    }
}

/// Errors raised while reading or validating a [`TelemetryConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    InvalidExporter(#[from] ParseExporterError),
    #[error("invalid duration for {key}: `{value}` (expected milliseconds)")]
    InvalidDuration { key: &'static str, value: String },
    #[error("service name must not be empty (set APP_NAME or OTEL_SERVICE_NAME)")]
    MissingServiceName,
}

/// Configuration used when initializing telemetry.
///
/// [`TelemetryConfig::default`] never touches the environment; use
/// [`TelemetryConfig::from_env`] to read the variables listed on
/// [`TelemetryConfig::from_lookup`].
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Service name reported in resource attributes (`service.name`).
    pub service_name: String,
    /// Service version reported in resource attributes (`service.version`).
    pub service_version: String,
    /// Deployment environment (`deployment.environment`).
    pub environment: String,
    /// Export path used by [`crate::telemetry::init_telemetry`].
    pub exporter: ExporterKind,
    /// Collector endpoint for the gRPC path. Example: `http://localhost:4317`.
    pub endpoint: String,
    /// Per-export timeout, also used as the gRPC connect timeout.
    pub export_timeout: Duration,
    /// Scheduled delay of the batch span processor.
    pub trace_batch_delay: Duration,
    /// Interval of the periodic metric reader.
    pub metric_interval: Duration,
    /// Filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Register providers and the propagator as process-wide globals.
    pub register_globals: bool,
    /// Install the `tracing` subscriber as the global default.
    pub install_subscriber: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::for_exporter(ExporterKind::Stdout)
    }
}

impl TelemetryConfig {
    /// Defaults for the given export path.
    ///
    /// The stdout path flushes quickly (1s spans, 3s metrics) so output shows up
    /// while experimenting; the gRPC path keeps the SDK defaults (5s, 60s).
    pub fn for_exporter(exporter: ExporterKind) -> Self {
        let (trace_batch_delay, metric_interval) = match exporter {
            ExporterKind::Stdout => (Duration::from_secs(1), Duration::from_secs(3)),
            ExporterKind::Grpc => (Duration::from_secs(5), Duration::from_secs(60)),
        };
        Self {
            service_name: env!("CARGO_PKG_NAME").to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "dev".to_string(),
            exporter,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            export_timeout: Duration::from_secs(10),
            trace_batch_delay,
            metric_interval,
            log_filter: "info".to_string(),
            register_globals: true,
            install_subscriber: true,
        }
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Recognised keys:
    /// * `APP_NAME`, falling back to `OTEL_SERVICE_NAME` – service name.
    /// * `TELEMETRY_EXPORTER` – `stdout` (default) or `grpc`.
    /// * `OTEL_EXPORTER_OTLP_ENDPOINT` – collector endpoint.
    /// * `OTEL_EXPORTER_OTLP_TIMEOUT`, `OTEL_BSP_SCHEDULE_DELAY`,
    ///   `OTEL_METRIC_EXPORT_INTERVAL` – milliseconds.
    /// * `RUST_ENV` – deployment environment.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let exporter = match get(TELEMETRY_EXPORTER) {
            Some(raw) => raw.parse()?,
            None => ExporterKind::default(),
        };
        let mut cfg = Self::for_exporter(exporter);

        if let Some(name) = get(APP_NAME).or_else(|| get(OTEL_SERVICE_NAME)) {
            cfg.service_name = name;
        }
        if let Some(endpoint) = get(OTEL_EXPORTER_OTLP_ENDPOINT) {
            cfg.endpoint = endpoint;
        }
        if let Some(env) = get(RUST_ENV) {
            cfg.environment = env;
        }
        if let Some(raw) = get(OTEL_EXPORTER_OTLP_TIMEOUT) {
            cfg.export_timeout = parse_millis(OTEL_EXPORTER_OTLP_TIMEOUT, &raw)?;
        }
        if let Some(raw) = get(OTEL_BSP_SCHEDULE_DELAY) {
            cfg.trace_batch_delay = parse_millis(OTEL_BSP_SCHEDULE_DELAY, &raw)?;
        }
        if let Some(raw) = get(OTEL_METRIC_EXPORT_INTERVAL) {
            cfg.metric_interval = parse_millis(OTEL_METRIC_EXPORT_INTERVAL, &raw)?;
        }
        Ok(cfg)
    }

    /// Replace the service name.
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Switch the export path without touching the flush intervals.
    pub fn with_exporter(mut self, exporter: ExporterKind) -> Self {
        self.exporter = exporter;
        self
    }

    /// Replace the collector endpoint (gRPC path only).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Check the configuration before any provider is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::MissingServiceName);
        }
        Ok(())
    }
}

/// Combine two lookups; `primary` wins wherever it has a value.
///
/// Typical use layers command-line flags over the environment so per-path
/// defaults are still chosen first and explicit settings applied on top.
pub fn layered<P, S>(primary: P, secondary: S) -> impl Fn(&str) -> Option<String>
where
    P: Fn(&str) -> Option<String>,
    S: Fn(&str) -> Option<String>,
{
    move |key| primary(key).or_else(|| secondary(key))
}

fn parse_millis(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::InvalidDuration {
            key,
            value: raw.to_string(),
        })
}
