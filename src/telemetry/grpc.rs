// SPDX-License-Identifier: MIT
//! OTLP/gRPC exporters sharing a single collector connection.
//!
//! The channel connects lazily, so building the pipeline does no network I/O and
//! succeeds even when no collector is listening yet. Transport is plaintext.
use anyhow::{Context, Result};
#[cfg(feature = "logs")]
use opentelemetry_otlp::LogExporter;
use opentelemetry_otlp::{MetricExporter, SpanExporter, WithExportConfig, WithTonicConfig};
#[cfg(feature = "logs")]
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use tonic::transport::{Channel, Endpoint};

use super::config::TelemetryConfig;
use super::providers;

/// Add an `http://` scheme when the endpoint is a bare `host:port`.
pub fn normalize_endpoint(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

/// Open a lazily-connected channel to the configured collector.
///
/// Must be called from within a Tokio runtime.
pub(crate) fn connect(cfg: &TelemetryConfig) -> Result<Channel> {
    let uri = normalize_endpoint(&cfg.endpoint);
    let endpoint = Endpoint::from_shared(uri.clone())
        .with_context(|| format!("failed to create gRPC connection to collector at `{uri}`"))?
        .connect_timeout(cfg.export_timeout);
    tracing::debug!(endpoint = %uri, "created lazy gRPC channel to collector");
    Ok(endpoint.connect_lazy())
}

pub(crate) fn tracer_provider(
    resource: Resource,
    cfg: &TelemetryConfig,
    channel: Channel,
) -> Result<SdkTracerProvider> {
    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_channel(channel)
        .with_timeout(cfg.export_timeout)
        .build()
        .context("failed to create trace exporter")?;
    Ok(providers::tracer_provider(exporter, resource, cfg))
}

pub(crate) fn meter_provider(
    resource: Resource,
    cfg: &TelemetryConfig,
    channel: Channel,
) -> Result<SdkMeterProvider> {
    let exporter = MetricExporter::builder()
        .with_tonic()
        .with_channel(channel)
        .with_timeout(cfg.export_timeout)
        .build()
        .context("failed to create metrics exporter")?;
    Ok(providers::meter_provider(exporter, resource, cfg))
}

#[cfg(feature = "logs")]
pub(crate) fn logger_provider(
    resource: Resource,
    cfg: &TelemetryConfig,
    channel: Channel,
) -> Result<SdkLoggerProvider> {
    let exporter = LogExporter::builder()
        .with_tonic()
        .with_channel(channel)
        .with_timeout(cfg.export_timeout)
        .build()
        .context("failed to create log exporter")?;
    Ok(providers::logger_provider(exporter, resource))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_port_gets_http_scheme() {
        assert_eq!(normalize_endpoint("localhost:4317"), "http://localhost:4317");
        assert_eq!(
            normalize_endpoint(" http://collector:4317/ "),
            "http://collector:4317"
        );
        assert_eq!(
            normalize_endpoint("https://otel.example.com"),
            "https://otel.example.com"
        );
    }

    #[tokio::test]
    async fn connect_does_not_need_a_listening_collector() {
        let cfg = TelemetryConfig::default().with_endpoint("127.0.0.1:1");
        assert!(connect(&cfg).is_ok());
    }

    #[tokio::test]
    async fn connect_rejects_malformed_endpoint() {
        let cfg = TelemetryConfig::default().with_endpoint("http://bad host:4317");
        let err = connect(&cfg).unwrap_err();
        assert!(err.to_string().contains("bad host"));
    }
}
