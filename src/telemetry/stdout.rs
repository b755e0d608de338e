// SPDX-License-Identifier: MIT
//! Standard output exporters, for local inspection.
#[cfg(feature = "logs")]
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;

use super::config::TelemetryConfig;
use super::providers;

pub(crate) fn tracer_provider(resource: Resource, cfg: &TelemetryConfig) -> SdkTracerProvider {
    providers::tracer_provider(opentelemetry_stdout::SpanExporter::default(), resource, cfg)
}

pub(crate) fn meter_provider(resource: Resource, cfg: &TelemetryConfig) -> SdkMeterProvider {
    providers::meter_provider(opentelemetry_stdout::MetricExporter::default(), resource, cfg)
}

#[cfg(feature = "logs")]
pub(crate) fn logger_provider(resource: Resource) -> SdkLoggerProvider {
    providers::logger_provider(opentelemetry_stdout::LogExporter::default(), resource)
}
