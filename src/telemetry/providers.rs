// SPDX-License-Identifier: MIT
//! Provider builders shared by the stdout and gRPC paths.
//!
//! The export path only decides which exporter is plugged in; batching and
//! flush policy live here.
#[cfg(feature = "logs")]
use opentelemetry_sdk::logs::{LogExporter, SdkLoggerProvider};
use opentelemetry_sdk::metrics::exporter::PushMetricExporter;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::trace::{
    BatchConfigBuilder, BatchSpanProcessor, Sampler, SdkTracerProvider, SpanExporter,
};
use opentelemetry_sdk::Resource;

use super::config::TelemetryConfig;

/// Tracer provider sampling every span and batching them for `exporter`.
pub(crate) fn tracer_provider<E>(
    exporter: E,
    resource: Resource,
    cfg: &TelemetryConfig,
) -> SdkTracerProvider
where
    E: SpanExporter + 'static,
{
    let batch = BatchConfigBuilder::default()
        .with_scheduled_delay(cfg.trace_batch_delay)
        .build();
    let processor = BatchSpanProcessor::builder(exporter)
        .with_batch_config(batch)
        .build();
    SdkTracerProvider::builder()
        .with_sampler(Sampler::AlwaysOn)
        .with_span_processor(processor)
        .with_resource(resource)
        .build()
}

/// Meter provider pushing to `exporter` every `metric_interval`.
pub(crate) fn meter_provider<E>(
    exporter: E,
    resource: Resource,
    cfg: &TelemetryConfig,
) -> SdkMeterProvider
where
    E: PushMetricExporter + 'static,
{
    let reader = PeriodicReader::builder(exporter)
        .with_interval(cfg.metric_interval)
        .build();
    SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(resource)
        .build()
}

#[cfg(feature = "logs")]
pub(crate) fn logger_provider<E>(exporter: E, resource: Resource) -> SdkLoggerProvider
where
    E: LogExporter + 'static,
{
    SdkLoggerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build()
}
