// SPDX-License-Identifier: MIT
//! Telemetry initialization helpers (traces and metrics always, optional logs).
//!
//! This module wires OpenTelemetry providers + `tracing` for a typical service.
//! Two export paths exist and differ only in the exporters they plug in:
//!
//! * [`init_stdout`] – human-readable output on standard output, for local debugging.
//! * [`init_grpc`] – OTLP over one shared gRPC channel to a collector
//!   (default `http://localhost:4317`, plaintext).
//!
//! [`init_telemetry`] picks one based on [`TelemetryConfig::exporter`].
//!
//! Feature flags (Cargo features) influence behavior:
//!
//! * `console-log` – add a compact console formatting layer.
//! * `logs` – build a logger provider on either path and bridge tracing events into it.
//!
//! # Example
//! ```no_run
//! use otel_setup::telemetry::{init_telemetry, TelemetryConfig};
//! fn main() -> anyhow::Result<()> {
//!     let handle = init_telemetry(TelemetryConfig::from_env()?)?;
//!     // ... application logic ...
//!     handle.shutdown()?; // flush remaining spans and metrics
//!     Ok(())
//! }
//! ```
//!
//! # Shutdown
//! Providers are shut down in reverse creation order (logger, meter, tracer). Every
//! provider is attempted even if an earlier one fails; the failures are returned
//! together as a [`ShutdownError`]. If setup itself fails part-way, the providers
//! built so far are shut down the same way before the error is returned.
//!
//! # Threading Model
//! Batch processors and the periodic metric reader run on their own threads. The gRPC
//! path needs a multi-threaded Tokio runtime: the channel is driven by Tokio while
//! shutdown blocks the calling thread.
use std::time::Duration;

use anyhow::{Context, Result};
use opentelemetry::metrics::{Meter, MeterProvider as _};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::global;
#[cfg(feature = "logs")]
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
#[cfg(feature = "logs")]
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};
use tracing::Subscriber;
use tracing_opentelemetry::OpenTelemetryLayer;
#[cfg(not(all(feature = "console-log", feature = "logs")))]
use tracing_subscriber::layer::Identity;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

pub mod config;
pub mod grpc;
pub mod propagation;
mod providers;
pub mod resource;
pub mod shutdown;
mod stdout;

pub use config::{ConfigError, ExporterKind, TelemetryConfig};
pub use shutdown::{ShutdownError, ShutdownStack};

/// Timeout applied by [`TelemetryHandle::shutdown`].
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

const INSTRUMENTATION_SCOPE: &str = env!("CARGO_PKG_NAME");

/// Handle owning the configured providers.
///
/// Providers are reachable through the handle whether or not they were also
/// registered as globals. Call [`TelemetryHandle::shutdown`] at a controlled point
/// (typically just before process exit) so final batches are flushed.
pub struct TelemetryHandle {
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
    #[cfg(feature = "logs")]
    logger_provider: SdkLoggerProvider,
    shutdown: ShutdownStack,
}

impl std::fmt::Debug for TelemetryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryHandle")
            .field("shutdown", &self.shutdown)
            .finish_non_exhaustive()
    }
}

/// Providers built by one of the export paths, before they are wrapped in a handle.
struct Providers {
    tracer: SdkTracerProvider,
    meter: SdkMeterProvider,
    #[cfg(feature = "logs")]
    logger: SdkLoggerProvider,
}

impl Providers {
    /// Wrap the providers in a handle owning `shutdown`, the stack each provider
    /// was pushed onto as it was built.
    fn into_handle(self, shutdown: ShutdownStack) -> TelemetryHandle {
        TelemetryHandle {
            tracer_provider: self.tracer,
            meter_provider: self.meter,
            #[cfg(feature = "logs")]
            logger_provider: self.logger,
            shutdown,
        }
    }
}

fn track_tracer(stack: &mut ShutdownStack, provider: &SdkTracerProvider) {
    let provider = provider.clone();
    stack.push("tracer", move |timeout| provider.shutdown_with_timeout(timeout));
}

fn track_meter(stack: &mut ShutdownStack, provider: &SdkMeterProvider) {
    let provider = provider.clone();
    stack.push("meter", move |timeout| provider.shutdown_with_timeout(timeout));
}

#[cfg(feature = "logs")]
fn track_logger(stack: &mut ShutdownStack, provider: &SdkLoggerProvider) {
    let provider = provider.clone();
    stack.push("logger", move |timeout| provider.shutdown_with_timeout(timeout));
}

impl TelemetryHandle {
    /// The tracer provider, for callers passing it explicitly instead of via globals.
    pub fn tracer_provider(&self) -> &SdkTracerProvider {
        &self.tracer_provider
    }

    /// The meter provider, for callers passing it explicitly instead of via globals.
    pub fn meter_provider(&self) -> &SdkMeterProvider {
        &self.meter_provider
    }

    /// The logger provider bridged from `tracing` events.
    #[cfg(feature = "logs")]
    pub fn logger_provider(&self) -> &SdkLoggerProvider {
        &self.logger_provider
    }

    /// Tracer from this handle's provider, independent of the global registry.
    pub fn tracer(&self, name: impl Into<std::borrow::Cow<'static, str>>) -> SdkTracer {
        self.tracer_provider.tracer(name)
    }

    /// Meter from this handle's provider, independent of the global registry.
    pub fn meter(&self, name: &'static str) -> Meter {
        self.meter_provider.meter(name)
    }

    /// `tracing` layer exporting spans through this handle's tracer provider.
    ///
    /// Useful with `install_subscriber = false` when the application builds its own
    /// subscriber stack.
    pub fn tracing_layer<S>(&self) -> OpenTelemetryLayer<S, SdkTracer>
    where
        S: Subscriber + for<'span> LookupSpan<'span>,
    {
        OpenTelemetryLayer::new(self.tracer(INSTRUMENTATION_SCOPE))
    }

    /// Flush and shutdown all providers using [`DEFAULT_SHUTDOWN_TIMEOUT`].
    ///
    /// # Examples
    /// ```no_run
    /// # use otel_setup::telemetry::{init_telemetry, TelemetryConfig};
    /// # fn main() -> anyhow::Result<()> {
    /// let handle = init_telemetry(TelemetryConfig::default())?;
    /// // work...
    /// handle.shutdown()?;
    /// # Ok(()) }
    /// ```
    pub fn shutdown(self) -> Result<(), ShutdownError> {
        self.shutdown_with_timeout(DEFAULT_SHUTDOWN_TIMEOUT)
    }

    /// Flush and shutdown all providers, giving each one `timeout`.
    ///
    /// Returns `Ok(())` if every provider shut down cleanly, otherwise a
    /// [`ShutdownError`] naming each failing component.
    pub fn shutdown_with_timeout(self, timeout: Duration) -> Result<(), ShutdownError> {
        self.shutdown.shutdown(timeout)
    }

    /// Install the subscriber and globals requested by `cfg`.
    fn install(&self, cfg: &TelemetryConfig) -> Result<()> {
        if cfg.install_subscriber {
            self.install_subscriber(cfg)?;
        }
        if cfg.register_globals {
            global::set_text_map_propagator(propagation::composite_propagator());
            global::set_tracer_provider(self.tracer_provider.clone());
            global::set_meter_provider(self.meter_provider.clone());
        }
        Ok(())
    }

    fn install_subscriber(&self, cfg: &TelemetryConfig) -> Result<()> {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_filter));

        // Console formatting: plain compact single-line output.
        #[cfg(feature = "console-log")]
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .compact();
        #[cfg(not(feature = "console-log"))]
        let fmt_layer = Identity::new();

        #[cfg(feature = "logs")]
        let bridge_layer = OpenTelemetryTracingBridge::new(&self.logger_provider);
        #[cfg(not(feature = "logs"))]
        let bridge_layer = Identity::new();

        Registry::default()
            .with(filter)
            .with(fmt_layer)
            .with(bridge_layer)
            .with(self.tracing_layer())
            .try_init()
            .context("failed to install tracing subscriber")
    }

    /// Shut everything down after a failed setup step and return `err`, annotated
    /// with the shutdown failure if there was one.
    fn abort(self, err: anyhow::Error) -> anyhow::Error {
        unwind(self.shutdown, err)
    }
}

fn unwind(stack: ShutdownStack, err: anyhow::Error) -> anyhow::Error {
    match stack.shutdown(DEFAULT_SHUTDOWN_TIMEOUT) {
        Ok(()) => err,
        Err(shutdown_err) => err.context(format!("telemetry setup aborted; {shutdown_err}")),
    }
}

/// Initialize telemetry using the export path selected by `cfg.exporter`.
///
/// # Errors
/// Returns an error if the configuration is invalid, an exporter cannot be built,
/// or the subscriber cannot be installed.
pub fn init_telemetry(cfg: TelemetryConfig) -> Result<TelemetryHandle> {
    match cfg.exporter {
        ExporterKind::Stdout => init_stdout(cfg),
        ExporterKind::Grpc => init_grpc(cfg),
    }
}

/// Initialize telemetry exporting to standard output.
///
/// Spans are batched every `trace_batch_delay` and metrics pushed every
/// `metric_interval` (1s and 3s by default for this path).
///
/// # Examples
/// ```no_run
/// use otel_setup::telemetry::{init_stdout, TelemetryConfig};
/// let handle = init_stdout(TelemetryConfig::default().with_service_name("demo")).expect("init");
/// // ... run logic ...
/// handle.shutdown().expect("shutdown");
/// ```
pub fn init_stdout(cfg: TelemetryConfig) -> Result<TelemetryHandle> {
    cfg.validate()?;
    let resource = resource::build_resource(&cfg);

    let mut shutdown = ShutdownStack::new();

    let tracer = stdout::tracer_provider(resource.clone(), &cfg);
    track_tracer(&mut shutdown, &tracer);
    let meter = stdout::meter_provider(resource.clone(), &cfg);
    track_meter(&mut shutdown, &meter);
    #[cfg(feature = "logs")]
    let logger = stdout::logger_provider(resource);
    #[cfg(feature = "logs")]
    track_logger(&mut shutdown, &logger);

    let providers = Providers {
        tracer,
        meter,
        #[cfg(feature = "logs")]
        logger,
    };
    finish(providers.into_handle(shutdown), &cfg)
}

/// Initialize telemetry exporting over OTLP/gRPC to `cfg.endpoint`.
///
/// All exporters share one lazily-connected channel, so this succeeds without a
/// running collector; export errors surface later from the SDK.
///
/// Must be called inside a **multi-threaded** Tokio runtime. Shutdown blocks the
/// calling thread while the channel is driven by Tokio, so under a current-thread
/// runtime nothing is sent and shutdown fails once its timeout elapses.
///
/// # Errors
/// Returns an error for an invalid configuration or endpoint, or when an exporter
/// cannot be built. Providers created before the failure are shut down first.
pub fn init_grpc(cfg: TelemetryConfig) -> Result<TelemetryHandle> {
    cfg.validate()?;
    let channel = grpc::connect(&cfg)?;
    let resource = resource::build_resource(&cfg);

    let mut shutdown = ShutdownStack::new();

    let tracer = grpc::tracer_provider(resource.clone(), &cfg, channel.clone())?;
    track_tracer(&mut shutdown, &tracer);

    let meter = match grpc::meter_provider(resource.clone(), &cfg, channel.clone()) {
        Ok(provider) => provider,
        Err(e) => return Err(unwind(shutdown, e)),
    };
    track_meter(&mut shutdown, &meter);

    #[cfg(feature = "logs")]
    let logger = match grpc::logger_provider(resource, &cfg, channel) {
        Ok(provider) => provider,
        Err(e) => return Err(unwind(shutdown, e)),
    };
    #[cfg(feature = "logs")]
    track_logger(&mut shutdown, &logger);

    let providers = Providers {
        tracer,
        meter,
        #[cfg(feature = "logs")]
        logger,
    };
    finish(providers.into_handle(shutdown), &cfg)
}

fn finish(handle: TelemetryHandle, cfg: &TelemetryConfig) -> Result<TelemetryHandle> {
    if let Err(e) = handle.install(cfg) {
        return Err(handle.abort(e));
    }
    tracing::info!(
        service = %cfg.service_name,
        exporter = %cfg.exporter,
        "telemetry initialized"
    );
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_sdk::error::OTelSdkError;
    use std::sync::{Arc, Mutex};

    #[test]
    fn unwind_shuts_down_everything_and_keeps_the_setup_error() {
        let ran = Arc::new(Mutex::new(Vec::new()));
        let mut stack = ShutdownStack::new();
        let log = Arc::clone(&ran);
        stack.push("tracer", move |_| {
            log.lock().unwrap().push("tracer");
            Ok(())
        });
        let log = Arc::clone(&ran);
        stack.push("meter", move |_| {
            log.lock().unwrap().push("meter");
            Err(OTelSdkError::InternalFailure("reader stuck".into()))
        });

        let err = unwind(stack, anyhow::anyhow!("failed to create log exporter"));

        assert_eq!(*ran.lock().unwrap(), ["meter", "tracer"]);
        let rendered = format!("{err:#}");
        assert!(rendered.contains("telemetry setup aborted"));
        assert!(rendered.contains("reader stuck"));
        assert!(rendered.contains("failed to create log exporter"));
    }

    #[test]
    fn unwind_returns_setup_error_untouched_when_cleanup_succeeds() {
        let mut stack = ShutdownStack::new();
        stack.push("tracer", |_| Ok(()));
        let err = unwind(stack, anyhow::anyhow!("failed to create metrics exporter"));
        assert_eq!(err.to_string(), "failed to create metrics exporter");
    }

    #[test]
    fn failed_install_shuts_down_the_providers() {
        let handle = init_stdout(TelemetryConfig {
            install_subscriber: false,
            register_globals: false,
            ..TelemetryConfig::default()
        })
        .unwrap();
        let tracer_provider = handle.tracer_provider().clone();
        let meter_provider = handle.meter_provider().clone();

        let err = handle.abort(anyhow::anyhow!("failed to install tracing subscriber"));
        assert!(err.to_string().contains("failed to install tracing subscriber"));
        assert!(matches!(
            tracer_provider.shutdown(),
            Err(OTelSdkError::AlreadyShutdown)
        ));
        assert!(matches!(
            meter_provider.shutdown(),
            Err(OTelSdkError::AlreadyShutdown)
        ));
    }

    #[test]
    fn stdout_registers_every_provider_once_in_creation_order() {
        let handle = init_stdout(TelemetryConfig {
            install_subscriber: false,
            register_globals: false,
            ..TelemetryConfig::default()
        })
        .unwrap();
        #[cfg(not(feature = "logs"))]
        assert_eq!(handle.shutdown.components(), ["tracer", "meter"]);
        #[cfg(feature = "logs")]
        assert_eq!(handle.shutdown.components(), ["tracer", "meter", "logger"]);
        handle.shutdown().unwrap();
    }
}
