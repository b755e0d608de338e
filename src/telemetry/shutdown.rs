// SPDX-License-Identifier: MIT
//! Ordered cleanup of telemetry providers.
//!
//! Providers are pushed onto a [`ShutdownStack`] as they are created. Shutting the
//! stack down runs every callback in reverse order, keeps going past failures, and
//! reports all of them together in a [`ShutdownError`].
use std::fmt;
use std::time::Duration;

use opentelemetry_sdk::error::OTelSdkResult;

type ShutdownFn = Box<dyn FnOnce(Duration) -> OTelSdkResult + Send>;

/// Named cleanup callbacks, run last-in first-out.
#[derive(Default)]
pub struct ShutdownStack {
    entries: Vec<(&'static str, ShutdownFn)>,
}

impl fmt::Debug for ShutdownStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownStack")
            .field("components", &self.components())
            .finish()
    }
}

impl ShutdownStack {
    /// Empty stack; shutting it down is a no-op.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cleanup callback. It receives the timeout passed to
    /// [`ShutdownStack::shutdown`].
    pub fn push<F>(&mut self, component: &'static str, f: F)
    where
        F: FnOnce(Duration) -> OTelSdkResult + Send + 'static,
    {
        self.entries.push((component, Box::new(f)));
    }

    /// Component names in registration order.
    pub fn components(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(name, _)| *name).collect()
    }

    /// `true` when nothing has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every callback in reverse registration order.
    ///
    /// Each callback gets the full `timeout`. Failures are collected rather than
    /// short-circuiting, so later callbacks always run.
    pub fn shutdown(self, timeout: Duration) -> Result<(), ShutdownError> {
        let mut failures = Vec::new();
        for (component, f) in self.entries.into_iter().rev() {
            match f(timeout) {
                Ok(()) => tracing::debug!(component, "telemetry component shut down"),
                Err(e) => {
                    tracing::warn!(component, error = %e, "telemetry component failed to shut down");
                    failures.push((component, e.to_string()));
                }
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ShutdownError { failures })
        }
    }
}

/// One or more components failed to shut down.
#[derive(Debug, thiserror::Error)]
#[error("telemetry shutdown failed: {}", join_failures(.failures))]
pub struct ShutdownError {
    failures: Vec<(&'static str, String)>,
}

impl ShutdownError {
    /// `(component, message)` pairs in the order the failures happened.
    pub fn failures(&self) -> &[(&'static str, String)] {
        &self.failures
    }
}

fn join_failures(failures: &[(&'static str, String)]) -> String {
    failures
        .iter()
        .map(|(component, msg)| format!("{component}: {msg}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_sdk::error::OTelSdkError;
    use std::sync::{Arc, Mutex};

    fn recording(
        log: &Arc<Mutex<Vec<&'static str>>>,
        name: &'static str,
        result: OTelSdkResult,
    ) -> impl FnOnce(Duration) -> OTelSdkResult + Send + 'static {
        let log = Arc::clone(log);
        move |_| {
            log.lock().unwrap().push(name);
            result
        }
    }

    #[test]
    fn empty_stack_shuts_down_cleanly() {
        let stack = ShutdownStack::new();
        assert!(stack.is_empty());
        assert!(stack.shutdown(Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn runs_in_reverse_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = ShutdownStack::new();
        stack.push("tracer", recording(&log, "tracer", Ok(())));
        stack.push("meter", recording(&log, "meter", Ok(())));
        stack.push("logger", recording(&log, "logger", Ok(())));
        assert_eq!(stack.components(), ["tracer", "meter", "logger"]);

        stack.shutdown(Duration::from_secs(1)).unwrap();
        assert_eq!(*log.lock().unwrap(), ["logger", "meter", "tracer"]);
    }

    #[test]
    fn keeps_going_and_reports_every_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = ShutdownStack::new();
        stack.push(
            "tracer",
            recording(&log, "tracer", Err(OTelSdkError::AlreadyShutdown)),
        );
        stack.push("meter", recording(&log, "meter", Ok(())));
        stack.push(
            "logger",
            recording(
                &log,
                "logger",
                Err(OTelSdkError::InternalFailure("exporter gone".into())),
            ),
        );

        let err = stack.shutdown(Duration::from_secs(1)).unwrap_err();
        assert_eq!(*log.lock().unwrap(), ["logger", "meter", "tracer"]);

        let components: Vec<_> = err.failures().iter().map(|(c, _)| *c).collect();
        assert_eq!(components, ["logger", "tracer"]);
        let msg = err.to_string();
        assert!(msg.starts_with("telemetry shutdown failed: logger: "));
        assert!(msg.contains("exporter gone"));
    }

    #[test]
    fn forwards_timeout_to_callbacks() {
        let seen = Arc::new(Mutex::new(None));
        let mut stack = ShutdownStack::new();
        let sink = Arc::clone(&seen);
        stack.push("tracer", move |timeout| {
            *sink.lock().unwrap() = Some(timeout);
            Ok(())
        });
        stack.shutdown(Duration::from_millis(750)).unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(Duration::from_millis(750)));
    }
}
