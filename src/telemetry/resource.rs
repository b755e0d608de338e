// SPDX-License-Identifier: MIT
//! Resource (service identity) shared by every provider.
use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;

use super::config::TelemetryConfig;

/// Build the resource describing this service.
///
/// `service.name` comes from the configuration; `service.version` and
/// `deployment.environment` are added alongside it. Attributes from
/// `OTEL_RESOURCE_ATTRIBUTES` are still picked up by the SDK detectors.
pub fn build_resource(cfg: &TelemetryConfig) -> Resource {
    Resource::builder()
        .with_service_name(cfg.service_name.clone())
        .with_attributes([
            KeyValue::new("service.version", cfg.service_version.clone()),
            KeyValue::new("deployment.environment", cfg.environment.clone()),
        ])
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::{Key, Value};

    #[test]
    fn carries_service_identity() {
        let mut cfg = TelemetryConfig::default().with_service_name("checkout");
        cfg.environment = "staging".into();
        let resource = build_resource(&cfg);

        assert_eq!(
            resource.get(&Key::new("service.name")),
            Some(Value::from("checkout"))
        );
        assert_eq!(
            resource.get(&Key::new("deployment.environment")),
            Some(Value::from("staging"))
        );
        assert_eq!(
            resource.get(&Key::new("service.version")),
            Some(Value::from(env!("CARGO_PKG_VERSION")))
        );
    }
}
