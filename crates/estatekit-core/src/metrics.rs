//! Fire-and-forget operational counters.
//!
//! Services record domain events (logins, evictions, access denials)
//! through [`MetricsSink`]; the Prometheus-backed implementation
//! exposes them for scraping, and [`NoopMetrics`] is for tests.

use std::sync::Arc;

use prometheus::{CounterVec, Encoder, Opts, Registry, TextEncoder};

use crate::error::EstateKitError;

/// Fire-and-forget counter sink. Implementations must never fail the
/// calling operation.
pub trait MetricsSink: Send + Sync {
    fn incr(&self, event: &str);
}

/// Prometheus-backed metrics: one counter family labelled by event.
#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Arc<Registry>,
    events: CounterVec,
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self, EstateKitError> {
        let registry = Registry::new();
        let events = CounterVec::new(
            Opts::new("estatekit_events_total", "Domain events by type"),
            &["event"],
        )
        .map_err(|e| EstateKitError::Internal(format!("metrics init: {e}")))?;
        registry
            .register(Box::new(events.clone()))
            .map_err(|e| EstateKitError::Internal(format!("metrics register: {e}")))?;
        Ok(Self {
            registry: Arc::new(registry),
            events,
        })
    }

    /// Encode all registered metrics in Prometheus text format.
    pub fn encode_text(&self) -> Result<String, EstateKitError> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .map_err(|e| EstateKitError::Internal(format!("metrics encode: {e}")))?;
        String::from_utf8(buf).map_err(|e| EstateKitError::Internal(format!("metrics utf8: {e}")))
    }
}

impl MetricsSink for PrometheusMetrics {
    fn incr(&self, event: &str) {
        self.events.with_label_values(&[event]).inc();
    }
}

/// Discards all events. Useful in tests.
#[derive(Debug, Clone, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn incr(&self, _event: &str) {}
}
