//! Observability and time ports.
//!
//! `MetricSink::report` is fire-and-forget: the signature is infallible and a
//! sink must never block the batch.

use std::time::Instant;

/// Structured metric fields, in emission order.
pub type MetricFields<'a> = &'a [(&'static str, String)];

pub trait MetricSink {
    fn report(&self, name: &str, fields: MetricFields<'_>);
}

/// Default sink: one `tracing` event per metric.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMetricSink;

impl MetricSink for TracingMetricSink {
    fn report(&self, name: &str, fields: MetricFields<'_>) {
        let tail = fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        tracing::info!(metric = name, "{tail}");
    }
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetricSink;

impl MetricSink for NoopMetricSink {
    fn report(&self, _name: &str, _fields: MetricFields<'_>) {}
}

/// Monotonic time source used for deadline enforcement.
///
/// Injected so tests control time without sleeping.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
