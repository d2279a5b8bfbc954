//! Observability sink injected into each pipeline component.

/// Counters and timings emitted by the pipeline.
pub trait MetricsSink: Send + Sync {
    fn increment(&self, name: &'static str, value: u64);

    fn timing_ms(&self, name: &'static str, millis: u64);
}

/// Emits every measurement as a `tracing` debug event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
    fn increment(&self, name: &'static str, value: u64) {
        tracing::debug!(metric = name, value, "counter");
    }

    fn timing_ms(&self, name: &'static str, millis: u64) {
        tracing::debug!(metric = name, millis, "timing");
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn increment(&self, _name: &'static str, _value: u64) {}

    fn timing_ms(&self, _name: &'static str, _millis: u64) {}
}
