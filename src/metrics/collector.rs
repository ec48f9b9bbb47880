// src/metrics/collector.rs
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Instant;
use anyhow::Result;

use crate::health::ProbeOutcome;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    // Inbound request metrics
    pub requests_total: IntCounterVec,
    pub request_duration_seconds: HistogramVec,

    // Fan-out metrics
    pub branch_results_total: IntCounterVec,
    pub upstream_errors_total: IntCounterVec,

    // Health metrics
    pub probe_outcomes_total: IntCounterVec,
    pub health_status: IntGaugeVec,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let requests_total = IntCounterVec::new(
            Opts::new("gateway_requests_total", "Total number of inbound requests"),
            &["route", "status_code"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "gateway_request_duration_seconds",
                "Inbound request duration in seconds",
            ),
            &["route"],
        )?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        let branch_results_total = IntCounterVec::new(
            Opts::new(
                "gateway_branch_results_total",
                "Resolved aggregation branches by label and result (success|fallback)",
            ),
            &["label", "result"],
        )?;
        registry.register(Box::new(branch_results_total.clone()))?;

        let upstream_errors_total = IntCounterVec::new(
            Opts::new("gateway_upstream_errors_total", "Upstream failures by kind"),
            &["kind"],
        )?;
        registry.register(Box::new(upstream_errors_total.clone()))?;

        let probe_outcomes_total = IntCounterVec::new(
            Opts::new(
                "gateway_probe_outcomes_total",
                "Health check outcomes (ok|failed|timed_out)",
            ),
            &["check", "outcome"],
        )?;
        registry.register(Box::new(probe_outcomes_total.clone()))?;

        let health_status = IntGaugeVec::new(
            Opts::new(
                "gateway_health_status",
                "Last reported health per check (1=UP, 0=DOWN)",
            ),
            &["check"],
        )?;
        registry.register(Box::new(health_status.clone()))?;

        Ok(Self {
            requests_total,
            request_duration_seconds,
            branch_results_total,
            upstream_errors_total,
            probe_outcomes_total,
            health_status,
        })
    }

    pub fn record_request(&self, route: &str, status_code: u16, duration: std::time::Duration) {
        let status = status_code.to_string();
        self.requests_total
            .with_label_values(&[route, &status])
            .inc();

        self.request_duration_seconds
            .with_label_values(&[route])
            .observe(duration.as_secs_f64());
    }

    pub fn record_branch(&self, label: &str, fallback: bool) {
        let result = if fallback { "fallback" } else { "success" };
        self.branch_results_total
            .with_label_values(&[label, result])
            .inc();
    }

    pub fn record_upstream_error(&self, kind: &str) {
        self.upstream_errors_total.with_label_values(&[kind]).inc();
    }

    pub fn record_probe(&self, check: &str, outcome: &ProbeOutcome) {
        self.probe_outcomes_total
            .with_label_values(&[check, outcome.label()])
            .inc();

        let value = if outcome.is_ok() { 1 } else { 0 };
        self.health_status.with_label_values(&[check]).set(value);
    }
}

// Helper for timing operations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
