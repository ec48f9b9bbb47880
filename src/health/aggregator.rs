// src/health/aggregator.rs
use super::{DependencyProbe, HealthReport, HealthStatus, ProbeOutcome};
use crate::metrics::MetricsCollector;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info};

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self) -> ProbeOutcome;
}

#[async_trait]
impl HealthCheck for DependencyProbe {
    async fn check(&self) -> ProbeOutcome {
        self.probe().await
    }
}

/// Reports the gateway process itself; always healthy.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysHealthy;

#[async_trait]
impl HealthCheck for AlwaysHealthy {
    async fn check(&self) -> ProbeOutcome {
        ProbeOutcome::Ok
    }
}

/// Adapts an async closure into a [`HealthCheck`].
pub struct FnCheck<F>(pub F);

#[async_trait]
impl<F, Fut> HealthCheck for FnCheck<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = ProbeOutcome> + Send + 'static,
{
    async fn check(&self) -> ProbeOutcome {
        (self.0)().await
    }
}

/// Named health checks run together into one [`HealthReport`].
#[derive(Default)]
pub struct HealthAggregator {
    checks: Vec<(String, Arc<dyn HealthCheck>)>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl HealthAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Register a check. Re-registering a name replaces the earlier check in
    /// place.
    pub fn register(mut self, name: impl Into<String>, check: impl HealthCheck + 'static) -> Self {
        let name = name.into();
        let check: Arc<dyn HealthCheck> = Arc::new(check);

        match self.checks.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => {
                info!(check = %name, "replacing registered health check");
                entry.1 = check;
            }
            None => self.checks.push((name, check)),
        }
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.checks.iter().map(|(name, _)| name.as_str())
    }

    /// Run every check concurrently. A check that panics is reported as
    /// unhealthy; no check prevents the others from being reported.
    pub async fn report(&self) -> HealthReport {
        let tasks = self.checks.iter().map(|(_, check)| {
            let check = check.clone();
            tokio::spawn(async move { check.check().await })
        });

        let results = futures::future::join_all(tasks).await;

        let mut entries = Vec::with_capacity(results.len());
        for ((name, _), result) in self.checks.iter().zip(results) {
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(check = %name, "health check task failed: {}", e);
                    ProbeOutcome::Failed(e.to_string())
                }
            };

            if let Some(metrics) = &self.metrics {
                metrics.record_probe(name, &outcome);
            }
            debug!(check = %name, outcome = outcome.label(), "health check complete");
            entries.push((name.clone(), HealthStatus::from(&outcome)));
        }

        HealthReport::new(entries)
    }
}
