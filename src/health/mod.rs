// src/health/mod.rs
mod aggregator;
mod probe;
mod status;

pub use aggregator::{AlwaysHealthy, FnCheck, HealthAggregator, HealthCheck};
pub use probe::DependencyProbe;
pub use status::{HealthReport, HealthStatus, ProbeOutcome};
