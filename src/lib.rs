// src/lib.rs
pub mod aggregate;
pub mod config;
pub mod gateway;
pub mod health;
pub mod metrics;
pub mod server;
pub mod upstream;

pub use aggregate::{Branch, CompositeResponse, FanOutAggregator};
pub use gateway::Gateway;
pub use health::{DependencyProbe, HealthAggregator, HealthReport};
pub use upstream::{UpstreamClient, UpstreamIdentifier};
