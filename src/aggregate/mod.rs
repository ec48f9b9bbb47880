// src/aggregate/mod.rs
mod aggregator;
mod composite;

pub use aggregator::{AggregationError, Branch, FanOutAggregator};
pub use composite::{BranchResult, CompositeResponse, REQUEST_TIME_FIELD};
