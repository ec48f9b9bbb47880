// src/aggregate/aggregator.rs
use super::composite::{BranchResult, CompositeResponse, REQUEST_TIME_FIELD};
use crate::metrics::MetricsCollector;
use crate::upstream::{BranchSource, FallbackPolicy, IdentifierError, UpstreamError, UpstreamIdentifier};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),

    #[error("invalid branch label '{0}'")]
    InvalidLabel(String),

    #[error("duplicate branch label '{0}'")]
    DuplicateLabel(String),

    #[error("branch '{label}' did not complete: {source}")]
    BranchPanicked {
        label: String,
        #[source]
        source: JoinError,
    },
}

/// One labeled identifier to resolve.
#[derive(Debug, Clone)]
pub struct Branch {
    pub label: String,
    pub identifier: UpstreamIdentifier,
}

impl Branch {
    pub fn new(label: impl Into<String>, identifier: UpstreamIdentifier) -> Self {
        Self {
            label: label.into(),
            identifier,
        }
    }

    /// Build a branch from a raw identifier, e.g. a path segment.
    pub fn parse(label: impl Into<String>, raw: &str) -> Result<Self, AggregationError> {
        Ok(Self::new(label, UpstreamIdentifier::parse(raw)?))
    }
}

/// Fans one request out to every branch concurrently, substitutes a fallback
/// for each branch that fails, and joins once all branches have resolved.
pub struct FanOutAggregator {
    source: Arc<dyn BranchSource>,
    fallback: Arc<dyn FallbackPolicy>,
    branch_deadline: Option<Duration>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl FanOutAggregator {
    pub fn new(source: Arc<dyn BranchSource>, fallback: Arc<dyn FallbackPolicy>) -> Self {
        Self {
            source,
            fallback,
            branch_deadline: None,
            metrics: None,
        }
    }

    /// A branch still pending after `deadline` resolves through the fallback.
    pub fn with_branch_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.branch_deadline = deadline;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn aggregate(&self, branches: Vec<Branch>) -> Result<CompositeResponse, AggregationError> {
        validate_labels(&branches)?;

        let mut labels = Vec::with_capacity(branches.len());
        let mut tasks = Vec::with_capacity(branches.len());

        for branch in branches {
            let source = self.source.clone();
            let fallback = self.fallback.clone();
            let metrics = self.metrics.clone();
            let deadline = self.branch_deadline;
            let label = branch.label.clone();

            tasks.push(tokio::spawn(async move {
                resolve_branch(
                    source.as_ref(),
                    fallback.as_ref(),
                    deadline,
                    &branch,
                    metrics.as_deref(),
                )
                .await
            }));
            labels.push(label);
        }

        // Join barrier: every branch resolves before the payload is built.
        let results = futures::future::join_all(tasks).await;

        let mut resolved = Vec::with_capacity(results.len());
        for (label, result) in labels.into_iter().zip(results) {
            match result {
                Ok(branch_result) => resolved.push((label, branch_result)),
                Err(source) => return Err(AggregationError::BranchPanicked { label, source }),
            }
        }

        Ok(CompositeResponse::new(resolved, Utc::now()))
    }
}

fn validate_labels(branches: &[Branch]) -> Result<(), AggregationError> {
    let mut seen = HashSet::with_capacity(branches.len());
    for branch in branches {
        if branch.label.is_empty() || branch.label == REQUEST_TIME_FIELD {
            return Err(AggregationError::InvalidLabel(branch.label.clone()));
        }
        if !seen.insert(branch.label.as_str()) {
            return Err(AggregationError::DuplicateLabel(branch.label.clone()));
        }
    }
    Ok(())
}

async fn resolve_branch(
    source: &dyn BranchSource,
    fallback: &dyn FallbackPolicy,
    deadline: Option<Duration>,
    branch: &Branch,
    metrics: Option<&MetricsCollector>,
) -> BranchResult {
    let outcome = match deadline {
        Some(deadline) => tokio::time::timeout(deadline, source.fetch(&branch.identifier))
            .await
            .unwrap_or(Err(UpstreamError::DeadlineExceeded)),
        None => source.fetch(&branch.identifier).await,
    };

    let result = match outcome {
        Ok(payload) => {
            debug!(label = %branch.label, identifier = %branch.identifier, "branch resolved");
            BranchResult::Success(payload)
        }
        Err(err) => {
            warn!(
                label = %branch.label,
                identifier = %branch.identifier,
                kind = err.kind(),
                error = %err,
                "upstream failed, substituting fallback"
            );
            if let Some(metrics) = metrics {
                metrics.record_upstream_error(err.kind());
            }
            BranchResult::Fallback(fallback.on_failure(&branch.identifier))
        }
    };

    if let Some(metrics) = metrics {
        metrics.record_branch(&branch.label, result.is_fallback());
    }
    result
}
