// ────────────────────────────────
// src/gateway.rs
// Routes inbound requests to the fan-out aggregator and the health report.
// ────────────────────────────────

use crate::aggregate::{AggregationError, Branch, FanOutAggregator};
use crate::config::{Config, UpstreamConfig};
use crate::health::{AlwaysHealthy, DependencyProbe, HealthAggregator};
use crate::metrics::{MetricsCollector, Timer};
use crate::upstream::{NameFallback, UpstreamClient};
use anyhow::{Context, Result};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Method, Request, Response, StatusCode};
use percent_encoding::percent_decode_str;
use serde::Serialize;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{error, info};

/// Labels given to the two path identifiers of `/check/{id1}/{id2}`.
pub const CHECK_LABELS: [&str; 2] = ["name1", "name2"];

/// Name of the check that reports the gateway process itself.
pub const SELF_CHECK: &str = "availabilityItself";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Not Found")]
    NotFound,

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("path segment '{0}' is not valid percent-encoded UTF-8")]
    InvalidEncoding(String),

    #[error("{0}")]
    Aggregation(#[from] AggregationError),

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to build response: {0}")]
    Http(#[from] hyper::http::Error),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::InvalidEncoding(_)
            | GatewayError::Aggregation(_)
            | GatewayError::Encode(_)
            | GatewayError::Http(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Convert GatewayError to a plain-text response carrying the error message.
impl From<GatewayError> for Response<Body> {
    fn from(err: GatewayError) -> Self {
        let mut response = Response::new(Body::from(err.to_string()));
        *response.status_mut() = err.status();
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        response
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Route<'a> {
    Check(&'a str, &'a str),
    Health,
}

impl<'a> Route<'a> {
    fn resolve(method: &Method, path: &'a str) -> Result<Self, GatewayError> {
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        let route = match segments.as_slice() {
            ["check", id1, id2] if !id1.is_empty() && !id2.is_empty() => Route::Check(*id1, *id2),
            ["health"] => Route::Health,
            _ => return Err(GatewayError::NotFound),
        };

        if method != Method::GET {
            return Err(GatewayError::MethodNotAllowed);
        }
        Ok(route)
    }
}

fn decode_segment(raw: &str) -> Result<Cow<'_, str>, GatewayError> {
    percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| GatewayError::InvalidEncoding(raw.to_string()))
}

fn route_name(path: &str) -> &'static str {
    if path == "/health" {
        "health"
    } else if path.starts_with("/check/") {
        "check"
    } else {
        "other"
    }
}

pub struct Gateway {
    aggregator: FanOutAggregator,
    health: HealthAggregator,
    unhealthy_status: StatusCode,
    metrics: Option<Arc<MetricsCollector>>,
}

impl Gateway {
    pub fn new(aggregator: FanOutAggregator, health: HealthAggregator) -> Self {
        Self {
            aggregator,
            health,
            unhealthy_status: StatusCode::SERVICE_UNAVAILABLE,
            metrics: None,
        }
    }

    pub fn with_unhealthy_status(mut self, status: StatusCode) -> Self {
        self.unhealthy_status = status;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Wire the production gateway: one upstream client and one dependency
    /// probe sharing `client`, plus the self check.
    pub fn from_config(
        config: &Config,
        client: reqwest::Client,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Result<Self> {
        let upstream = UpstreamClient::new(client.clone(), config.upstream.base_url.clone());
        let upstream_base = upstream.base_url().clone();
        let mut aggregator = FanOutAggregator::new(Arc::new(upstream), Arc::new(NameFallback))
            .with_branch_deadline(config.upstream.branch_deadline());

        let probe = DependencyProbe::new(client, config.probe.url.clone(), config.probe.timeout());
        info!(
            upstream = %upstream_base,
            probe = %probe.url(),
            probe_timeout_ms = probe.timeout().as_millis() as u64,
            "gateway wired"
        );
        let mut health = HealthAggregator::new()
            .register(config.probe.name.clone(), probe)
            .register(SELF_CHECK, AlwaysHealthy);

        let unhealthy_status = StatusCode::from_u16(config.health.unhealthy_status)
            .context("Invalid health.unhealthy_status")?;

        if let Some(metrics) = &metrics {
            aggregator = aggregator.with_metrics(metrics.clone());
            health = health.with_metrics(metrics.clone());
        }

        let gateway = Gateway::new(aggregator, health).with_unhealthy_status(unhealthy_status);
        Ok(match metrics {
            Some(metrics) => gateway.with_metrics(metrics),
            None => gateway,
        })
    }

    /// Handle one request. Never fails: errors become their HTTP response.
    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        let timer = Timer::new();
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let response = match self.dispatch(&method, &path).await {
            Ok(response) => response,
            Err(err) => {
                if err.status().is_server_error() {
                    error!(%err, %path, "request failed");
                }
                Response::from(err)
            }
        };

        let status = response.status();
        info!(
            %method,
            %path,
            status = status.as_u16(),
            elapsed_ms = timer.elapsed().as_millis() as u64,
            "request complete"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_request(route_name(&path), status.as_u16(), timer.elapsed());
        }
        response
    }

    async fn dispatch(&self, method: &Method, path: &str) -> Result<Response<Body>, GatewayError> {
        match Route::resolve(method, path)? {
            Route::Check(id1, id2) => self.check(id1, id2).await,
            Route::Health => self.health().await,
        }
    }

    async fn check(&self, id1: &str, id2: &str) -> Result<Response<Body>, GatewayError> {
        let branches = vec![
            Branch::parse(CHECK_LABELS[0], &decode_segment(id1)?)?,
            Branch::parse(CHECK_LABELS[1], &decode_segment(id2)?)?,
        ];
        let composite = self.aggregator.aggregate(branches).await?;
        json_response(StatusCode::OK, &composite)
    }

    async fn health(&self) -> Result<Response<Body>, GatewayError> {
        let report = self.health.report().await;
        let status = if report.is_healthy() {
            StatusCode::OK
        } else {
            self.unhealthy_status
        };
        json_response(status, &report)
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Result<Response<Body>, GatewayError> {
    let body = serde_json::to_vec_pretty(body)?;
    Ok(Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body))?)
}

/// Build the process-wide HTTP client. Its timeout is the implicit bound on
/// every upstream call.
pub fn build_http_client(config: &UpstreamConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout())
        .build()
        .context("Failed to create HTTP client")
}
