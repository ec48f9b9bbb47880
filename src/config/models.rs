// src/config/models.rs
use anyhow::{bail, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub probe: ProbeConfig,
    pub health: HealthConfig,
    pub metrics: MetricsConfig,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.upstream.timeout_ms == 0 {
            bail!("upstream.timeout_ms must be greater than zero");
        }
        if let Some(deadline) = self.upstream.branch_deadline_ms {
            if deadline == 0 {
                bail!("upstream.branch_deadline_ms must be greater than zero when set");
            }
        }
        if self.upstream.base_url.cannot_be_a_base() {
            bail!("upstream.base_url '{}' cannot be used as a base URL", self.upstream.base_url);
        }
        if self.probe.timeout_ms == 0 {
            bail!("probe.timeout_ms must be greater than zero");
        }
        if self.probe.name.trim().is_empty() {
            bail!("probe.name must not be empty");
        }
        if !(400..=599).contains(&self.health.unhealthy_status) {
            bail!(
                "health.unhealthy_status must be an error status (400-599), got {}",
                self.health.unhealthy_status
            );
        }
        if self.metrics.enabled && !self.metrics.path.starts_with('/') {
            bail!("metrics.path must start with '/'");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: ([0, 0, 0, 0], 8081).into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: Url,
    /// Timeout applied by the shared HTTP client to every outbound call.
    pub timeout_ms: u64,
    /// Per-branch deadline inside one aggregation. Unset means wait for the
    /// slowest branch.
    pub branch_deadline_ms: Option<u64>,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn branch_deadline(&self) -> Option<Duration> {
        self.branch_deadline_ms.map(Duration::from_millis)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://localhost:8080/").expect("static URL is valid"),
            timeout_ms: 5_000,
            branch_deadline_ms: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub name: String,
    pub url: Url,
    pub timeout_ms: u64,
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            name: "producerAvailability".to_string(),
            url: Url::parse("http://localhost:8080/test").expect("static URL is valid"),
            timeout_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Status code returned by `/health` when any check is down.
    pub unhealthy_status: u16,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            unhealthy_status: 503,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 9091,
            path: "/metrics".to_string(),
        }
    }
}
