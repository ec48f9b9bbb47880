// src/health/status.rs
use serde::ser::{Serialize, SerializeMap, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum HealthStatus {
    #[serde(rename = "UP")]
    Healthy,
    #[serde(rename = "DOWN")]
    Unhealthy,
}

/// Result of a single bounded health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Ok,
    Failed(String),
    TimedOut,
}

impl ProbeOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ProbeOutcome::Ok)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProbeOutcome::Ok => "ok",
            ProbeOutcome::Failed(_) => "failed",
            ProbeOutcome::TimedOut => "timed_out",
        }
    }
}

impl From<&ProbeOutcome> for HealthStatus {
    fn from(outcome: &ProbeOutcome) -> Self {
        if outcome.is_ok() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }
}

/// Check name to status, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthReport {
    entries: Vec<(String, HealthStatus)>,
}

impl HealthReport {
    pub fn new(entries: Vec<(String, HealthStatus)>) -> Self {
        Self { entries }
    }

    /// True iff every check is healthy.
    pub fn is_healthy(&self) -> bool {
        self.entries
            .iter()
            .all(|(_, status)| *status == HealthStatus::Healthy)
    }

    pub fn get(&self, name: &str) -> Option<HealthStatus> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, status)| *status)
    }

    pub fn entries(&self) -> &[(String, HealthStatus)] {
        &self.entries
    }
}

impl Serialize for HealthReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, status) in &self.entries {
            map.serialize_entry(name, status)?;
        }
        map.end()
    }
}
