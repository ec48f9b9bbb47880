// src/health/probe.rs
use super::ProbeOutcome;
use reqwest::Client;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};
use url::Url;

/// Bounded liveness check against one dependency.
///
/// The deadline is measured from the start of `probe` and is independent of
/// the client's own request timeout. On expiry the in-flight request task is
/// aborted and detached; whether the underlying connection stops immediately
/// is up to the client.
#[derive(Clone)]
pub struct DependencyProbe {
    client: Client,
    url: Url,
    timeout: Duration,
}

impl DependencyProbe {
    pub fn new(client: Client, url: Url, timeout: Duration) -> Self {
        Self {
            client,
            url,
            timeout,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn probe(&self) -> ProbeOutcome {
        let start = Instant::now();
        let request = self.client.get(self.url.clone()).send();

        let mut handle = tokio::spawn(async move {
            let response = request.await?;
            Ok::<_, reqwest::Error>(response.status())
        });

        let outcome = match timeout(self.timeout, &mut handle).await {
            Ok(Ok(Ok(status))) if status.is_success() => ProbeOutcome::Ok,
            Ok(Ok(Ok(status))) => ProbeOutcome::Failed(format!("HTTP {}", status)),
            Ok(Ok(Err(e))) => ProbeOutcome::Failed(e.to_string()),
            Ok(Err(e)) => ProbeOutcome::Failed(format!("probe task failed: {}", e)),
            Err(_) => {
                handle.abort();
                ProbeOutcome::TimedOut
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &outcome {
            ProbeOutcome::Ok => debug!(url = %self.url, elapsed_ms, "probe succeeded"),
            ProbeOutcome::Failed(cause) => {
                warn!(url = %self.url, elapsed_ms, %cause, "probe failed")
            }
            ProbeOutcome::TimedOut => warn!(
                url = %self.url,
                timeout_ms = self.timeout.as_millis() as u64,
                "probe timed out"
            ),
        }

        outcome
    }
}
