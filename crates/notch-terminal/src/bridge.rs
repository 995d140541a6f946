//! Readiness probing for the HTTP bridge backend.
//!
//! The bridge program needs a moment to bind its port. After a grace
//! period the probe issues plain GET requests until one is answered, the
//! attempt cap is hit, or the session cancels it.

use std::time::Duration;

use notch_config::schema::BridgeConfig;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::TerminalError;

/// Timeout for a single readiness request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Timing and retry limits for the readiness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgePolicy {
    pub grace_period: Duration,
    pub retry_interval: Duration,
    pub max_attempts: u32,
}

impl Default for BridgePolicy {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_millis(1000),
            retry_interval: Duration::from_millis(2000),
            max_attempts: 30,
        }
    }
}

impl BridgePolicy {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            grace_period: Duration::from_millis(u64::from(config.grace_period_ms)),
            retry_interval: Duration::from_millis(u64::from(config.retry_interval_ms)),
            max_attempts: config.max_attempts.max(1),
        }
    }
}

/// URL the panel's browser view loads.
pub fn bridge_url(port: u16) -> String {
    format!("http://127.0.0.1:{port}/")
}

/// How probing ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Some HTTP response came back. Any status counts.
    Reachable { attempts: u32, status: u16 },
    Exhausted { attempts: u32, last_error: String },
    Cancelled,
}

/// Probe `url` until it answers, following `policy`.
///
/// Returns [`ProbeOutcome::Cancelled`] as soon as `shutdown_rx` yields or
/// its sender is dropped.
pub async fn wait_until_reachable(
    client: &reqwest::Client,
    url: &str,
    policy: BridgePolicy,
    shutdown_rx: &mut mpsc::Receiver<()>,
) -> ProbeOutcome {
    tokio::select! {
        _ = tokio::time::sleep(policy.grace_period) => {}
        _ = shutdown_rx.recv() => return ProbeOutcome::Cancelled,
    }

    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        let request = client.get(url).send();
        let result = tokio::select! {
            result = request => result,
            _ = shutdown_rx.recv() => return ProbeOutcome::Cancelled,
        };

        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                tracing::info!(url = %url, attempts = attempt, status, "terminal bridge reachable");
                return ProbeOutcome::Reachable {
                    attempts: attempt,
                    status,
                };
            }
            Err(e) => {
                tracing::debug!(url = %url, attempt, error = %e, "terminal bridge not ready");
                last_error = e.to_string();
            }
        }

        if attempt < max_attempts {
            tokio::select! {
                _ = tokio::time::sleep(policy.retry_interval) => {}
                _ = shutdown_rx.recv() => return ProbeOutcome::Cancelled,
            }
        }
    }

    tracing::warn!(url = %url, attempts = max_attempts, error = %last_error, "terminal bridge unreachable");
    ProbeOutcome::Exhausted {
        attempts: max_attempts,
        last_error,
    }
}

/// A probe running on a tokio runtime. Dropping it cancels the probe.
#[derive(Debug)]
pub struct BridgeProbe {
    url: String,
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl BridgeProbe {
    /// Start probing `url` on `runtime`; `on_outcome` runs once at the end,
    /// including after cancellation.
    pub fn spawn<F>(
        runtime: &Handle,
        url: String,
        policy: BridgePolicy,
        on_outcome: F,
    ) -> Result<Self, TerminalError>
    where
        F: FnOnce(ProbeOutcome) + Send + 'static,
    {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .no_proxy()
            .build()
            .map_err(|e| TerminalError::Http(e.to_string()))?;

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let task_url = url.clone();
        let task = runtime.spawn(async move {
            let outcome = wait_until_reachable(&client, &task_url, policy, &mut shutdown_rx).await;
            on_outcome(outcome);
        });

        Ok(Self {
            url,
            shutdown_tx,
            task,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn cancel(&self) {
        let _ = self.shutdown_tx.try_send(());
    }
}

impl Drop for BridgeProbe {
    fn drop(&mut self) {
        self.cancel();
    }
}
