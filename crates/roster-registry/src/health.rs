//! Health thresholds and the background health monitor
//!
//! TigerStyle: Explicit thresholds, ordered checks, observable transitions.
//!
//! A client's silence is `now - last_seen`. The checks run most severe first:
//! past `remove × interval` the client is evicted, past `down × interval` it
//! is `DOWN`, past `failing × interval` it is `FAILING`. Only a change of
//! state counts as a transition.

use crate::client::ClientState;
use crate::error::{RegistryError, RegistryResult};
use crate::registry::Registry;
use roster_core::config::RegistryConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Ping interval and the silence multipliers derived from it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthThresholds {
    pub interval_ms: u64,
    pub failing: u32,
    pub down: u32,
    pub remove: u32,
}

impl HealthThresholds {
    /// Create thresholds, requiring `0 < failing < down < remove`
    pub fn new(interval_ms: u64, failing: u32, down: u32, remove: u32) -> RegistryResult<Self> {
        if interval_ms == 0 {
            return Err(invalid("registry.ping_interval_ms", "must be positive"));
        }
        if failing == 0 {
            return Err(invalid("registry.failing_threshold", "must be positive"));
        }
        if down <= failing {
            return Err(invalid(
                "registry.down_threshold",
                "must be greater than failing_threshold",
            ));
        }
        if remove <= down {
            return Err(invalid(
                "registry.remove_threshold",
                "must be greater than down_threshold",
            ));
        }
        Ok(Self {
            interval_ms,
            failing,
            down,
            remove,
        })
    }

    /// Thresholds from a validated registry configuration
    pub fn from_config(config: &RegistryConfig) -> RegistryResult<Self> {
        Self::new(
            config.ping_interval_ms,
            config.failing_threshold,
            config.down_threshold,
            config.remove_threshold,
        )
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn failing_ms(&self) -> u64 {
        self.interval_ms.saturating_mul(u64::from(self.failing))
    }

    pub fn down_ms(&self) -> u64 {
        self.interval_ms.saturating_mul(u64::from(self.down))
    }

    pub fn remove_ms(&self) -> u64 {
        self.interval_ms.saturating_mul(u64::from(self.remove))
    }

    /// State implied by `elapsed_ms` of silence, if any threshold is crossed
    pub fn classify(&self, elapsed_ms: u64) -> Option<ClientState> {
        if elapsed_ms > self.remove_ms() {
            Some(ClientState::Removed)
        } else if elapsed_ms > self.down_ms() {
            Some(ClientState::Down)
        } else if elapsed_ms > self.failing_ms() {
            Some(ClientState::Failing)
        } else {
            None
        }
    }

    /// New state for a client, only if it differs from `current`
    pub fn check(&self, current: ClientState, elapsed_ms: u64) -> Option<ClientState> {
        self.classify(elapsed_ms).filter(|next| *next != current)
    }
}

fn invalid(field: &str, reason: &str) -> RegistryError {
    RegistryError::InvalidConfiguration {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Handle to the background sweep task
///
/// Call [`stop`](HealthMonitor::stop) for a graceful shutdown. Dropping the
/// handle aborts the task.
pub struct HealthMonitor {
    shutdown: Arc<Notify>,
    shutdown_requested: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl HealthMonitor {
    /// Spawn a task sweeping `registry` once per `tick`
    pub fn start(registry: Arc<dyn Registry>, tick: Duration) -> Self {
        let shutdown = Arc::new(Notify::new());
        let shutdown_requested = Arc::new(AtomicBool::new(false));

        let task = {
            let shutdown = shutdown.clone();
            let shutdown_requested = shutdown_requested.clone();
            tokio::spawn(async move {
                debug!(tick_ms = tick.as_millis() as u64, "health monitor started");
                loop {
                    if shutdown_requested.load(Ordering::SeqCst) {
                        break;
                    }
                    tokio::select! {
                        _ = tokio::time::sleep(tick) => {
                            match registry.sweep().await {
                                Ok(report) if !report.is_empty() => debug!(
                                    failing = report.failing.len(),
                                    down = report.down.len(),
                                    removed = report.removed.len(),
                                    "health sweep applied transitions"
                                ),
                                Ok(_) => {}
                                Err(e) => warn!(error = %e, "health sweep failed"),
                            }
                        }
                        _ = shutdown.notified() => break,
                    }
                }
                debug!("health monitor stopped");
            })
        };

        Self {
            shutdown,
            shutdown_requested,
            task: Some(task),
        }
    }

    /// Signal the task and wait for it to finish
    pub async fn stop(mut self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
        self.shutdown.notify_one();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if e.is_panic() {
                    warn!(error = %e, "health monitor task panicked");
                }
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
