//! Server state management
//!
//! TigerStyle: Shared state is immutable after startup, counters are atomic.

use crate::security::{RequestLimiter, TenantResolver};
use roster_core::config::ServerConfig;
use roster_core::constants::HTTP_DURATION_BUCKETS_SECONDS;
use roster_registry::Registry;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Latency histogram of one route
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteLatency {
    /// Cumulative counts, one per bound in `HTTP_DURATION_BUCKETS_SECONDS`
    pub buckets: [u64; HTTP_DURATION_BUCKETS_SECONDS.len()],
    pub count: u64,
    pub sum_seconds: f64,
}

impl RouteLatency {
    fn observe(&mut self, elapsed: Duration) {
        let seconds = elapsed.as_secs_f64();
        for (bucket, bound) in self.buckets.iter_mut().zip(HTTP_DURATION_BUCKETS_SECONDS) {
            if seconds <= bound {
                *bucket += 1;
            }
        }
        self.count += 1;
        self.sum_seconds += seconds;
    }
}

/// HTTP request counters exported on /metrics
#[derive(Debug, Default)]
pub struct HttpMetrics {
    requests_total: AtomicU64,
    rate_limited_total: AtomicU64,
    /// Keyed by (method, matched route)
    latency: Mutex<BTreeMap<(String, String), RouteLatency>>,
}

impl HttpMetrics {
    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limited(&self) {
        self.rate_limited_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn rate_limited_total(&self) -> u64 {
        self.rate_limited_total.load(Ordering::Relaxed)
    }

    /// Record how long a request to `path` took
    pub fn observe_latency(&self, method: &str, path: &str, elapsed: Duration) {
        let mut latency = self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        latency
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .observe(elapsed);
    }

    /// Snapshot of the per-route histograms, sorted by method then path
    pub fn route_latencies(&self) -> Vec<((String, String), RouteLatency)> {
        let latency = self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        latency
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Server-wide shared state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    registry: Arc<dyn Registry>,
    tenants: TenantResolver,
    limiter: RequestLimiter,
    metrics: HttpMetrics,
    /// Server start time for uptime calculation
    start_time: Instant,
}

impl AppState {
    /// Create server state
    pub fn new(registry: Arc<dyn Registry>, tenants: TenantResolver, limiter: RequestLimiter) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                registry,
                tenants,
                limiter,
                metrics: HttpMetrics::default(),
                start_time: Instant::now(),
            }),
        }
    }

    /// Create server state from the server section of the configuration
    pub fn from_config(registry: Arc<dyn Registry>, config: &ServerConfig) -> anyhow::Result<Self> {
        let tenants = TenantResolver::from_config(config)?;
        let limiter = RequestLimiter::new(config.limit_rate, config.limit_burst)?;
        Ok(Self::new(registry, tenants, limiter))
    }

    pub fn registry(&self) -> &Arc<dyn Registry> {
        &self.inner.registry
    }

    pub fn tenants(&self) -> &TenantResolver {
        &self.inner.tenants
    }

    pub fn limiter(&self) -> &RequestLimiter {
        &self.inner.limiter
    }

    pub fn metrics(&self) -> &HttpMetrics {
        &self.inner.metrics
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.inner.start_time.elapsed().as_secs()
    }
}
