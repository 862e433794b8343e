//! TigerStyle constants for Roster
//!
//! All limits are explicit, use big-endian naming (most significant first),
//! and include units in the name.

// =============================================================================
// Registry Limits
// =============================================================================

/// Default maximum number of registered clients
pub const CLIENTS_COUNT_MAX_DEFAULT: usize = 1024;

/// Hard upper bound for the configured client capacity
pub const CLIENTS_COUNT_MAX: usize = 1_000_000;

/// Name of the default tenant partition
///
/// Requests that carry no tenant, or this name, are not tenant-scoped.
pub const TENANT_DEFAULT: &str = "default";

/// Default registry backend
pub const BACKEND_DEFAULT: &str = "memory";

// =============================================================================
// Heartbeat / Health Limits
// =============================================================================

/// Default ping interval negotiated with clients in milliseconds (15 sec)
pub const PING_INTERVAL_MS_DEFAULT: u64 = 15 * 1000;

/// Minimum ping interval in milliseconds
pub const PING_INTERVAL_MS_MIN: u64 = 100;

/// Maximum ping interval in milliseconds (1 hour)
pub const PING_INTERVAL_MS_MAX: u64 = 60 * 60 * 1000;

/// Default number of ping intervals of silence before a client is FAILING
pub const CLIENT_FAILING_THRESHOLD_DEFAULT: u32 = 2;

/// Default number of ping intervals of silence before a client is DOWN
pub const CLIENT_DOWN_THRESHOLD_DEFAULT: u32 = 4;

/// Default number of ping intervals of silence before a client is removed
pub const CLIENT_REMOVE_THRESHOLD_DEFAULT: u32 = 8;

/// Default health monitor tick in milliseconds (1 sec)
pub const MONITOR_TICK_MS_DEFAULT: u64 = 1000;

/// Minimum health monitor tick in milliseconds
pub const MONITOR_TICK_MS_MIN: u64 = 10;

// =============================================================================
// Server Limits
// =============================================================================

/// Default HTTP bind address
pub const BIND_ADDRESS_DEFAULT: &str = "0.0.0.0:8080";

/// Default sustained request rate (requests per second)
pub const REQUEST_RATE_PER_SEC_DEFAULT: u32 = 10;

/// Default request burst size
pub const REQUEST_BURST_COUNT_DEFAULT: u32 = 20;

/// Minimum length of the token signing secret in bytes
pub const SECRET_KEY_LENGTH_BYTES_MIN: usize = 32;

/// Default token lifetime in milliseconds (30 min)
pub const TOKEN_TTL_MS_DEFAULT: u64 = 30 * 60 * 1000;

// =============================================================================
// Observability - Metric Names
// =============================================================================

/// Metric: Registered clients (gauge, labels: tenant, state)
pub const METRIC_NAME_CLIENTS_COUNT: &str = "roster_clients_count";

/// Metric: Known tenants (gauge)
pub const METRIC_NAME_TENANTS_COUNT: &str = "roster_tenants_count";

/// Metric: Handled HTTP requests (counter)
pub const METRIC_NAME_HTTP_REQUESTS_TOTAL: &str = "roster_http_requests_total";

/// Metric: Requests rejected by the rate limiter (counter)
pub const METRIC_NAME_HTTP_RATE_LIMITED_TOTAL: &str = "roster_http_rate_limited_total";

/// Metric: HTTP request latency (histogram, labels: method, path)
pub const METRIC_NAME_HTTP_REQUEST_DURATION_SECONDS: &str = "roster_http_request_duration_seconds";

/// Upper bounds of the HTTP latency histogram buckets, in seconds
pub const HTTP_DURATION_BUCKETS_SECONDS: [f64; 11] =
    [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Metric: Server uptime in seconds (gauge)
pub const METRIC_NAME_SERVER_UPTIME_SECONDS: &str = "roster_server_uptime_seconds";

// Compile-time assertions for constant validity
const _: () = {
    assert!(CLIENT_FAILING_THRESHOLD_DEFAULT < CLIENT_DOWN_THRESHOLD_DEFAULT);
    assert!(CLIENT_DOWN_THRESHOLD_DEFAULT < CLIENT_REMOVE_THRESHOLD_DEFAULT);
    assert!(PING_INTERVAL_MS_MIN < PING_INTERVAL_MS_DEFAULT);
    assert!(PING_INTERVAL_MS_DEFAULT < PING_INTERVAL_MS_MAX);
    assert!(CLIENTS_COUNT_MAX_DEFAULT <= CLIENTS_COUNT_MAX);
    assert!(MONITOR_TICK_MS_MIN <= MONITOR_TICK_MS_DEFAULT);
};
