//! REST API module
//!
//! TigerStyle: Tenant-scoped discovery API plus unauthenticated health and
//! metrics endpoints.

pub mod clients;

use crate::models::{ErrorResponse, HealthResponse};
use crate::security::auth::require_tenant;
use crate::security::rate_limit::rate_limit;
use crate::state::AppState;
use axum::{
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use roster_core::constants::{
    HTTP_DURATION_BUCKETS_SECONDS, METRIC_NAME_CLIENTS_COUNT, METRIC_NAME_HTTP_RATE_LIMITED_TOTAL,
    METRIC_NAME_HTTP_REQUESTS_TOTAL, METRIC_NAME_HTTP_REQUEST_DURATION_SECONDS,
    METRIC_NAME_SERVER_UPTIME_SECONDS, METRIC_NAME_TENANTS_COUNT,
};
use roster_registry::{ClientState, RegistryError};
use std::fmt::Write as _;
use std::time::Instant;
use tower_http::trace::TraceLayer;

/// Client states exported per tenant
const METRIC_CLIENT_STATES: [ClientState; 4] = [
    ClientState::Starting,
    ClientState::Up,
    ClientState::Failing,
    ClientState::Down,
];

/// Create the API router with all routes
pub fn router(state: AppState) -> Router {
    let api = clients::router().route_layer(middleware::from_fn_with_state(
        state.clone(),
        require_tenant,
    ));

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Metrics endpoint (Prometheus)
        .route("/metrics", get(metrics))
        .nest("/api", api)
        // Matched routes only, so unknown paths do not grow the label set
        .route_layer(middleware::from_fn_with_state(state.clone(), track_latency))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// Time each routed request, labelled by method and route template
async fn track_latency(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let start = Instant::now();
    let response = next.run(request).await;
    state
        .metrics()
        .observe_latency(&method, &path, start.elapsed());
    response
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Prometheus metrics endpoint
///
/// Returns metrics in Prometheus text format.
async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let tenants = state.registry().list_all().await?;
    let http = state.metrics();

    let mut text = String::new();
    let _ = writeln!(text, "# HELP {METRIC_NAME_CLIENTS_COUNT} Registered clients by tenant and state");
    let _ = writeln!(text, "# TYPE {METRIC_NAME_CLIENTS_COUNT} gauge");
    for tenant in &tenants {
        let name = escape_label(&tenant.name);
        for client_state in METRIC_CLIENT_STATES {
            let count = tenant
                .clients
                .iter()
                .filter(|c| c.state() == client_state)
                .count();
            let _ = writeln!(
                text,
                "{METRIC_NAME_CLIENTS_COUNT}{{tenant=\"{name}\",state=\"{client_state}\"}} {count}"
            );
        }
    }

    let _ = write!(
        text,
        "\n# HELP {tenants_metric} Known tenants\n\
         # TYPE {tenants_metric} gauge\n\
         {tenants_metric} {tenants_count}\n\
         \n\
         # HELP {requests_metric} HTTP requests received\n\
         # TYPE {requests_metric} counter\n\
         {requests_metric} {requests}\n\
         \n\
         # HELP {limited_metric} HTTP requests rejected by the rate limiter\n\
         # TYPE {limited_metric} counter\n\
         {limited_metric} {limited}\n\
         \n\
         # HELP {uptime_metric} Server uptime in seconds\n\
         # TYPE {uptime_metric} gauge\n\
         {uptime_metric} {uptime}\n",
        tenants_metric = METRIC_NAME_TENANTS_COUNT,
        tenants_count = tenants.len(),
        requests_metric = METRIC_NAME_HTTP_REQUESTS_TOTAL,
        requests = http.requests_total(),
        limited_metric = METRIC_NAME_HTTP_RATE_LIMITED_TOTAL,
        limited = http.rate_limited_total(),
        uptime_metric = METRIC_NAME_SERVER_UPTIME_SECONDS,
        uptime = state.uptime_seconds(),
    );

    let name = METRIC_NAME_HTTP_REQUEST_DURATION_SECONDS;
    let _ = writeln!(text, "\n# HELP {name} HTTP request latency by route");
    let _ = writeln!(text, "# TYPE {name} histogram");
    for ((method, path), latency) in http.route_latencies() {
        let labels = format!("method=\"{}\",path=\"{}\"", escape_label(&method), escape_label(&path));
        for (bound, count) in HTTP_DURATION_BUCKETS_SECONDS.iter().zip(latency.buckets) {
            let _ = writeln!(text, "{name}_bucket{{{labels},le=\"{bound}\"}} {count}");
        }
        let _ = writeln!(text, "{name}_bucket{{{labels},le=\"+Inf\"}} {}", latency.count);
        let _ = writeln!(text, "{name}_sum{{{labels}}} {}", latency.sum_seconds);
        let _ = writeln!(text, "{name}_count{{{labels}}} {}", latency.count);
    }

    Ok((
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        text,
    )
        .into_response())
}

/// API error type that converts to HTTP responses
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse::bad_request(message),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        let status = match &err {
            RegistryError::ClientNotFound { .. } | RegistryError::TenantNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            RegistryError::AlreadyRegistered { .. } => StatusCode::CONFLICT,
            RegistryError::MaxClientsReached { .. } => StatusCode::SERVICE_UNAVAILABLE,
            RegistryError::InvalidEndpoint { .. } => StatusCode::BAD_REQUEST,
            RegistryError::InvalidConfiguration { .. }
            | RegistryError::UnknownBackend { .. }
            | RegistryError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            body: ErrorResponse::new(err.code(), err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_status_mapping() {
        let cases = [
            (RegistryError::client_not_found("x"), StatusCode::NOT_FOUND),
            (RegistryError::tenant_not_found("t"), StatusCode::NOT_FOUND),
            (
                RegistryError::AlreadyRegistered {
                    service_id: "S".into(),
                    tenant: "t".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                RegistryError::MaxClientsReached { max_clients: 1 },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                RegistryError::invalid_endpoint("ftp://x", "bad"),
                StatusCode::BAD_REQUEST,
            ),
            (
                RegistryError::Internal {
                    message: "boom".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            let code = err.code();
            let api = ApiError::from(err);
            assert_eq!(api.status(), status);
            assert_eq!(api.body.code, code);
        }
    }

    #[test]
    fn test_escape_label() {
        assert_eq!(escape_label(r#"a"b\c"#), r#"a\"b\\c"#);
    }
}
