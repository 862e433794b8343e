//! End-to-end tests of the HTTP surface, driven in-process with `oneshot`

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::Engine;
use roster_core::config::{RegistryConfig, UserCredentials};
use roster_core::io::{IoContext, ManualClock, StdRngProvider};
use roster_registry::{MemoryRegistry, Registry};
use roster_server::security::{RequestLimiter, TenantResolver, TokenIssuer};
use roster_server::{router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const SECRET: &str = "0123456789abcdef0123456789abcdef";

fn app_with(registry: Arc<dyn Registry>, rate: u32, burst: u32) -> Router {
    let users = [
        UserCredentials::new("acme", "acme-pass"),
        UserCredentials::new("globex", "globex-pass"),
    ];
    let tenants = TenantResolver::new(Some(SECRET), &users).unwrap();
    let limiter = RequestLimiter::new(rate, burst).unwrap();
    router(AppState::new(registry, tenants, limiter))
}

fn test_app() -> Router {
    app_with(Arc::new(MemoryRegistry::new()), 1000, 1000)
}

fn basic(login: &str, password: &str) -> String {
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", login, password));
    format!("Basic {}", encoded)
}

fn bearer(tenant: &str) -> String {
    let token = TokenIssuer::new(SECRET, IoContext::production())
        .unwrap()
        .generate("tests", tenant, Duration::from_secs(600))
        .unwrap();
    format!("Bearer {}", token)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn join(app: &Router, auth: &str, body: Value) -> String {
    let (status, value) = send(app, "POST", "/api/join", Some(auth), Some(body)).await;
    assert_eq!(status, StatusCode::OK, "join failed: {}", value);
    value["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_needs_no_credentials() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_metrics_report_clients_per_tenant() {
    let app = test_app();
    let acme = basic("acme", "acme-pass");
    join(&app, &acme, json!({"service": "billing"})).await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; version=0.0.4; charset=utf-8"
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains(r#"roster_clients_count{tenant="acme",state="STARTING"} 1"#));
    assert!(text.contains("roster_tenants_count 1"));
    assert!(text.contains("# TYPE roster_http_requests_total counter"));
}

#[tokio::test]
async fn test_metrics_report_latency_per_route() {
    let app = test_app();
    let acme = basic("acme", "acme-pass");
    join(&app, &acme, json!({"service": "billing"})).await;
    send(&app, "GET", "/api/list", Some(&acme), None).await;
    send(&app, "GET", "/api/list", None, None).await;
    let (status, _) = send(&app, "GET", "/no-such-route", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(text.contains("# TYPE roster_http_request_duration_seconds histogram"));
    assert!(text.contains(
        r#"roster_http_request_duration_seconds_count{method="POST",path="/api/join"} 1"#
    ));
    // Rejected requests are timed too
    assert!(text.contains(
        r#"roster_http_request_duration_seconds_count{method="GET",path="/api/list"} 2"#
    ));
    assert!(text.contains(
        r#"roster_http_request_duration_seconds_bucket{method="GET",path="/api/list",le="+Inf"} 2"#
    ));
    assert!(!text.contains("/no-such-route"));
}

#[tokio::test]
async fn test_api_requires_credentials() {
    let app = test_app();

    let (status, body) = send(&app, "GET", "/api/list", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");
    assert_eq!(body["message"], "missing Authorization header");

    let (status, _) = send(&app, "GET", "/api/list", Some(&basic("acme", "wrong")), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/list", Some("Bearer not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_basic_disabled_without_users() {
    let tenants = TenantResolver::new(Some(SECRET), &[]).unwrap();
    let limiter = RequestLimiter::new(100, 100).unwrap();
    let app = router(AppState::new(
        Arc::new(MemoryRegistry::new()),
        tenants,
        limiter,
    ));

    let (status, body) = send(&app, "GET", "/api/list", Some(&basic("acme", "x")), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "basic authorization is not enabled");
}

#[tokio::test]
async fn test_expired_bearer_rejected() {
    // Clock pinned far in the past, so the token is long expired
    let io = IoContext::new(
        Arc::new(ManualClock::new(1_000_000)),
        Arc::new(StdRngProvider::with_seed(7)),
    );
    let token = TokenIssuer::new(SECRET, io)
        .unwrap()
        .generate("tests", "acme", Duration::from_secs(60))
        .unwrap();

    let app = test_app();
    let (status, body) = send(
        &app,
        "GET",
        "/api/list",
        Some(&format!("Bearer {}", token)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "auth token expired");
}

#[tokio::test]
async fn test_join_ping_list_leave_flow() {
    let app = test_app();
    let acme = basic("acme", "acme-pass");

    let id = join(
        &app,
        &acme,
        json!({
            "service": "billing",
            "endpoints": ["http://10.0.0.1:8080", "grpc://10.0.0.1:9090"],
            "meta": {"zone": "eu-1"}
        }),
    )
    .await;

    let (status, clients) = send(&app, "GET", "/api/list", Some(&acme), None).await;
    assert_eq!(status, StatusCode::OK);
    let clients = clients.as_array().unwrap();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0]["client_id"], id.as_str());
    assert_eq!(clients[0]["service_id"], "BILLING");
    assert_eq!(clients[0]["tenant"], "acme");
    assert_eq!(clients[0]["state"], "STARTING");
    assert_eq!(clients[0]["endpoints"][1]["type"], "GRPC");
    assert_eq!(clients[0]["meta"]["zone"], "eu-1");

    // First ping brings the client UP, which changes the tenant
    let uri = format!("/api/ping?id={}", id);
    let (status, pong) = send(&app, "POST", &uri, Some(&acme), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pong["response"], "CHANGED");

    let (_, pong) = send(&app, "POST", &uri, Some(&acme), None).await;
    assert_eq!(pong["response"], "OK");

    let (_, clients) = send(&app, "GET", "/api/list", Some(&acme), None).await;
    assert_eq!(clients[0]["state"], "UP");

    let (status, left) = send(&app, "POST", &format!("/api/leave?id={}", id), Some(&acme), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(left, json!({"left": id}));

    let (status, body) = send(&app, "POST", &uri, Some(&acme), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "client_not_found");
}

#[tokio::test]
async fn test_join_response_carries_interval() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/join",
        Some(&basic("acme", "acme-pass")),
        Some(json!({"service": "search"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["interval"], "15s");
    assert!(!body["id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_is_tenant_scoped_and_leave_is_not() {
    let app = test_app();
    let acme = basic("acme", "acme-pass");
    let globex = basic("globex", "globex-pass");

    let acme_id = join(&app, &acme, json!({"service": "billing"})).await;
    join(&app, &globex, json!({"service": "billing"})).await;

    let (_, clients) = send(&app, "GET", "/api/list", Some(&acme), None).await;
    assert_eq!(clients.as_array().unwrap().len(), 1);
    assert_eq!(clients[0]["client_id"], acme_id.as_str());

    // Leave goes by client id alone and empties acme
    let (status, left) = send(
        &app,
        "POST",
        &format!("/api/leave?id={}", acme_id),
        Some(&globex),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(left, json!({"left": acme_id}));

    let (_, clients) = send(&app, "GET", "/api/list", Some(&acme), None).await;
    assert!(clients.as_array().unwrap().is_empty());
    let (_, clients) = send(&app, "GET", "/api/list", Some(&globex), None).await;
    assert_eq!(clients.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_bearer_tenant_resolution() {
    let app = test_app();

    join(&app, &bearer("acme"), json!({"service": "billing"})).await;
    join(&app, &basic("globex", "globex-pass"), json!({"service": "billing"})).await;

    // A bearer token for acme sees the same tenant as Basic acme
    let (_, clients) = send(&app, "GET", "/api/list", Some(&basic("acme", "acme-pass")), None).await;
    assert_eq!(clients.as_array().unwrap().len(), 1);

    // An empty tenant claim is the default scope, which sees every client
    let (status, clients) = send(&app, "GET", "/api/list", Some(&bearer("")), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(clients.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_list_filters_by_service() {
    let app = test_app();
    let acme = basic("acme", "acme-pass");

    join(&app, &acme, json!({"service": "billing"})).await;
    join(&app, &acme, json!({"service": "search"})).await;

    let (status, clients) = send(&app, "GET", "/api/list?service=Search", Some(&acme), None).await;
    assert_eq!(status, StatusCode::OK);
    let clients = clients.as_array().unwrap();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0]["service_id"], "SEARCH");
}

#[tokio::test]
async fn test_join_errors_map_to_status() {
    let config = RegistryConfig {
        max_clients: 2,
        ..RegistryConfig::default()
    };
    let registry = MemoryRegistry::with_config(&config, IoContext::production()).unwrap();
    let app = app_with(Arc::new(registry), 1000, 1000);
    let acme = basic("acme", "acme-pass");

    let (status, body) = send(
        &app,
        "POST",
        "/api/join",
        Some(&acme),
        Some(json!({"service": "billing", "endpoints": ["ftp://10.0.0.1"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_endpoint");

    let (status, _) = send(&app, "POST", "/api/join", Some(&acme), Some(json!({"nope": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    join(&app, &acme, json!({"service": "billing"})).await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/join",
        Some(&acme),
        Some(json!({"service": "BILLING"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "already_registered");

    join(&app, &acme, json!({"service": "search"})).await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/join",
        Some(&acme),
        Some(json!({"service": "cache"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "max_clients_reached");
}

#[tokio::test]
async fn test_leave_requires_id() {
    let app = test_app();
    let (status, body) = send(&app, "POST", "/api/leave", Some(&basic("acme", "acme-pass")), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn test_rate_limit_rejects_excess_requests() {
    let app = app_with(Arc::new(MemoryRegistry::new()), 1, 1);

    let (status, _) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "rate_limited");
}
