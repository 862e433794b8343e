//! Client registration endpoints
//!
//! TigerStyle: Every handler runs inside the tenant resolved by the auth
//! middleware.

use super::ApiError;
use crate::models::{ClientIdQuery, LeaveResponse, ListQuery};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use roster_registry::{Client, ClientId, JoinRequest, JoinResponse, Pong, TenantScope};
use tracing::instrument;

/// Routes mounted under /api
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/join", post(join))
        .route("/leave", post(leave))
        .route("/ping", post(ping))
        .route("/list", get(list))
}

fn client_id(query: ClientIdQuery) -> Result<ClientId, ApiError> {
    let id = query.id.trim();
    if id.is_empty() {
        return Err(ApiError::bad_request("missing client id"));
    }
    Ok(ClientId::new(id))
}

/// Register a client
///
/// POST /api/join
#[instrument(skip(state, body), fields(tenant = %scope), level = "info")]
async fn join(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    body: Result<Json<JoinRequest>, JsonRejection>,
) -> Result<Json<JoinResponse>, ApiError> {
    let Json(mut request) = body.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    request.service = request.service.trim().to_uppercase();
    if request.service.is_empty() {
        return Err(ApiError::bad_request("service must not be empty"));
    }

    let response = state.registry().join(&scope, request).await?;
    Ok(Json(response))
}

/// Deregister a client
///
/// POST /api/leave?id=<client id>
#[instrument(skip(state, query), fields(tenant = %scope), level = "info")]
async fn leave(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Query(query): Query<ClientIdQuery>,
) -> Result<Json<LeaveResponse>, ApiError> {
    let id = client_id(query)?;
    state.registry().leave(&scope, &id).await?;
    Ok(Json(LeaveResponse {
        left: id.to_string(),
    }))
}

/// Liveness signal
///
/// POST /api/ping?id=<client id>
#[instrument(skip(state, query), level = "debug")]
async fn ping(
    State(state): State<AppState>,
    Query(query): Query<ClientIdQuery>,
) -> Result<Json<Pong>, ApiError> {
    let id = client_id(query)?;
    let pong = state.registry().ping(&id).await?;
    Ok(Json(pong))
}

/// List the tenant's clients, optionally restricted to one service
///
/// GET /api/list[?service=<service id>]
#[instrument(skip(state, query), fields(tenant = %scope), level = "debug")]
async fn list(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Client>>, ApiError> {
    let mut clients = state.registry().list(&scope).await?;

    if let Some(service) = query.service.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let service = service.to_uppercase();
        clients.retain(|client| client.service_id() == service);
    }

    Ok(Json(clients))
}
