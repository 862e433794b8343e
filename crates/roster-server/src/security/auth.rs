//! Tenant resolution from request credentials
//!
//! TigerStyle: Every /api/* request carries credentials, and those
//! credentials name the tenant.
//!
//! Two schemes are accepted in the `Authorization` header:
//! - `Bearer <jwt>`: HS256 token signed with the server secret. The
//!   `tenant` claim names the tenant; an empty claim is the default scope.
//! - `Basic <base64(login:password)>`: checked against the configured users.
//!   The login names the tenant.
//!
//! Endpoints that don't require authentication:
//! - /health
//! - /metrics

use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::Engine;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use roster_core::config::{ServerConfig, UserCredentials};
use roster_core::constants::{SECRET_KEY_LENGTH_BYTES_MIN, TOKEN_TTL_MS_DEFAULT};
use roster_core::io::IoContext;
use roster_registry::TenantScope;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::debug;

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Bearer scheme name
pub const AUTH_SCHEME_BEARER: &str = "Bearer";

/// Basic scheme name
pub const AUTH_SCHEME_BASIC: &str = "Basic";

// =============================================================================
// Tokens
// =============================================================================

/// Token errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("secret key must be at least {min_bytes} bytes, got {actual_bytes}")]
    SecretTooShort { min_bytes: usize, actual_bytes: usize },

    #[error("auth token expired")]
    Expired,

    #[error("auth token invalid")]
    Invalid,

    #[error("failed to sign token: {reason}")]
    Signing { reason: String },
}

/// Lifetime of a token when the operator does not pick one
pub fn default_token_ttl() -> Duration {
    Duration::from_millis(TOKEN_TTL_MS_DEFAULT)
}

fn check_secret(secret: &str) -> Result<(), TokenError> {
    if secret.len() < SECRET_KEY_LENGTH_BYTES_MIN {
        return Err(TokenError::SecretTooShort {
            min_bytes: SECRET_KEY_LENGTH_BYTES_MIN,
            actual_bytes: secret.len(),
        });
    }
    Ok(())
}

/// Token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Token id
    pub jti: String,
    /// Who asked for the token
    pub iss: String,
    /// Tenant the bearer acts for
    #[serde(default)]
    pub tenant: String,
    /// Issued at (Unix seconds)
    pub iat: u64,
    /// Expiration time (Unix seconds)
    pub exp: u64,
}

/// Signs tenant tokens
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    io: IoContext,
}

impl TokenIssuer {
    pub fn new(secret: &str, io: IoContext) -> Result<Self, TokenError> {
        check_secret(secret)?;
        Ok(Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
            io,
        })
    }

    /// Sign a token for `tenant`, valid for `ttl`
    pub fn generate(&self, issuer: &str, tenant: &str, ttl: Duration) -> Result<String, TokenError> {
        let now_secs = self.io.now_ms() / 1000;
        let claims = Claims {
            jti: self.io.gen_uuid(),
            iss: issuer.to_string(),
            tenant: tenant.to_string(),
            iat: now_secs,
            exp: now_secs.saturating_add(ttl.as_secs()),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.key).map_err(|e| {
            TokenError::Signing {
                reason: e.to_string(),
            }
        })
    }
}

/// Verifies tenant tokens
#[derive(Clone)]
pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(secret: &str) -> Result<Self, TokenError> {
        check_secret(secret)?;
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Ok(Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        use jsonwebtoken::errors::ErrorKind;

        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

// =============================================================================
// Basic Users
// =============================================================================

#[derive(Clone)]
struct BasicUser {
    login: String,
    login_digest: Vec<u8>,
    password_digest: Vec<u8>,
}

fn sha256(bytes: &[u8]) -> Vec<u8> {
    Sha256::digest(bytes).to_vec()
}

impl From<&UserCredentials> for BasicUser {
    fn from(user: &UserCredentials) -> Self {
        Self {
            login: user.login.clone(),
            login_digest: sha256(user.login.as_bytes()),
            password_digest: sha256(user.password.as_bytes()),
        }
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Maps an `Authorization` header to a tenant scope
#[derive(Clone)]
pub struct TenantResolver {
    tokens: Option<TokenValidator>,
    users: Vec<BasicUser>,
}

impl TenantResolver {
    pub fn new(secret_key: Option<&str>, users: &[UserCredentials]) -> Result<Self, TokenError> {
        let tokens = secret_key.map(TokenValidator::new).transpose()?;
        Ok(Self {
            tokens,
            users: users.iter().map(BasicUser::from).collect(),
        })
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, TokenError> {
        Self::new(config.secret_key.as_deref(), &config.users)
    }

    pub fn bearer_enabled(&self) -> bool {
        self.tokens.is_some()
    }

    pub fn basic_enabled(&self) -> bool {
        !self.users.is_empty()
    }

    /// Resolve the tenant named by an `Authorization` header value
    pub fn resolve(&self, authorization: Option<&str>) -> Result<TenantScope, AuthError> {
        let authorization = authorization
            .ok_or_else(|| AuthError::unauthorized("missing Authorization header"))?;
        let (scheme, credentials) = authorization
            .trim()
            .split_once(' ')
            .ok_or_else(|| AuthError::unauthorized("malformed Authorization header"))?;

        if scheme.eq_ignore_ascii_case(AUTH_SCHEME_BEARER) {
            self.resolve_bearer(credentials.trim())
        } else if scheme.eq_ignore_ascii_case(AUTH_SCHEME_BASIC) {
            self.resolve_basic(credentials.trim())
        } else {
            Err(AuthError::unauthorized(format!(
                "unsupported authorization scheme '{}'",
                scheme
            )))
        }
    }

    fn resolve_bearer(&self, token: &str) -> Result<TenantScope, AuthError> {
        let validator = self
            .tokens
            .as_ref()
            .ok_or_else(|| AuthError::unauthorized("bearer authorization is not enabled"))?;
        let claims = validator
            .validate(token)
            .map_err(|e| AuthError::unauthorized(e.to_string()))?;
        Ok(TenantScope::new(&claims.tenant))
    }

    fn resolve_basic(&self, encoded: &str) -> Result<TenantScope, AuthError> {
        if self.users.is_empty() {
            return Err(AuthError::unauthorized("basic authorization is not enabled"));
        }

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or_else(|| AuthError::unauthorized("malformed basic credentials"))?;
        let (login, password) = decoded
            .split_once(':')
            .ok_or_else(|| AuthError::unauthorized("malformed basic credentials"))?;

        let login_digest = sha256(login.as_bytes());
        let password_digest = sha256(password.as_bytes());

        // Compare against every user so timing does not reveal which logins exist
        let mut matched: Option<&BasicUser> = None;
        for user in &self.users {
            let ok = user.login_digest.ct_eq(&login_digest) & user.password_digest.ct_eq(&password_digest);
            if bool::from(ok) {
                matched = Some(user);
            }
        }

        matched
            .map(|user| TenantScope::new(&user.login))
            .ok_or_else(|| AuthError::unauthorized("invalid credentials"))
    }
}

// =============================================================================
// Error Response
// =============================================================================

/// Authentication error response
#[derive(Debug, Serialize)]
pub struct AuthError {
    pub code: String,
    pub message: String,
}

impl AuthError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            code: "unauthorized".to_string(),
            message: message.into(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self.code.as_str() {
            "unauthorized" => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

// =============================================================================
// Middleware
// =============================================================================

/// Resolve the tenant and attach it to the request as a [`TenantScope`] extension
pub async fn require_tenant(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let scope = match state.tenants().resolve(authorization) {
        Ok(scope) => scope,
        Err(e) => {
            debug!(path = %request.uri().path(), reason = %e.message, "request rejected");
            return Err(e);
        }
    };

    request.extensions_mut().insert(scope);
    Ok(next.run(request).await)
}
