//! Security Module
//!
//! TigerStyle: Tenant resolution and request admission for the Roster server.
//!
//! Features:
//! - Bearer (JWT) and Basic tenant resolution middleware
//! - Global rate limiting

pub mod auth;
pub mod rate_limit;

pub use auth::{
    default_token_ttl, AuthError, Claims, TenantResolver, TokenError, TokenIssuer, TokenValidator,
};
pub use rate_limit::RequestLimiter;
