//! Global request rate limiting
//!
//! TigerStyle: One token bucket for the whole server, checked before routing.

use crate::models::ErrorResponse;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use roster_core::Error;
use std::num::NonZeroU32;
use tracing::debug;

/// Token bucket allowing `rate` requests per second with bursts up to `burst`
pub struct RequestLimiter {
    limiter: DefaultDirectRateLimiter,
}

impl RequestLimiter {
    pub fn new(rate: u32, burst: u32) -> roster_core::Result<Self> {
        let rate = NonZeroU32::new(rate)
            .ok_or_else(|| Error::invalid_configuration("server.limit_rate", "must be positive"))?;
        let burst = NonZeroU32::new(burst)
            .ok_or_else(|| Error::invalid_configuration("server.limit_burst", "must be positive"))?;

        Ok(Self {
            limiter: RateLimiter::direct(Quota::per_second(rate).allow_burst(burst)),
        })
    }

    /// Take one token; false when the bucket is empty
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl std::fmt::Debug for RequestLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLimiter").finish_non_exhaustive()
    }
}

/// Count the request and reject it with 429 when the bucket is empty
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    state.metrics().record_request();

    if !state.limiter().try_acquire() {
        state.metrics().record_rate_limited();
        debug!(path = %request.uri().path(), "request rate limited");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse::new("rate_limited", "too many requests")),
        )
            .into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_rate_rejected() {
        assert!(RequestLimiter::new(0, 1).is_err());
        assert!(RequestLimiter::new(1, 0).is_err());
    }

    #[test]
    fn test_burst_then_reject() {
        let limiter = RequestLimiter::new(1, 3).unwrap();
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }
}
