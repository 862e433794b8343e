//! Roster Server Library
//!
//! HTTP front end for the Roster service-discovery registry: tenant
//! resolution, rate limiting and the REST API.

pub mod api;
pub mod models;
pub mod security;
pub mod state;

pub use api::router;
pub use state::AppState;
