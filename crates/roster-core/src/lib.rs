//! Roster Core
//!
//! Core types, errors, configuration and constants for the Roster
//! service-discovery registry.
//!
//! # Overview
//!
//! Roster keeps a tenant-partitioned directory of live service instances.
//! Instances join, heartbeat, and are listed by their peers. This crate holds
//! the pieces every other Roster crate depends on:
//! - Explicit limits and defaults (`constants`)
//! - Configuration with validation (`config`)
//! - Time and randomness providers, so registry logic can run against a
//!   manually driven clock in tests (`io`)
//! - Tracing subscriber setup (`telemetry`)
//!
//! # TigerStyle
//!
//! - Explicit limits with big-endian naming (e.g., `PING_INTERVAL_MS_MAX`)
//! - Errors are returned, never panics
//! - All time and randomness goes through injectable providers

pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod telemetry;

pub use config::{RegistryConfig, RosterConfig, ServerConfig, UserCredentials};
pub use constants::*;
pub use error::{Error, Result};
pub use io::{IoContext, ManualClock, RngProvider, StdRngProvider, TimeProvider, WallClockTime};
pub use telemetry::{init_telemetry, LogFormat, TelemetryConfig};
