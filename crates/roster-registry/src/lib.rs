//! Roster Registry
//!
//! Tenant-partitioned directory of live service instances.
//!
//! # Overview
//!
//! The registry provides:
//! - Join / Leave / Ping / List over a single client table with a tenant index
//! - Duplicate detection and capacity limits
//! - Dirty-flag propagation so heartbeating clients learn about topology changes
//! - Threshold-based demotion and eviction of silent clients (`HealthMonitor`)
//! - Backend selection by name (`BackendCatalog`)
//!
//! The registry performs no network I/O and reads no configuration sources;
//! it receives validated parameters and a resolved [`TenantScope`].

pub mod api;
pub mod backend;
pub mod client;
pub mod directory;
pub mod endpoint;
pub mod error;
pub mod health;
pub mod registry;
pub mod tenant;

pub use api::{JoinRequest, JoinResponse, Pong, PongType};
pub use backend::{BackendCatalog, BackendFactory, MemoryBackend};
pub use client::{Client, ClientId, ClientState, Metadata};
pub use directory::Directory;
pub use endpoint::{Endpoint, EndpointType};
pub use error::{RegistryError, RegistryResult};
pub use health::{HealthMonitor, HealthThresholds};
pub use registry::{MemoryRegistry, Registry, SweepReport};
pub use tenant::{TenantScope, TenantSnapshot};
