//! Registry trait and the in-memory implementation
//!
//! TigerStyle: One lock, explicit mutations, every transition logged.
//!
//! `MemoryRegistry` keeps the whole [`Directory`] behind a single
//! `tokio::sync::RwLock`. Lookups and listings take it shared; join, leave,
//! ping and sweeps take it exclusively. No code path holds more than this one
//! lock.

use crate::api::{JoinRequest, JoinResponse, Pong};
use crate::client::{Client, ClientId, ClientState};
use crate::directory::Directory;
use crate::endpoint::Endpoint;
use crate::error::{RegistryError, RegistryResult};
use crate::health::HealthThresholds;
use crate::tenant::{TenantScope, TenantSnapshot};
use async_trait::async_trait;
use roster_core::config::RegistryConfig;
use roster_core::io::{IoContext, RngProvider, StdRngProvider, TimeProvider, WallClockTime};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

// =============================================================================
// Registry Trait
// =============================================================================

/// The service-discovery registry
///
/// # Guarantees
/// - Every client belongs to exactly one tenant for its lifetime
/// - Any topology change in a tenant flags all of its clients dirty
/// - Operations are linearizable
#[async_trait]
pub trait Registry: Send + Sync {
    /// Register a client in the scope's tenant
    ///
    /// # Errors
    /// `MaxClientsReached`, `InvalidEndpoint`, or `AlreadyRegistered` when the
    /// tenant holds a client with the same service, endpoints and meta.
    async fn join(&self, scope: &TenantScope, request: JoinRequest) -> RegistryResult<JoinResponse>;

    /// Deregister a client from whichever tenant holds it
    async fn leave(&self, scope: &TenantScope, client_id: &ClientId) -> RegistryResult<()>;

    /// Record a heartbeat; `CHANGED` if the tenant changed since the last one
    async fn ping(&self, client_id: &ClientId) -> RegistryResult<Pong>;

    /// Clients in the scope, sorted by `(service_id, client_id)`
    ///
    /// The default scope lists every client.
    async fn list(&self, scope: &TenantScope) -> RegistryResult<Vec<Client>>;

    /// Every tenant with its clients, tenants sorted by name
    async fn list_all(&self) -> RegistryResult<Vec<TenantSnapshot>>;

    /// Apply the health thresholds to every client once
    async fn sweep(&self) -> RegistryResult<SweepReport>;

    /// Number of live clients
    async fn client_count(&self) -> usize;
}

/// Transitions applied by one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub failing: Vec<ClientId>,
    pub down: Vec<ClientId>,
    pub removed: Vec<ClientId>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.failing.is_empty() && self.down.is_empty() && self.removed.is_empty()
    }

    pub fn transitions(&self) -> usize {
        self.failing.len() + self.down.len() + self.removed.len()
    }
}

// =============================================================================
// In-Memory Registry
// =============================================================================

/// In-memory registry implementation
///
/// All state is lost on restart.
pub struct MemoryRegistry {
    directory: RwLock<Directory>,
    max_clients: usize,
    thresholds: HealthThresholds,
    time: Arc<dyn TimeProvider>,
    rng: Arc<dyn RngProvider>,
}

impl MemoryRegistry {
    /// Create a registry with default configuration and production providers
    pub fn new() -> Self {
        let config = RegistryConfig::default();
        Self {
            directory: RwLock::new(Directory::new()),
            max_clients: config.max_clients,
            thresholds: HealthThresholds {
                interval_ms: config.ping_interval_ms,
                failing: config.failing_threshold,
                down: config.down_threshold,
                remove: config.remove_threshold,
            },
            time: Arc::new(WallClockTime::new()),
            rng: Arc::new(StdRngProvider::new()),
        }
    }

    /// Create with explicit configuration and I/O providers
    pub fn with_config(config: &RegistryConfig, io: IoContext) -> RegistryResult<Self> {
        config.validate()?;
        Ok(Self {
            directory: RwLock::new(Directory::new()),
            max_clients: config.max_clients,
            thresholds: HealthThresholds::from_config(config)?,
            time: io.time,
            rng: io.rng,
        })
    }

    /// Number of known tenants, including empty ones
    pub async fn tenant_count(&self) -> usize {
        self.directory.read().await.tenant_count()
    }

    /// Remove a client and flag its remaining tenant peers dirty
    ///
    /// Shared by leave and eviction.
    fn remove_client(directory: &mut Directory, client_id: &ClientId) -> Option<Client> {
        let mut removed = directory.remove(client_id)?;
        removed.set_state(ClientState::Removed);
        directory.mark_tenant_dirty(removed.tenant());
        Some(removed)
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_clients(clients: &mut [Client]) {
    clients.sort_by(|a, b| {
        a.service_id()
            .cmp(b.service_id())
            .then_with(|| a.client_id().cmp(b.client_id()))
    });
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn join(&self, scope: &TenantScope, request: JoinRequest) -> RegistryResult<JoinResponse> {
        let mut directory = self.directory.write().await;

        if directory.len() >= self.max_clients {
            return Err(RegistryError::MaxClientsReached {
                max_clients: self.max_clients,
            });
        }

        let client_id = ClientId::new(self.rng.gen_uuid());
        let endpoints = request
            .endpoints
            .iter()
            .map(|url| Endpoint::new(url.as_str()))
            .collect::<RegistryResult<Vec<_>>>()?;

        let tenant = scope.name();
        if let Ok(peers) = directory.tenant_clients(tenant) {
            let duplicate = peers
                .iter()
                .any(|peer| peer.same_registration(&request.service, &endpoints, &request.meta));
            if duplicate {
                return Err(RegistryError::AlreadyRegistered {
                    service_id: request.service,
                    tenant: tenant.to_string(),
                });
            }
        }

        let client = Client::new(
            client_id.clone(),
            request.service,
            tenant,
            endpoints,
            request.meta,
            self.time.now_ms(),
        );
        info!(
            client_id = %client_id,
            service_id = %client.service_id(),
            tenant = %tenant,
            "client joined"
        );
        directory.insert(client);
        directory.mark_tenant_dirty(tenant);

        Ok(JoinResponse {
            id: client_id,
            interval: self.thresholds.interval(),
        })
    }

    async fn leave(&self, scope: &TenantScope, client_id: &ClientId) -> RegistryResult<()> {
        let mut directory = self.directory.write().await;

        // Looked up by id alone: the client leaves whichever tenant holds it
        let client = Self::remove_client(&mut directory, client_id)
            .ok_or_else(|| RegistryError::client_not_found(client_id.as_str()))?;
        info!(
            client_id = %client_id,
            service_id = %client.service_id(),
            tenant = %client.tenant(),
            scope = %scope,
            "client left"
        );
        Ok(())
    }

    async fn ping(&self, client_id: &ClientId) -> RegistryResult<Pong> {
        let now_ms = self.time.now_ms();
        let mut directory = self.directory.write().await;

        let client = directory
            .get_mut(client_id)
            .ok_or_else(|| RegistryError::client_not_found(client_id.as_str()))?;

        if client.ping(now_ms) {
            let tenant = client.tenant().to_string();
            info!(client_id = %client_id, tenant = %tenant, "client up");
            directory.mark_tenant_dirty(&tenant);
        }

        let changed = directory
            .get_mut(client_id)
            .map(Client::take_dirty)
            .unwrap_or(false);
        debug!(client_id = %client_id, changed, "ping");

        Ok(if changed { Pong::changed() } else { Pong::ok() })
    }

    async fn list(&self, scope: &TenantScope) -> RegistryResult<Vec<Client>> {
        let directory = self.directory.read().await;

        let mut clients: Vec<Client> = match scope {
            TenantScope::Default => directory.list().cloned().collect(),
            TenantScope::Named(tenant) => match directory.tenant_clients(tenant) {
                Ok(clients) => clients.into_iter().cloned().collect(),
                Err(RegistryError::TenantNotFound { .. }) => Vec::new(),
                Err(e) => return Err(e),
            },
        };
        sort_clients(&mut clients);
        Ok(clients)
    }

    async fn list_all(&self) -> RegistryResult<Vec<TenantSnapshot>> {
        let directory = self.directory.read().await;

        let mut snapshots = Vec::with_capacity(directory.tenant_count());
        for name in directory.tenant_names() {
            let mut clients: Vec<Client> = directory
                .tenant_clients(name)?
                .into_iter()
                .cloned()
                .collect();
            sort_clients(&mut clients);
            snapshots.push(TenantSnapshot {
                name: name.to_string(),
                clients,
            });
        }
        Ok(snapshots)
    }

    async fn sweep(&self) -> RegistryResult<SweepReport> {
        let now_ms = self.time.now_ms();
        let mut directory = self.directory.write().await;
        let mut report = SweepReport::default();

        let tenants: Vec<String> = directory.tenant_names().map(str::to_string).collect();
        for tenant in tenants {
            let pending: Vec<(ClientId, ClientState)> = directory
                .tenant_clients(&tenant)?
                .into_iter()
                .filter_map(|client| {
                    self.thresholds
                        .check(client.state(), client.elapsed_ms(now_ms))
                        .map(|next| (client.client_id().clone(), next))
                })
                .collect();

            for (client_id, next) in pending {
                match next {
                    ClientState::Removed => {
                        if Self::remove_client(&mut directory, &client_id).is_some() {
                            info!(client_id = %client_id, tenant = %tenant, "client removed");
                            report.removed.push(client_id);
                        }
                    }
                    ClientState::Down | ClientState::Failing => {
                        if let Some(client) = directory.get_mut(&client_id) {
                            client.set_state(next);
                        }
                        directory.mark_tenant_dirty(&tenant);
                        info!(client_id = %client_id, tenant = %tenant, state = %next, "client state changed");
                        if next == ClientState::Down {
                            report.down.push(client_id);
                        } else {
                            report.failing.push(client_id);
                        }
                    }
                    ClientState::Starting | ClientState::Up => {}
                }
            }
        }

        Ok(report)
    }

    async fn client_count(&self) -> usize {
        self.directory.read().await.len()
    }
}
