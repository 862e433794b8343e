//! Registry backends
//!
//! TigerStyle: Backends are selected once, by name, at startup.
//!
//! A [`BackendCatalog`] maps names to [`BackendFactory`] instances. The
//! process asks the catalog for the configured backend and hands the
//! resulting `Arc<dyn Registry>` to every consumer.

use crate::error::{RegistryError, RegistryResult};
use crate::registry::{MemoryRegistry, Registry};
use roster_core::config::RegistryConfig;
use roster_core::io::IoContext;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Constructs a registry from configuration
pub trait BackendFactory: Send + Sync {
    /// Name the backend is selected by
    fn name(&self) -> &str;

    /// Build a registry
    fn init(&self, config: &RegistryConfig, io: IoContext) -> RegistryResult<Arc<dyn Registry>>;
}

/// In-memory backend, state is lost on restart
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryBackend;

impl MemoryBackend {
    pub const NAME: &'static str = "memory";
}

impl BackendFactory for MemoryBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&self, config: &RegistryConfig, io: IoContext) -> RegistryResult<Arc<dyn Registry>> {
        Ok(Arc::new(MemoryRegistry::with_config(config, io)?))
    }
}

/// Named registry backends
pub struct BackendCatalog {
    factories: BTreeMap<String, Arc<dyn BackendFactory>>,
}

impl BackendCatalog {
    /// An empty catalog
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A catalog holding the built-in backends
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.register(Arc::new(MemoryBackend));
        catalog
    }

    /// Add a backend, replacing any backend of the same name
    pub fn register(&mut self, factory: Arc<dyn BackendFactory>) {
        self.factories.insert(factory.name().to_string(), factory);
    }

    /// Registered backend names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn get(&self, name: &str) -> RegistryResult<Arc<dyn BackendFactory>> {
        self.factories
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownBackend {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    /// Build the backend named by `config.backend`
    pub fn init(&self, config: &RegistryConfig, io: IoContext) -> RegistryResult<Arc<dyn Registry>> {
        let factory = self.get(&config.backend)?;
        let registry = factory.init(config, io)?;
        info!(
            backend = %config.backend,
            max_clients = config.max_clients,
            ping_interval_ms = config.ping_interval_ms,
            "registry backend initialized"
        );
        Ok(registry)
    }
}

impl Default for BackendCatalog {
    fn default() -> Self {
        Self::with_builtins()
    }
}
