//! Tenant partitions

use crate::client::Client;
use roster_core::constants::TENANT_DEFAULT;
use serde::Serialize;
use std::fmt;

/// Tenant context of a request
///
/// `Default` is not tenant-scoped: it lists every client, and joins land in
/// the `"default"` partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum TenantScope {
    #[default]
    Default,
    Named(String),
}

impl TenantScope {
    /// Resolve a tenant name; empty and `"default"` both mean the default scope
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref().trim();
        if name.is_empty() || name == TENANT_DEFAULT {
            Self::Default
        } else {
            Self::Named(name.to_string())
        }
    }

    /// Partition name clients of this scope are stored under
    pub fn name(&self) -> &str {
        match self {
            Self::Default => TENANT_DEFAULT,
            Self::Named(name) => name,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }
}

impl fmt::Display for TenantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A tenant and its clients at one point in time
#[derive(Debug, Clone, Serialize)]
pub struct TenantSnapshot {
    pub name: String,
    pub clients: Vec<Client>,
}
