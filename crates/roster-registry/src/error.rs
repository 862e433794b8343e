//! Registry error types
//!
//! TigerStyle: Explicit error variants with context.

use thiserror::Error;

/// Registry-specific errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Client not found in registry (never joined, left, or evicted)
    #[error("client not found: {client_id}")]
    ClientNotFound { client_id: String },

    /// Tenant has never been seen by the registry
    #[error("tenant not found: {tenant}")]
    TenantNotFound { tenant: String },

    /// Identical registration already present in the tenant
    #[error("service {service_id} already registered in tenant {tenant} with the same endpoints and meta")]
    AlreadyRegistered { service_id: String, tenant: String },

    /// Registry is at capacity
    #[error("max clients reached: {max_clients}")]
    MaxClientsReached { max_clients: usize },

    /// Endpoint URL with an unsupported scheme
    #[error("invalid endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// Registry parameters rejected at construction
    #[error("invalid configuration: {field}, reason: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    /// No backend registered under the configured name
    #[error("unknown backend '{name}', available: {available}")]
    UnknownBackend { name: String, available: String },

    /// Internal registry error
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl RegistryError {
    /// Create a client not found error
    pub fn client_not_found(client_id: impl Into<String>) -> Self {
        Self::ClientNotFound {
            client_id: client_id.into(),
        }
    }

    /// Create a tenant not found error
    pub fn tenant_not_found(tenant: impl Into<String>) -> Self {
        Self::TenantNotFound {
            tenant: tenant.into(),
        }
    }

    /// Create an invalid endpoint error
    pub fn invalid_endpoint(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code, used in error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::ClientNotFound { .. } => "client_not_found",
            Self::TenantNotFound { .. } => "tenant_not_found",
            Self::AlreadyRegistered { .. } => "already_registered",
            Self::MaxClientsReached { .. } => "max_clients_reached",
            Self::InvalidEndpoint { .. } => "invalid_endpoint",
            Self::InvalidConfiguration { .. } => "invalid_configuration",
            Self::UnknownBackend { .. } => "unknown_backend",
            Self::Internal { .. } => "internal",
        }
    }

    /// Check if this error indicates a retriable condition
    ///
    /// Capacity frees up as clients leave or are evicted.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::MaxClientsReached { .. })
    }
}

impl From<roster_core::Error> for RegistryError {
    fn from(err: roster_core::Error) -> Self {
        match err {
            roster_core::Error::InvalidConfiguration { field, reason } => {
                Self::InvalidConfiguration { field, reason }
            }
            other => Self::Internal {
                message: other.to_string(),
            },
        }
    }
}

/// Result type for registry operations
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegistryError::client_not_found("c-1");
        assert!(err.to_string().contains("c-1"));
        assert_eq!(err.code(), "client_not_found");
    }

    #[test]
    fn test_error_retriable() {
        let full = RegistryError::MaxClientsReached { max_clients: 4 };
        assert!(full.is_retriable());
        assert!(!RegistryError::client_not_found("x").is_retriable());
    }

    #[test]
    fn test_from_core_configuration_error() {
        let core = roster_core::Error::invalid_configuration("registry.down_threshold", "bad");
        let err: RegistryError = core.into();
        assert_eq!(
            err,
            RegistryError::InvalidConfiguration {
                field: "registry.down_threshold".into(),
                reason: "bad".into(),
            }
        );
    }
}
