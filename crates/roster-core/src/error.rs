//! Error types for Roster
//!
//! TigerStyle: Explicit error types with context, using thiserror.

use thiserror::Error;

/// Result type alias for Roster core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Roster core error types
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {field}, reason: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("Configuration file {path} could not be read: {reason}")]
    ConfigurationUnreadable { path: String, reason: String },

    // =========================================================================
    // Telemetry Errors
    // =========================================================================
    #[error("Telemetry initialization failed: {reason}")]
    TelemetryInitFailed { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create an invalid configuration error
    pub fn invalid_configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_configuration("registry.max_clients", "must be positive");
        let msg = err.to_string();
        assert!(msg.contains("registry.max_clients"));
        assert!(msg.contains("must be positive"));
    }
}
