//! Configuration for Roster
//!
//! TigerStyle: Explicit defaults, validation, reasonable limits.
//!
//! Sources are layered, later wins: built-in defaults, an optional YAML file,
//! `ROSTER_*` environment variables. CLI flags are applied by the binary.

use crate::constants::*;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for Roster
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterConfig {
    /// Registry engine configuration
    #[serde(default)]
    pub registry: RegistryConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

impl RosterConfig {
    /// Parse configuration from a YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::InvalidConfiguration {
            field: "<yaml>".into(),
            reason: e.to_string(),
        })
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| Error::ConfigurationUnreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Self::from_yaml(&contents)
    }

    /// Overlay `ROSTER_*` variables from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay `ROSTER_*` variables read through `lookup`
    ///
    /// Values that fail to parse are ignored and the previous value kept.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let registry = &mut self.registry;
        env_parse(&lookup, "ROSTER_MAX_CLIENTS", &mut registry.max_clients);
        env_parse(
            &lookup,
            "ROSTER_PING_INTERVAL_MS",
            &mut registry.ping_interval_ms,
        );
        env_parse(
            &lookup,
            "ROSTER_CLIENT_FAILING_THRESHOLD",
            &mut registry.failing_threshold,
        );
        env_parse(
            &lookup,
            "ROSTER_CLIENT_DOWN_THRESHOLD",
            &mut registry.down_threshold,
        );
        env_parse(
            &lookup,
            "ROSTER_CLIENT_REMOVE_THRESHOLD",
            &mut registry.remove_threshold,
        );
        env_parse(&lookup, "ROSTER_MONITOR_TICK_MS", &mut registry.monitor_tick_ms);
        if let Some(backend) = lookup("ROSTER_BACKEND") {
            registry.backend = backend;
        }

        let server = &mut self.server;
        if let Some(bind_address) = lookup("ROSTER_BIND_ADDRESS") {
            server.bind_address = bind_address;
        }
        if let Some(secret_key) = lookup("ROSTER_SECRET_KEY") {
            server.secret_key = Some(secret_key);
        }
        if let Some(users) = lookup("ROSTER_USERS") {
            server.users = UserCredentials::parse_list(&users);
        }
        env_parse(&lookup, "ROSTER_LIMIT_RATE", &mut server.limit_rate);
        env_parse(&lookup, "ROSTER_LIMIT_BURST", &mut server.limit_burst);
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.registry.validate()?;
        self.server.validate()?;
        Ok(())
    }
}

fn env_parse<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *target = value,
        Err(_) => tracing::debug!(key, value = %raw, "ignoring unparseable environment value"),
    }
}

/// Registry engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Maximum number of live clients across all tenants
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,

    /// Ping interval negotiated with clients (milliseconds)
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    /// Silent intervals before a client is FAILING
    #[serde(default = "default_failing_threshold")]
    pub failing_threshold: u32,

    /// Silent intervals before a client is DOWN
    #[serde(default = "default_down_threshold")]
    pub down_threshold: u32,

    /// Silent intervals before a client is removed
    #[serde(default = "default_remove_threshold")]
    pub remove_threshold: u32,

    /// Health monitor sweep tick (milliseconds)
    #[serde(default = "default_monitor_tick_ms")]
    pub monitor_tick_ms: u64,

    /// Registry backend name
    #[serde(default = "default_backend")]
    pub backend: String,
}

fn default_max_clients() -> usize {
    CLIENTS_COUNT_MAX_DEFAULT
}

fn default_ping_interval_ms() -> u64 {
    PING_INTERVAL_MS_DEFAULT
}

fn default_failing_threshold() -> u32 {
    CLIENT_FAILING_THRESHOLD_DEFAULT
}

fn default_down_threshold() -> u32 {
    CLIENT_DOWN_THRESHOLD_DEFAULT
}

fn default_remove_threshold() -> u32 {
    CLIENT_REMOVE_THRESHOLD_DEFAULT
}

fn default_monitor_tick_ms() -> u64 {
    MONITOR_TICK_MS_DEFAULT
}

fn default_backend() -> String {
    BACKEND_DEFAULT.to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_clients: default_max_clients(),
            ping_interval_ms: default_ping_interval_ms(),
            failing_threshold: default_failing_threshold(),
            down_threshold: default_down_threshold(),
            remove_threshold: default_remove_threshold(),
            monitor_tick_ms: default_monitor_tick_ms(),
            backend: default_backend(),
        }
    }
}

impl RegistryConfig {
    /// Validate the registry configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_clients == 0 || self.max_clients > CLIENTS_COUNT_MAX {
            return Err(Error::InvalidConfiguration {
                field: "registry.max_clients".into(),
                reason: format!("must be in 1..={}", CLIENTS_COUNT_MAX),
            });
        }

        if !(PING_INTERVAL_MS_MIN..=PING_INTERVAL_MS_MAX).contains(&self.ping_interval_ms) {
            return Err(Error::InvalidConfiguration {
                field: "registry.ping_interval_ms".into(),
                reason: format!(
                    "{} outside {}..={}",
                    self.ping_interval_ms, PING_INTERVAL_MS_MIN, PING_INTERVAL_MS_MAX
                ),
            });
        }

        if self.failing_threshold == 0 {
            return Err(Error::InvalidConfiguration {
                field: "registry.failing_threshold".into(),
                reason: "must be positive".into(),
            });
        }

        if self.down_threshold <= self.failing_threshold {
            return Err(Error::InvalidConfiguration {
                field: "registry.down_threshold".into(),
                reason: "must be greater than failing_threshold".into(),
            });
        }

        if self.remove_threshold <= self.down_threshold {
            return Err(Error::InvalidConfiguration {
                field: "registry.remove_threshold".into(),
                reason: "must be greater than down_threshold".into(),
            });
        }

        if self.monitor_tick_ms < MONITOR_TICK_MS_MIN {
            return Err(Error::InvalidConfiguration {
                field: "registry.monitor_tick_ms".into(),
                reason: format!("must be at least {}", MONITOR_TICK_MS_MIN),
            });
        }

        if self.backend.trim().is_empty() {
            return Err(Error::InvalidConfiguration {
                field: "registry.backend".into(),
                reason: "must not be empty".into(),
            });
        }

        Ok(())
    }
}

/// Login and password accepted by Basic authorization
///
/// The login doubles as the tenant name.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCredentials {
    pub login: String,
    pub password: String,
}

impl std::fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCredentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl UserCredentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }

    /// Parse `login:password,login:password`
    ///
    /// Entries without a `:` or with an empty login are skipped.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        raw.split(',')
            .filter_map(|entry| {
                let (login, password) = entry.trim().split_once(':')?;
                if login.is_empty() {
                    return None;
                }
                Some(Self::new(login, password))
            })
            .collect()
    }
}

/// HTTP server configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HMAC secret for bearer tokens; bearer auth is disabled when unset
    #[serde(default)]
    pub secret_key: Option<String>,

    /// Basic authorization users; basic auth is disabled when empty
    #[serde(default)]
    pub users: Vec<UserCredentials>,

    /// Sustained request rate (per second)
    #[serde(default = "default_limit_rate")]
    pub limit_rate: u32,

    /// Request burst size
    #[serde(default = "default_limit_burst")]
    pub limit_burst: u32,
}

fn default_bind_address() -> String {
    BIND_ADDRESS_DEFAULT.to_string()
}

fn default_limit_rate() -> u32 {
    REQUEST_RATE_PER_SEC_DEFAULT
}

fn default_limit_burst() -> u32 {
    REQUEST_BURST_COUNT_DEFAULT
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            secret_key: None,
            users: Vec::new(),
            limit_rate: default_limit_rate(),
            limit_burst: default_limit_burst(),
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_address", &self.bind_address)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("users", &self.users)
            .field("limit_rate", &self.limit_rate)
            .field("limit_burst", &self.limit_burst)
            .finish()
    }
}

impl ServerConfig {
    fn validate(&self) -> Result<()> {
        if !self.bind_address.contains(':') {
            return Err(Error::InvalidConfiguration {
                field: "server.bind_address".into(),
                reason: "must be in host:port format".into(),
            });
        }

        if let Some(secret_key) = &self.secret_key {
            if secret_key.len() < SECRET_KEY_LENGTH_BYTES_MIN {
                return Err(Error::InvalidConfiguration {
                    field: "server.secret_key".into(),
                    reason: format!("must be at least {} bytes", SECRET_KEY_LENGTH_BYTES_MIN),
                });
            }
        }

        if self.limit_rate == 0 {
            return Err(Error::InvalidConfiguration {
                field: "server.limit_rate".into(),
                reason: "must be positive".into(),
            });
        }

        if self.limit_burst == 0 {
            return Err(Error::InvalidConfiguration {
                field: "server.limit_burst".into(),
                reason: "must be positive".into(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = RosterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.registry.max_clients, 1024);
        assert_eq!(config.registry.ping_interval_ms, 15_000);
        assert_eq!(config.registry.backend, "memory");
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn test_misordered_thresholds_rejected() {
        let mut config = RosterConfig::default();
        config.registry.failing_threshold = 4;
        config.registry.down_threshold = 4;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("registry.down_threshold"));

        let mut config = RosterConfig::default();
        config.registry.remove_threshold = 3;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("registry.remove_threshold"));
    }

    #[test]
    fn test_zero_values_rejected() {
        let mut config = RosterConfig::default();
        config.registry.failing_threshold = 0;
        assert!(config.validate().is_err());

        let mut config = RosterConfig::default();
        config.registry.max_clients = 0;
        assert!(config.validate().is_err());

        let mut config = RosterConfig::default();
        config.server.limit_rate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut config = RosterConfig::default();
        config.server.secret_key = Some("too-short".into());
        assert!(config.validate().is_err());

        config.server.secret_key = Some("x".repeat(SECRET_KEY_LENGTH_BYTES_MIN));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_partial_uses_defaults() {
        let config = RosterConfig::from_yaml(
            r#"
registry:
  max_clients: 10
  ping_interval_ms: 1000
server:
  users:
    - login: acme
      password: secret
"#,
        )
        .unwrap();
        assert_eq!(config.registry.max_clients, 10);
        assert_eq!(config.registry.ping_interval_ms, 1000);
        assert_eq!(config.registry.down_threshold, CLIENT_DOWN_THRESHOLD_DEFAULT);
        assert_eq!(config.server.users, vec![UserCredentials::new("acme", "secret")]);
        assert_eq!(config.server.limit_burst, REQUEST_BURST_COUNT_DEFAULT);
    }

    #[test]
    fn test_yaml_invalid_is_configuration_error() {
        let err = RosterConfig::from_yaml("registry: [1, 2").unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RosterConfig::default();
        config.apply_env_with(env(&[
            ("ROSTER_MAX_CLIENTS", "5"),
            ("ROSTER_PING_INTERVAL_MS", "2000"),
            ("ROSTER_CLIENT_REMOVE_THRESHOLD", "10"),
            ("ROSTER_BACKEND", "memory"),
            ("ROSTER_BIND_ADDRESS", "127.0.0.1:9999"),
            ("ROSTER_USERS", "acme:pw1, globex:pw2,broken"),
            ("ROSTER_LIMIT_RATE", "50"),
        ]));
        assert_eq!(config.registry.max_clients, 5);
        assert_eq!(config.registry.ping_interval_ms, 2000);
        assert_eq!(config.registry.remove_threshold, 10);
        assert_eq!(config.server.bind_address, "127.0.0.1:9999");
        assert_eq!(
            config.server.users,
            vec![
                UserCredentials::new("acme", "pw1"),
                UserCredentials::new("globex", "pw2"),
            ]
        );
        assert_eq!(config.server.limit_rate, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_unparseable_keeps_previous() {
        let mut config = RosterConfig::default();
        config.apply_env_with(env(&[
            ("ROSTER_MAX_CLIENTS", "lots"),
            ("ROSTER_MONITOR_TICK_MS", "-1"),
        ]));
        assert_eq!(config.registry.max_clients, CLIENTS_COUNT_MAX_DEFAULT);
        assert_eq!(config.registry.monitor_tick_ms, MONITOR_TICK_MS_DEFAULT);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = ServerConfig::default();
        config.secret_key = Some("s".repeat(40));
        config.users = vec![UserCredentials::new("acme", "hunter2")];
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains(&"s".repeat(40)));
        assert!(rendered.contains("acme"));
    }
}
