//! Registered clients
//!
//! TigerStyle: Explicit client lifecycle, state changes reported to caller.

use crate::endpoint::Endpoint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Free-form client metadata
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Registry-assigned client identifier
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ClientId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Liveness state of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClientState {
    /// Joined, not yet pinged
    Starting,
    /// Pinged within the failing threshold
    Up,
    /// Silent past the failing threshold
    Failing,
    /// Silent past the down threshold
    Down,
    /// Evicted; terminal
    Removed,
}

impl ClientState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "STARTING",
            Self::Up => "UP",
            Self::Failing => "FAILING",
            Self::Down => "DOWN",
            Self::Removed => "REMOVED",
        }
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered service instance
#[derive(Debug, Clone, Serialize)]
pub struct Client {
    client_id: ClientId,
    service_id: String,
    tenant: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    endpoints: Vec<Endpoint>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    meta: Metadata,
    #[serde(skip)]
    last_seen_ms: u64,
    state: ClientState,
    #[serde(skip)]
    dirty: bool,
}

impl Client {
    /// Create a freshly joined client: `STARTING` and dirty
    pub fn new(
        client_id: ClientId,
        service_id: impl Into<String>,
        tenant: impl Into<String>,
        endpoints: Vec<Endpoint>,
        meta: Metadata,
        now_ms: u64,
    ) -> Self {
        Self {
            client_id,
            service_id: service_id.into(),
            tenant: tenant.into(),
            endpoints,
            meta,
            last_seen_ms: now_ms,
            state: ClientState::Starting,
            dirty: true,
        }
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn meta(&self) -> &Metadata {
        &self.meta
    }

    pub fn last_seen_ms(&self) -> u64 {
        self.last_seen_ms
    }

    /// Milliseconds since the last ping (or join)
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_seen_ms)
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn set_state(&mut self, state: ClientState) {
        self.state = state;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Read and clear the dirty flag
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Record a heartbeat
    ///
    /// Returns true when the client was not `UP` before, i.e. it came back.
    pub fn ping(&mut self, now_ms: u64) -> bool {
        self.last_seen_ms = now_ms;
        if self.state == ClientState::Up {
            return false;
        }
        self.state = ClientState::Up;
        true
    }

    /// Whether this client registers exactly the given service, endpoints and meta
    pub fn same_registration(
        &self,
        service_id: &str,
        endpoints: &[Endpoint],
        meta: &Metadata,
    ) -> bool {
        self.service_id == service_id
            && self.endpoints == endpoints
            && self.meta.len() == meta.len()
            && self
                .meta
                .iter()
                .zip(meta.iter())
                .all(|((ka, va), (kb, vb))| ka == kb && same_value(va, vb))
    }
}

/// Structural equality where every number compares by its `f64` value,
/// so `1` and `1.0` are the same metadata value
fn same_value(a: &serde_json::Value, b: &serde_json::Value) -> bool {
    use serde_json::Value;

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| same_value(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| same_value(x, y)))
        }
        _ => a == b,
    }
}
