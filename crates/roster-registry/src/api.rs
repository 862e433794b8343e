//! Request and response types exchanged with clients
//!
//! The ping interval travels as a human-readable duration (`"15s"`); integer
//! nanoseconds are accepted on input as well.

use crate::client::{ClientId, Metadata};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Registration request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRequest {
    pub service: String,
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub meta: Metadata,
}

impl JoinRequest {
    pub fn new<I, S>(service: impl Into<String>, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            service: service.into(),
            endpoints: endpoints.into_iter().map(Into::into).collect(),
            meta: Metadata::new(),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

/// Registration result: the assigned id and the negotiated ping interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinResponse {
    pub id: ClientId,
    #[serde(with = "interval")]
    pub interval: Duration,
}

/// Ping outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PongType {
    /// Nothing changed in the caller's tenant since its last ping
    Ok,
    /// Tenant topology changed; the caller should re-list
    Changed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pong {
    pub response: PongType,
    #[serde(default)]
    pub error: String,
}

impl Pong {
    pub fn ok() -> Self {
        Self {
            response: PongType::Ok,
            error: String::new(),
        }
    }

    pub fn changed() -> Self {
        Self {
            response: PongType::Changed,
            error: String::new(),
        }
    }
}

mod interval {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        deserializer.deserialize_any(IntervalVisitor)
    }

    struct IntervalVisitor;

    impl<'de> Visitor<'de> for IntervalVisitor {
        type Value = Duration;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a duration string like \"15s\" or integer nanoseconds")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
            humantime::parse_duration(v).map_err(E::custom)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
            Ok(Duration::from_nanos(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
            u64::try_from(v)
                .map(Duration::from_nanos)
                .map_err(|_| E::custom("interval must not be negative"))
        }
    }
}
