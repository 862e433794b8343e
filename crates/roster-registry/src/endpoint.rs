//! Client endpoints
//!
//! TigerStyle: Validated at construction, immutable afterwards.

use crate::error::{RegistryError, RegistryResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol derived from an endpoint URL's scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EndpointType {
    Http,
    Https,
    Grpc,
    Unknown,
}

impl EndpointType {
    /// Classify a URL by case-insensitive scheme prefix
    pub fn classify(url: &str) -> Self {
        let lower = url.to_ascii_lowercase();
        if lower.starts_with("https://") {
            Self::Https
        } else if lower.starts_with("http://") {
            Self::Http
        } else if lower.starts_with("grpc://") {
            Self::Grpc
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for EndpointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Http => "HTTP",
            Self::Https => "HTTPS",
            Self::Grpc => "GRPC",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// A network address a client can be reached at
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Endpoint {
    url: String,
    #[serde(rename = "type")]
    endpoint_type: EndpointType,
}

impl Endpoint {
    /// Create an endpoint, rejecting unsupported schemes
    pub fn new(url: impl Into<String>) -> RegistryResult<Self> {
        let url = url.into();
        let endpoint_type = EndpointType::classify(&url);
        if endpoint_type == EndpointType::Unknown {
            return Err(RegistryError::invalid_endpoint(
                url,
                "unsupported url protocol, expected http://, https:// or grpc://",
            ));
        }
        Ok(Self { url, endpoint_type })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn endpoint_type(&self) -> EndpointType {
        self.endpoint_type
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}
