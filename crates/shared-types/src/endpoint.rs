//! # Endpoint
//!
//! An addressable queue destination identified by an absolute URI.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::EndpointError;

/// An absolute queue address, e.g. `msmq://localhost/orders`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint(Url);

impl Endpoint {
    /// Parse an endpoint. Relative references are rejected.
    ///
    /// # Errors
    ///
    /// Returns `EndpointError::NotAbsolute` if `value` is not an absolute URI.
    pub fn parse(value: &str) -> Result<Self, EndpointError> {
        Url::parse(value.trim())
            .map(Self)
            .map_err(|e| EndpointError::NotAbsolute {
                value: value.to_string(),
                reason: e.to_string(),
            })
    }

    /// URI scheme (`msmq`, `memory`, ...).
    #[must_use]
    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    /// Host part, if any.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    /// Queue name: the path without its leading slash.
    #[must_use]
    pub fn queue_name(&self) -> &str {
        self.0.path().trim_start_matches('/')
    }

    /// Derive a sibling queue such as `orders.errors` from `orders`.
    #[must_use]
    pub fn sub_queue(&self, suffix: &str) -> Self {
        self.derive(suffix, '.')
    }

    /// Derive a nested queue such as `orders;errors` from `orders`.
    #[must_use]
    pub fn nested_queue(&self, suffix: &str) -> Self {
        self.derive(suffix, ';')
    }

    fn derive(&self, suffix: &str, separator: char) -> Self {
        let mut url = self.0.clone();
        let name = self.queue_name();
        let path = if name.is_empty() {
            format!("/{suffix}")
        } else {
            format!("/{name}{separator}{suffix}")
        };
        url.set_path(&path);
        Self(url)
    }

    /// Canonical string form, used as queue key by transports.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Endpoint {
    type Error = EndpointError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.0.into()
    }
}
