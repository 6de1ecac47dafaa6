//! Logical to physical endpoint remapping.

use std::collections::HashMap;

use parking_lot::RwLock;
use shared_types::Endpoint;
use tracing::debug;

/// Rewrites destinations before anything is sent.
///
/// Unmapped endpoints resolve to themselves.
#[derive(Debug, Default)]
pub struct EndpointRouter {
    routes: RwLock<HashMap<Endpoint, Endpoint>>,
}

impl EndpointRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Send traffic for `logical` to `physical` from now on.
    pub fn remap(&self, logical: Endpoint, physical: Endpoint) {
        debug!(%logical, %physical, "Endpoint remapped");
        self.routes.write().insert(logical, physical);
    }

    #[must_use]
    pub fn resolve(&self, endpoint: &Endpoint) -> Endpoint {
        self.routes
            .read()
            .get(endpoint)
            .cloned()
            .unwrap_or_else(|| endpoint.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
