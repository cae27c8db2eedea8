//! Environment service port

use async_trait::async_trait;
use sosodesk_domain::EnvironmentEntry;

use crate::error::BackendResult;

/// Backend access to the environments an endpoint key can run against.
#[async_trait]
pub trait EnvironmentService: Send + Sync {
    /// Lists environments for an endpoint key, in backend order.
    ///
    /// # Errors
    /// Returns an error if the backend call fails.
    async fn list(&self, endpoint_key: &str) -> BackendResult<Vec<EnvironmentEntry>>;
}
