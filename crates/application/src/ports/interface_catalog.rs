//! Interface catalog port
//!
//! Lists, loads and saves interface definitions on the backend.

use async_trait::async_trait;
use sosodesk_domain::{InterfaceDefinition, InterfacePage};

use crate::error::BackendResult;

/// Backend access to stored interface definitions.
#[async_trait]
pub trait InterfaceCatalogService: Send + Sync {
    /// Fetches one page of interface summaries.
    ///
    /// Pages are numbered from 1.
    ///
    /// # Errors
    /// Returns an error if the backend call fails.
    async fn list_page(&self, page: u32, page_size: u32) -> BackendResult<InterfacePage>;

    /// Fetches the full definition of one interface.
    ///
    /// # Errors
    /// Returns `BackendError::NotFound` if the id is unknown.
    async fn get_detail(&self, id: i64) -> BackendResult<InterfaceDefinition>;

    /// Persists a definition.
    ///
    /// Implementations send only the allow-listed save payload.
    ///
    /// # Errors
    /// Returns an error if the backend refuses or the call fails.
    async fn save(&self, id: i64, definition: &InterfaceDefinition) -> BackendResult<()>;
}
