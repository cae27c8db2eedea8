//! Sosodesk Application - Use cases and ports
//!
//! This crate holds the workbench core: the tab store that reconciles drafts
//! with backend definitions, the debug executor that polls server-side jobs,
//! the environment resolver and the interface catalog. Collaborators are
//! reached only through the traits in [`ports`].

pub mod cancellation;
pub mod catalog;
pub mod debug_executor;
pub mod environment_resolver;
pub mod error;
pub mod ports;
pub mod store;

#[cfg(test)]
mod fakes;

pub use cancellation::{CancellationReceiver, CancellationToken};
pub use catalog::{CatalogPager, InterfaceCatalog, PageOutcome};
pub use debug_executor::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL, DebugError, DebugExecutor, DebugOptions,
    DebugOutcome,
};
pub use environment_resolver::EnvironmentResolver;
pub use error::{BackendError, BackendResult, EnvironmentLoadError, HydrationError, SaveError};
pub use store::{
    CloseOutcome, HydrateOutcome, RunOutcome, SaveOutcome, SkipReason, StoreConfig, StoreDeps,
    StoreEvent, TabStore, TabView,
};
