//! sosodesk infrastructure - adapters and implementations
//!
//! Concrete implementations of the ports defined in the application layer:
//! the sosotest HTTP client, an in-memory backend for offline use, and the
//! settings and cache files.

pub mod adapters;
pub mod backend;
pub mod persistence;

pub use adapters::{LoggingNotifier, SystemClock};
pub use backend::mock_catalog::fallback_catalog;
pub use backend::{BackendPaths, InMemoryBackend, SosotestClient};
pub use persistence::{CacheError, LocalCache, SettingsError, SettingsRepository, config_dir};
