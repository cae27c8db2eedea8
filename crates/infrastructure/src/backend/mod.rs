//! Sosotest backend adapters.
//!
//! - [`SosotestClient`]: reqwest adapter for a live backend
//! - [`InMemoryBackend`]: offline stand-in with scripted debug jobs
//! - [`mock_catalog`]: static rows shown when the catalog cannot be loaded

mod client;
mod in_memory;
pub mod mock_catalog;
mod paths;
pub mod wire;

pub use client::SosotestClient;
pub use in_memory::InMemoryBackend;
pub use paths::BackendPaths;
