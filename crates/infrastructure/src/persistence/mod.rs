//! File-backed persistence: client settings and the local key-value cache.

mod local_cache;
mod settings_repository;

use std::path::PathBuf;

use serde::Serialize;

pub use local_cache::{CacheError, ENV_SELECTION_PREFIX, LAYOUT_KEY, LocalCache};
pub use settings_repository::{
    ENV_BASE_URL, ENV_MAX_ATTEMPTS, ENV_POLL_INTERVAL_MS, SettingsError, SettingsRepository,
    apply_env_overrides,
};

/// Returns the sosodesk config directory.
#[must_use]
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sosodesk"))
}

/// Pretty JSON with a trailing newline, so hand edits diff cleanly.
fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}
