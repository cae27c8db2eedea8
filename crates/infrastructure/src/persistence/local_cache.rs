//! Local key-value cache.
//!
//! A flat JSON object in `local_cache.json` next to the settings file. It holds
//! small UI state that should survive a restart: the environment remembered
//! per endpoint key (`env.selection.<endpoint key>`) and panel sizes.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::Value;
use sosodesk_domain::LayoutPreferences;
use tokio::fs;
use tracing::warn;

use super::to_pretty_json;

/// Key prefix of remembered environment selections.
pub const ENV_SELECTION_PREFIX: &str = "env.selection.";
/// Key of the layout preferences.
pub const LAYOUT_KEY: &str = "layout";

const CACHE_FILE: &str = "local_cache.json";

/// Error type for cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Could not determine config directory.
    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// File-backed string-keyed JSON values.
#[derive(Debug, Clone)]
pub struct LocalCache {
    path: PathBuf,
    entries: BTreeMap<String, Value>,
}

impl LocalCache {
    /// Opens the cache in the platform config directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no config directory is known or the file cannot
    /// be read.
    pub async fn open_default() -> Result<Self, CacheError> {
        let dir = crate::persistence::config_dir().ok_or(CacheError::NoConfigDir)?;
        Self::open(dir.join(CACHE_FILE)).await
    }

    /// Opens the cache at `path`. A missing file is an empty cache; a file
    /// that does not parse is logged and treated as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();
        let entries = if fs::try_exists(&path).await? {
            let content = fs::read(&path).await?;
            serde_json::from_slice(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "ignoring unreadable local cache");
                BTreeMap::new()
            })
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, entries })
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Remembered environment per endpoint key.
    #[must_use]
    pub fn remembered_environments(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .filter_map(|(key, value)| {
                let endpoint = key.strip_prefix(ENV_SELECTION_PREFIX)?;
                Some((endpoint.to_string(), value.as_str()?.to_string()))
            })
            .collect()
    }

    /// Replaces every remembered environment with `remembered`.
    pub fn set_remembered_environments(&mut self, remembered: &BTreeMap<String, String>) {
        self.entries
            .retain(|key, _| !key.starts_with(ENV_SELECTION_PREFIX));
        for (endpoint, config_key) in remembered {
            self.set(format!("{ENV_SELECTION_PREFIX}{endpoint}"), config_key.as_str());
        }
    }

    /// Stored layout, if any.
    #[must_use]
    pub fn layout(&self) -> Option<LayoutPreferences> {
        serde_json::from_value(self.get(LAYOUT_KEY)?.clone()).ok()
    }

    /// Stores the layout.
    pub fn set_layout(&mut self, layout: LayoutPreferences) {
        if let Ok(value) = serde_json::to_value(layout) {
            self.set(LAYOUT_KEY, value);
        }
    }

    /// Writes the cache to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn flush(&self) -> Result<(), CacheError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).await?;
        }
        let content = to_pretty_json(&self.entries)?;
        fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::open(dir.path().join(CACHE_FILE)).await.unwrap();
        assert!(cache.remembered_environments().is_empty());
        assert!(cache.layout().is_none());
    }

    #[tokio::test]
    async fn values_survive_flush_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CACHE_FILE);
        let mut cache = LocalCache::open(&path).await.unwrap();
        cache.set_remembered_environments(&BTreeMap::from([
            ("svc".to_string(), "test-a".to_string()),
        ]));
        cache.set_layout(LayoutPreferences {
            sidebar_width: 300,
            response_panel_height: 200,
        });
        cache.set("theme", "dark");
        cache.flush().await.unwrap();

        let reopened = LocalCache::open(&path).await.unwrap();

        assert_eq!(
            reopened.remembered_environments(),
            BTreeMap::from([("svc".to_string(), "test-a".to_string())])
        );
        assert_eq!(reopened.get("env.selection.svc").and_then(Value::as_str), Some("test-a"));
        assert_eq!(reopened.layout().unwrap().sidebar_width, 300);
        assert_eq!(reopened.get("theme").and_then(Value::as_str), Some("dark"));
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  \"env.selection.svc\": \"test-a\""));
        assert!(raw.ends_with("}\n"));
    }

    #[tokio::test]
    async fn replacing_remembered_drops_stale_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = LocalCache::open(dir.path().join(CACHE_FILE)).await.unwrap();
        cache.set("env.selection.old", "x");
        cache.set("theme", "dark");

        cache.set_remembered_environments(&BTreeMap::from([
            ("new".to_string(), "y".to_string()),
        ]));

        assert!(cache.get("env.selection.old").is_none());
        assert_eq!(cache.get("theme").and_then(Value::as_str), Some("dark"));
        assert_eq!(cache.remembered_environments().len(), 1);
    }

    #[tokio::test]
    async fn corrupt_file_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE);
        std::fs::write(&path, "[1, 2").unwrap();

        let cache = LocalCache::open(&path).await.unwrap();

        assert!(cache.get("anything").is_none());
    }
}
