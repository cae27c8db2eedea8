//! Client settings persistence.
//!
//! Settings live in the platform-specific config directory:
//! - Linux: ~/.config/sosodesk/settings.json
//! - macOS: ~/Library/Application Support/sosodesk/settings.json
//! - Windows: %APPDATA%/sosodesk/settings.json
//!
//! A few values can be overridden from the environment, see
//! [`apply_env_overrides`].

use std::path::PathBuf;

use sosodesk_domain::ClientSettings;
use tokio::fs;
use tracing::debug;


/// Overrides `base_url`.
pub const ENV_BASE_URL: &str = "SOSODESK_BASE_URL";
/// Overrides `poll_interval_ms`.
pub const ENV_POLL_INTERVAL_MS: &str = "SOSODESK_POLL_INTERVAL_MS";
/// Overrides `max_attempts`.
pub const ENV_MAX_ATTEMPTS: &str = "SOSODESK_MAX_ATTEMPTS";

const SETTINGS_FILE: &str = "settings.json";

/// Error type for settings operations.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file is not valid JSON of the right shape.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An environment override could not be parsed.
    #[error("invalid value for {var}: {value:?}")]
    InvalidOverride {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Repository for [`ClientSettings`].
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    dir: Option<PathBuf>,
}

impl SettingsRepository {
    /// Repository in the platform config directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: crate::persistence::config_dir(),
        }
    }

    /// Repository rooted at `dir`.
    #[must_use]
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    fn settings_path(&self) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.join(SETTINGS_FILE))
    }

    /// Loads settings from disk, then applies process environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// an override is malformed.
    pub async fn load(&self) -> Result<ClientSettings, SettingsError> {
        let mut settings = self.load_file().await?;
        apply_env_overrides(&mut settings, |var| std::env::var(var).ok())?;
        Ok(settings)
    }

    /// Loads settings from disk only. Missing file means defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_file(&self) -> Result<ClientSettings, SettingsError> {
        let Some(path) = self.settings_path() else {
            return Ok(ClientSettings::default());
        };
        if !fs::try_exists(&path).await? {
            debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(ClientSettings::default());
        }
        let content = fs::read(&path).await?;
        Ok(serde_json::from_slice(&content)?)
    }
}

impl Default for SettingsRepository {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies `SOSODESK_*` overrides read through `lookup`. Empty values are
/// ignored.
///
/// # Errors
///
/// Returns `SettingsError::InvalidOverride` for non-numeric numbers.
pub fn apply_env_overrides(
    settings: &mut ClientSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), SettingsError> {
    let read = |var: &'static str| lookup(var).filter(|v| !v.trim().is_empty());

    if let Some(base_url) = read(ENV_BASE_URL) {
        settings.base_url = base_url.trim().to_string();
    }
    if let Some(value) = read(ENV_POLL_INTERVAL_MS) {
        settings.poll_interval_ms = value
            .trim()
            .parse()
            .map_err(|_| SettingsError::InvalidOverride {
                var: ENV_POLL_INTERVAL_MS,
                value,
            })?;
    }
    if let Some(value) = read(ENV_MAX_ATTEMPTS) {
        settings.max_attempts = value
            .trim()
            .parse()
            .map_err(|_| SettingsError::InvalidOverride {
                var: ENV_MAX_ATTEMPTS,
                value,
            })?;
    }
    Ok(())
}
