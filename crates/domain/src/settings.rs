//! Client settings
//!
//! Backend location, polling budget and layout preferences.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Panel sizes remembered between sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutPreferences {
    /// Sidebar width in pixels.
    #[serde(default = "default_sidebar_width")]
    pub sidebar_width: u32,

    /// Response panel height in pixels.
    #[serde(default = "default_response_height")]
    pub response_panel_height: u32,
}

fn default_sidebar_width() -> u32 {
    280
}

fn default_response_height() -> u32 {
    320
}

impl Default for LayoutPreferences {
    fn default() -> Self {
        Self {
            sidebar_width: default_sidebar_width(),
            response_panel_height: default_response_height(),
        }
    }
}

/// Settings for the workbench.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Backend base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for a single backend call.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Wait between debug polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Poll budget per run.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Catalog page size.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Scope used when deriving tab ids.
    #[serde(default = "default_collection_id")]
    pub collection_id: String,

    /// Remembered panel sizes.
    #[serde(default)]
    pub layout: LayoutPreferences,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

const fn default_request_timeout_ms() -> u64 {
    15_000
}

const fn default_poll_interval_ms() -> u64 {
    1_200
}

const fn default_max_attempts() -> u32 {
    18
}

const fn default_page_size() -> u32 {
    20
}

fn default_collection_id() -> String {
    "default".to_string()
}

impl ClientSettings {
    /// Poll interval as a `Duration`.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Request timeout as a `Duration`.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
            page_size: default_page_size(),
            collection_id: default_collection_id(),
            layout: LayoutPreferences::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_settings() {
        let settings = ClientSettings::default();
        assert_eq!(settings.poll_interval(), Duration::from_millis(1200));
        assert_eq!(settings.max_attempts, 18);
        assert_eq!(settings.layout.sidebar_width, 280);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: ClientSettings =
            serde_json::from_str(r#"{"base_url":"http://soso:9000","max_attempts":5}"#).unwrap();
        assert_eq!(settings.base_url, "http://soso:9000");
        assert_eq!(settings.max_attempts, 5);
        assert_eq!(settings.poll_interval_ms, 1200);
        assert_eq!(settings.layout, LayoutPreferences::default());
    }
}
