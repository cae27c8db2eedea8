//! Backend connection status shown in the status bar.

use serde::{Deserialize, Serialize};

/// Connection status reported to the status display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Backend reachable and idle.
    #[default]
    Online,
    /// A run is in flight or the last one failed.
    Degraded,
    /// Backend unreachable.
    Offline,
}

impl ConnectionState {
    /// Short label for display.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Degraded => "degraded",
            Self::Offline => "offline",
        }
    }
}
