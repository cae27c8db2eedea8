//! Deployable environments and the default-selection rules.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DomainError, DomainResult};

/// Classification of an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentGroup {
    /// Production. Listed but never selectable.
    Online,
    /// Shared test environment.
    #[default]
    Test,
    /// Developer machine.
    Local,
    /// Anything the backend labels differently.
    #[serde(other)]
    Other,
}

impl EnvironmentGroup {
    /// Returns true for the production group.
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Online)
    }
}

/// One deployable target for an endpoint key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentEntry {
    /// Group classification.
    pub group: EnvironmentGroup,
    /// Human label.
    pub label: String,
    /// Base request address.
    pub request_addr: String,
    /// Selection identity.
    pub config_key: String,
}

impl EnvironmentEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(
        config_key: impl Into<String>,
        group: EnvironmentGroup,
        label: impl Into<String>,
        request_addr: impl Into<String>,
    ) -> Self {
        Self {
            group,
            label: label.into(),
            request_addr: request_addr.into(),
            config_key: config_key.into(),
        }
    }

    /// Joins a request path onto this environment's address.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidUrl` if the address or the joined result
    /// is not a valid URL.
    pub fn resolve(&self, path: &str) -> DomainResult<Url> {
        let mut base = Url::parse(&self.request_addr)
            .map_err(|e| DomainError::InvalidUrl(format!("{e}: {}", self.request_addr)))?;
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path.trim_start_matches('/'))
            .map_err(|e| DomainError::InvalidUrl(format!("{e}: {path}")))
    }
}

/// An entry as offered to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentOption {
    /// The entry itself.
    pub entry: EnvironmentEntry,
    /// Production entries are shown but cannot be picked.
    pub disabled: bool,
}

/// Drops repeated config keys, keeping the first occurrence.
#[must_use]
pub fn dedupe_by_key(entries: &[EnvironmentEntry]) -> Vec<EnvironmentEntry> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter(|e| seen.insert(e.config_key.as_str()))
        .cloned()
        .collect()
}

/// Builds the option list, disabling production entries.
#[must_use]
pub fn build_options(entries: &[EnvironmentEntry]) -> Vec<EnvironmentOption> {
    dedupe_by_key(entries)
        .into_iter()
        .map(|entry| EnvironmentOption {
            disabled: entry.group.is_production(),
            entry,
        })
        .collect()
}

/// Picks the default selection.
///
/// The remembered key wins while it still exists and is not production;
/// otherwise the first non-production option; otherwise nothing.
#[must_use]
pub fn pick_default(options: &[EnvironmentOption], remembered: Option<&str>) -> Option<String> {
    remembered
        .and_then(|key| {
            options
                .iter()
                .find(|o| o.entry.config_key == key && !o.disabled)
        })
        .or_else(|| options.iter().find(|o| !o.disabled))
        .map(|o| o.entry.config_key.clone())
}
