//! Backend route table.

use serde::{Deserialize, Serialize};

/// Paths of the backend endpoints, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackendPaths {
    /// `GET`, query `page`, `pageSize`.
    pub interface_list: String,
    /// `GET`, query `id`.
    pub interface_detail: String,
    /// `POST`, JSON save payload.
    pub interface_save: String,
    /// `POST`, JSON submit request.
    pub debug_submit: String,
    /// `GET`, query `debugId`.
    pub debug_result: String,
    /// `GET`, query `httpConfKey`.
    pub environment_list: String,
}

impl Default for BackendPaths {
    fn default() -> Self {
        Self {
            interface_list: "/api/interface/list".to_string(),
            interface_detail: "/api/interface/detail".to_string(),
            interface_save: "/api/interface/save".to_string(),
            debug_submit: "/api/debug/submit".to_string(),
            debug_result: "/api/debug/result".to_string(),
            environment_list: "/api/environment/list".to_string(),
        }
    }
}
