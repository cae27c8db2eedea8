//! Backend client implementation using reqwest.
//!
//! [`SosotestClient`] implements the catalog, debug and environment ports
//! against a live sosotest backend.

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Serialize;
use serde_json::Value;
use sosodesk_application::ports::{
    DebugJobId, DebugService, EnvironmentService, InterfaceCatalogService, PlanContext,
    PollResponse,
};
use sosodesk_application::{BackendError, BackendResult};
use sosodesk_domain::{ClientSettings, EnvironmentEntry, InterfaceDefinition, InterfacePage};
use tracing::debug;

use super::paths::BackendPaths;
use super::wire::{Envelope, ListBody, SubmitRequest, WireEnvironment, decode_job_id, decode_poll};

/// HTTP adapter for the sosotest backend.
#[derive(Debug, Clone)]
pub struct SosotestClient {
    client: Client,
    base_url: Url,
    paths: BackendPaths,
    timeout_ms: u64,
}

impl SosotestClient {
    /// Creates a client for `settings.base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be built.
    pub fn new(settings: &ClientSettings) -> BackendResult<Self> {
        let base_url = Url::parse(&settings.base_url).map_err(|e| {
            BackendError::Other(format!("invalid base url {}: {e}", settings.base_url))
        })?;
        let client = Client::builder()
            .user_agent(concat!("sosodesk/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| BackendError::Other(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            paths: BackendPaths::default(),
            timeout_ms: settings.request_timeout_ms,
        })
    }

    /// Replaces the route table.
    #[must_use]
    pub fn with_paths(mut self, paths: BackendPaths) -> Self {
        self.paths = paths;
        self
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> BackendResult<Url> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| BackendError::Other(format!("invalid path {path}: {e}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> BackendResult<Envelope> {
        let url = self.endpoint(path, query)?;
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::map_error(&e, self.timeout_ms))?;
        Self::read_envelope(response, self.timeout_ms).await
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> BackendResult<Envelope> {
        let url = self.endpoint(path, &[])?;
        debug!(%url, "POST");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| Self::map_error(&e, self.timeout_ms))?;
        Self::read_envelope(response, self.timeout_ms).await
    }

    async fn read_envelope(response: Response, timeout_ms: u64) -> BackendResult<Envelope> {
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::map_error(&e, timeout_ms))?;

        if !status.is_success() {
            let message = String::from_utf8_lossy(&bytes).trim().to_string();
            let message = if message.is_empty() {
                status.canonical_reason().unwrap_or_default().to_string()
            } else {
                message
            };
            return Err(if status == reqwest::StatusCode::NOT_FOUND {
                BackendError::NotFound(message)
            } else {
                BackendError::Status {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
    }

    /// Maps reqwest errors to `BackendError`.
    fn map_error(error: &reqwest::Error, timeout_ms: u64) -> BackendError {
        if error.is_timeout() {
            return BackendError::Timeout { timeout_ms };
        }
        if error.is_connect() {
            let host = error
                .url()
                .and_then(Url::host_str)
                .unwrap_or("unknown")
                .to_string();
            return BackendError::Connection(format!("{host}: {error}"));
        }
        if error.is_decode() || error.is_body() {
            return BackendError::Decode(error.to_string());
        }
        BackendError::Other(error.to_string())
    }
}

#[async_trait]
impl InterfaceCatalogService for SosotestClient {
    async fn list_page(&self, page: u32, page_size: u32) -> BackendResult<InterfacePage> {
        let page_text = page.to_string();
        let size_text = page_size.to_string();
        let body: ListBody = self
            .get(
                &self.paths.interface_list,
                &[("page", page_text.as_str()), ("pageSize", size_text.as_str())],
            )
            .await?
            .into_body()?;
        Ok(body.into_page(page, page_size))
    }

    async fn get_detail(&self, id: i64) -> BackendResult<InterfaceDefinition> {
        let id_text = id.to_string();
        let envelope = self
            .get(&self.paths.interface_detail, &[("id", id_text.as_str())])
            .await?;
        if envelope.is_success() && envelope.body.is_null() {
            return Err(BackendError::NotFound(id_text));
        }
        envelope.into_body()
    }

    async fn save(&self, id: i64, definition: &InterfaceDefinition) -> BackendResult<()> {
        let mut payload = definition.save_payload();
        payload.insert("id".to_string(), Value::from(id));
        self.post(&self.paths.interface_save, &payload)
            .await?
            .into_success()
            .map(|_| ())
    }
}

#[async_trait]
impl DebugService for SosotestClient {
    async fn submit(
        &self,
        definition: &InterfaceDefinition,
        plan: &PlanContext,
    ) -> BackendResult<Option<DebugJobId>> {
        let request = SubmitRequest {
            interface: definition.save_payload(),
            http_conf_key: plan.environment_key.clone(),
            request_addr: plan.request_addr.clone(),
            run_id: plan.run_id.clone(),
        };
        let body = self
            .post(&self.paths.debug_submit, &request)
            .await?
            .into_success()?;
        Ok(decode_job_id(&body))
    }

    async fn poll(&self, job: &DebugJobId) -> BackendResult<PollResponse> {
        let envelope = self
            .get(&self.paths.debug_result, &[("debugId", job.0.as_str())])
            .await?;
        Ok(decode_poll(envelope))
    }
}

#[async_trait]
impl EnvironmentService for SosotestClient {
    async fn list(&self, endpoint_key: &str) -> BackendResult<Vec<EnvironmentEntry>> {
        let rows: Vec<WireEnvironment> = self
            .get(&self.paths.environment_list, &[("httpConfKey", endpoint_key)])
            .await?
            .into_body()?;
        Ok(rows.into_iter().map(EnvironmentEntry::from).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keeps_base_and_encodes_query() {
        let client = SosotestClient::new(&ClientSettings::default()).unwrap();
        let url = client
            .endpoint("/api/interface/list", &[("page", "1"), ("q", "a b")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8000/api/interface/list?page=1&q=a+b"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let settings = ClientSettings {
            base_url: "not a url".to_string(),
            ..ClientSettings::default()
        };
        assert!(matches!(
            SosotestClient::new(&settings),
            Err(BackendError::Other(_))
        ));
    }
}
