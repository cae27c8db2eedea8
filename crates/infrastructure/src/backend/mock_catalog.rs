//! Static catalog shown when the backend cannot be reached.

use sosodesk_domain::{EnvironmentEntry, EnvironmentGroup, InterfaceDefinition, InterfaceSummary};

/// Endpoint key shared by every fallback interface.
pub const FALLBACK_ENDPOINT_KEY: &str = "demo-service";

#[allow(clippy::too_many_arguments)]
fn interface(
    id: i64,
    code: &str,
    title: &str,
    method: &str,
    url: &str,
    headers: &str,
    params: &str,
    body: &str,
) -> InterfaceDefinition {
    InterfaceDefinition {
        interface_code: code.to_string(),
        title: title.to_string(),
        headers: headers.to_string(),
        params: params.to_string(),
        body_content: body.to_string(),
        body_type: if body.is_empty() { String::new() } else { "json".to_string() },
        endpoint_key: FALLBACK_ENDPOINT_KEY.to_string(),
        ..InterfaceDefinition::new(id, method, url)
    }
}

/// Full definitions of the fallback interfaces.
#[must_use]
pub fn fallback_definitions() -> Vec<InterfaceDefinition> {
    vec![
        interface(9001, "DEMO_PING", "Ping", "GET", "/ping", "", "", ""),
        interface(
            9002,
            "DEMO_USER_LIST",
            "List users",
            "GET",
            "/users",
            "Accept: application/json",
            "page=1&size=20",
            "",
        ),
        interface(
            9003,
            "DEMO_USER_CREATE",
            "Create user",
            "POST",
            "/users",
            r#"{"Content-Type":"application/json"}"#,
            "",
            r#"{"name":"demo","email":"demo@example.com"}"#,
        ),
        interface(
            9004,
            "DEMO_ORDER_CANCEL",
            "Cancel order",
            "DELETE",
            "/orders/1001",
            "",
            "reason=test",
            "",
        ),
    ]
}

/// Catalog rows of the fallback interfaces.
#[must_use]
pub fn fallback_catalog() -> Vec<InterfaceSummary> {
    fallback_definitions()
        .iter()
        .map(InterfaceSummary::from)
        .collect()
}

/// Environments for [`FALLBACK_ENDPOINT_KEY`].
#[must_use]
pub fn fallback_environments() -> Vec<EnvironmentEntry> {
    vec![
        EnvironmentEntry::new(
            "demo-local",
            EnvironmentGroup::Local,
            "Local",
            "http://127.0.0.1:9000",
        ),
        EnvironmentEntry::new(
            "demo-test",
            EnvironmentGroup::Test,
            "Shared test",
            "http://test.demo.internal",
        ),
        EnvironmentEntry::new(
            "demo-online",
            EnvironmentGroup::Online,
            "Production",
            "https://api.demo.example",
        ),
    ]
}
