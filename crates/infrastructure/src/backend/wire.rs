//! Wire format of the sosotest backend.
//!
//! Every response is an envelope `{"code": i64, "message": str, "body": any}`
//! where code `10000` means success. The debug result endpoint also uses the
//! code to say "still running", so poll envelopes are never rejected here.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sosodesk_application::ports::{DEBUG_SUCCESS_CODE, DebugJobId, DebugResult, PollResponse};
use sosodesk_application::{BackendError, BackendResult};
use sosodesk_domain::{
    EnvironmentEntry, EnvironmentGroup, InterfaceDefinition, InterfacePage, InterfaceSummary,
    ResponseHeader,
};

/// Response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Status code; [`DEBUG_SUCCESS_CODE`] on success.
    pub code: i64,
    /// Human message.
    #[serde(default, alias = "msg")]
    pub message: String,
    /// Payload.
    #[serde(default)]
    pub body: Value,
}

impl Envelope {
    /// A success envelope around `body`.
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self {
            code: DEBUG_SUCCESS_CODE,
            message: "success".to_string(),
            body,
        }
    }

    /// A failure envelope.
    #[must_use]
    pub fn fail(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            body: Value::Null,
        }
    }

    /// Returns true for the success code.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code == DEBUG_SUCCESS_CODE
    }

    /// Returns the payload of a success envelope.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Rejected` for any other code.
    pub fn into_success(self) -> BackendResult<Value> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(BackendError::Rejected {
                code: self.code,
                message: self.message,
            })
        }
    }

    /// Decodes the payload of a success envelope.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Rejected` for a failure code and
    /// `BackendError::Decode` if the payload has the wrong shape.
    pub fn into_body<T: DeserializeOwned>(self) -> BackendResult<T> {
        let body = self.into_success()?;
        serde_json::from_value(body).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

/// Payload of the interface list endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBody {
    /// Rows on this page.
    #[serde(default, alias = "list", alias = "items")]
    pub data_list: Vec<InterfaceDefinition>,
    /// Total row count, if the backend reports it.
    #[serde(default)]
    pub total: Option<u64>,
    /// Explicit continuation flag, if the backend reports it.
    #[serde(default)]
    pub has_more: Option<bool>,
}

impl ListBody {
    /// Converts to a catalog page.
    ///
    /// Without an explicit flag, another page is assumed while the total is
    /// not reached, or, with no total either, while pages come back full.
    #[must_use]
    pub fn into_page(self, page: u32, page_size: u32) -> InterfacePage {
        let received = self.data_list.len() as u64;
        let has_more = self.has_more.unwrap_or_else(|| match self.total {
            Some(total) => u64::from(page) * u64::from(page_size) < total,
            None => received >= u64::from(page_size) && received > 0,
        });
        InterfacePage {
            items: self.data_list.iter().map(InterfaceSummary::from).collect(),
            has_more,
        }
    }
}

/// One environment as the backend lists it.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEnvironment {
    /// Selection identity.
    #[serde(alias = "configKey")]
    pub conf_key: String,
    /// Display label.
    #[serde(default, alias = "label")]
    pub alias: String,
    /// Base address.
    #[serde(default)]
    pub request_addr: String,
    /// Group tag.
    #[serde(default)]
    pub group: EnvironmentGroup,
}

impl From<WireEnvironment> for EnvironmentEntry {
    fn from(wire: WireEnvironment) -> Self {
        let label = if wire.alias.is_empty() {
            wire.conf_key.clone()
        } else {
            wire.alias
        };
        Self::new(wire.conf_key, wire.group, label, wire.request_addr)
    }
}

/// Submit request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    /// Allow-listed definition payload.
    pub interface: serde_json::Map<String, Value>,
    /// Environment config key.
    pub http_conf_key: String,
    /// Environment base address.
    pub request_addr: String,
    /// Client run id.
    pub run_id: String,
}

/// Extracts the job id from a submit payload: a bare string or number, or an
/// object with `debugId`.
#[must_use]
pub fn decode_job_id(body: &Value) -> Option<DebugJobId> {
    let raw = match body {
        Value::Object(map) => map.get("debugId").or_else(|| map.get("id"))?,
        other => other,
    };
    let id = match raw {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!id.is_empty()).then_some(DebugJobId(id))
}

/// Converts a poll envelope. Non-success codes mean "not finished yet".
#[must_use]
pub fn decode_poll(envelope: Envelope) -> PollResponse {
    let result = match &envelope.body {
        Value::Null => None,
        body => Some(decode_result(body)),
    };
    PollResponse {
        code: envelope.code,
        message: envelope.message,
        result,
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())),
    }
}

fn present(value: Option<&Value>) -> Option<Value> {
    value.filter(|v| !v.is_null()).cloned()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn millis(value: Option<&Value>) -> Option<u64> {
    let value = value?;
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
}

fn headers(value: Option<&Value>) -> Vec<ResponseHeader> {
    match value {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(name, value)| {
                let value = value
                    .as_str()
                    .map_or_else(|| value.to_string(), str::to_string);
                ResponseHeader::new(name.clone(), value)
            })
            .collect(),
        Some(Value::Array(rows)) => rows
            .iter()
            .filter_map(|row| {
                let name = row.get("name").or_else(|| row.get("key"))?.as_str()?;
                let value = row.get("value").and_then(Value::as_str).unwrap_or_default();
                Some(ResponseHeader::new(name, value))
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn timing(value: Option<&Value>) -> BTreeMap<String, f64> {
    value
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(phase, v)| v.as_f64().map(|ms| (phase.clone(), ms)))
                .collect()
        })
        .unwrap_or_default()
}

/// Decodes a debug result payload.
#[must_use]
pub fn decode_result(body: &Value) -> DebugResult {
    DebugResult {
        status_code: body
            .get("statusCode")
            .and_then(Value::as_u64)
            .and_then(|c| u16::try_from(c).ok()),
        headers: headers(body.get("headers")),
        raw_body: text(body.get("responseBody")),
        decoded_body: text(body.get("actualResult")),
        duration_ms: millis(body.get("duration").or_else(|| body.get("totalTakeTime"))),
        assert_result: text(body.get("assertResult")),
        vars_pre: present(body.get("varsPre")),
        vars_post: present(body.get("varsPost")),
        timing: timing(body.get("timing")),
        payload: body.clone(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn failure_envelope_is_rejected() {
        let envelope: Envelope =
            serde_json::from_value(json!({"code": 40001, "msg": "locked"})).unwrap();
        assert_eq!(
            envelope.into_success(),
            Err(BackendError::Rejected {
                code: 40001,
                message: "locked".to_string()
            })
        );
    }

    #[test]
    fn wrong_body_shape_is_a_decode_error() {
        let result: BackendResult<InterfaceDefinition> = Envelope::ok(json!([1, 2])).into_body();
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn list_body_uses_total_when_present() {
        let body: ListBody = serde_json::from_value(json!({
            "dataList": [{"id": 1, "method": "POST", "url": "/a"}],
            "total": 3
        }))
        .unwrap();
        let page = body.into_page(1, 2);
        assert!(page.has_more);
        assert_eq!(page.items[0].url, "/a");
    }

    #[test]
    fn list_body_without_total_stops_on_short_page() {
        let body: ListBody =
            serde_json::from_value(json!({"list": [{"id": 1}]})).unwrap();
        assert!(!body.into_page(1, 20).has_more);
    }

    #[test]
    fn environment_rows_map_to_entries() {
        let wire: Vec<WireEnvironment> = serde_json::from_value(json!([
            {"confKey": "test-a", "alias": "Test A", "requestAddr": "http://a", "group": "test"},
            {"confKey": "prod", "requestAddr": "http://p", "group": "online"},
            {"confKey": "odd", "group": "staging"}
        ]))
        .unwrap();
        let entries: Vec<EnvironmentEntry> = wire.into_iter().map(Into::into).collect();

        assert_eq!(entries[0].label, "Test A");
        assert_eq!(entries[1].group, EnvironmentGroup::Online);
        assert_eq!(entries[1].label, "prod");
        assert_eq!(entries[2].group, EnvironmentGroup::Other);
    }

    #[test]
    fn job_id_accepts_several_shapes() {
        assert_eq!(decode_job_id(&json!("abc")), Some(DebugJobId("abc".into())));
        assert_eq!(decode_job_id(&json!(17)), Some(DebugJobId("17".into())));
        assert_eq!(
            decode_job_id(&json!({"debugId": "d-1"})),
            Some(DebugJobId("d-1".into()))
        );
        assert_eq!(decode_job_id(&json!("  ")), None);
        assert_eq!(decode_job_id(&Value::Null), None);
    }

    #[test]
    fn pending_poll_has_no_result() {
        let poll = decode_poll(Envelope::fail(10001, "running"));
        assert_eq!(poll.code, 10001);
        assert!(poll.result.is_none());
        assert!(!poll.is_finished());
    }

    #[test]
    fn finished_poll_decodes_result_fields() {
        let poll = decode_poll(Envelope::ok(json!({
            "statusCode": 201,
            "headers": {"Content-Type": "application/json"},
            "responseBody": "eyJvayI6dHJ1ZX0=",
            "actualResult": {"ok": true},
            "totalTakeTime": 12.6,
            "assertResult": "PASS",
            "varsPre": {"token": "t"},
            "varsPost": null,
            "timing": {"dns": 1.5, "connect": 2.0, "label": "x"}
        })));

        let result = poll.result.unwrap();
        assert!(poll.code == DEBUG_SUCCESS_CODE);
        assert_eq!(result.status_code, Some(201));
        assert_eq!(result.headers, vec![ResponseHeader::new("Content-Type", "application/json")]);
        assert_eq!(result.display_body(), Some("{\n  \"ok\": true\n}"));
        assert_eq!(result.duration_ms, Some(13));
        assert_eq!(result.assert_result.as_deref(), Some("PASS"));
        assert!(result.vars_pre.is_some());
        assert!(result.vars_post.is_none());
        assert_eq!(result.timing.len(), 2);
    }
}
