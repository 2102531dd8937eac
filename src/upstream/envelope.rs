//! Backend response normalization.
//!
//! Backends answer with arrays, plain objects, objects whose `result` field is
//! a JSON document serialized into a string, bare scalars, or plain text.
//! [`BackendEnvelope`] names those shapes and [`normalize`] resolves every one
//! of them into a payload that is always a JSON object or array.

use axum::http::StatusCode;
use serde_json::{json, Map, Value};

use crate::error::ProxyError;
use crate::upstream::BackendResponse;

/// The shape a successful backend body arrived in.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEnvelope {
    Array(Vec<Value>),
    /// Plain JSON object, returned as-is.
    Wrapped(Map<String, Value>),
    /// Parsed content of a string `result` field.
    DoubleEncoded(Value),
    Scalar(Value),
    Text(String),
}

impl BackendEnvelope {
    /// Classify a success body. Fails only when the backend declared JSON and
    /// sent something else.
    pub fn classify(
        content_type: Option<&str>,
        body: &[u8],
        unwrap_result: bool,
    ) -> Result<Self, ProxyError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(BackendEnvelope::Text(String::new()));
        }

        // Parsed from bytes: invalid UTF-8 in a JSON body is a shape error.
        if content_type.is_some_and(is_json_content_type) {
            let value: Value =
                serde_json::from_slice(body).map_err(|e| ProxyError::InvalidResponse {
                    details: e.to_string(),
                })?;
            return Ok(Self::from_value(value, unwrap_result));
        }

        match serde_json::from_slice::<Value>(body) {
            Ok(value) => Ok(Self::from_value(value, unwrap_result)),
            Err(_) => Ok(BackendEnvelope::Text(
                String::from_utf8_lossy(body).into_owned(),
            )),
        }
    }

    fn from_value(value: Value, unwrap_result: bool) -> Self {
        match value {
            Value::Array(items) => BackendEnvelope::Array(items),
            Value::Object(map) => {
                if unwrap_result {
                    if let Some(inner) = decode_result_field(&map) {
                        return BackendEnvelope::DoubleEncoded(inner);
                    }
                }
                BackendEnvelope::Wrapped(map)
            }
            scalar => BackendEnvelope::Scalar(scalar),
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendEnvelope::Array(_) => "array",
            BackendEnvelope::Wrapped(_) => "wrapped",
            BackendEnvelope::DoubleEncoded(_) => "double_encoded",
            BackendEnvelope::Scalar(_) => "scalar",
            BackendEnvelope::Text(_) => "text",
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            BackendEnvelope::Array(items) => Value::Array(items),
            BackendEnvelope::Wrapped(map) => Value::Object(map),
            BackendEnvelope::DoubleEncoded(inner) => inner,
            BackendEnvelope::Scalar(value) => json!({ "result": value }),
            BackendEnvelope::Text(text) => json!({ "result": text }),
        }
    }
}

/// `{"result": "[...]"}` -> the parsed array (or object). Anything that does
/// not look like a JSON document, or fails to parse, leaves the envelope alone.
fn decode_result_field(map: &Map<String, Value>) -> Option<Value> {
    let raw = map.get("result")?.as_str()?.trim();
    let looks_like_json = (raw.starts_with('[') && raw.ends_with(']'))
        || (raw.starts_with('{') && raw.ends_with('}'));
    if !looks_like_json {
        return None;
    }
    serde_json::from_str(raw).ok()
}

/// `application/json`, `text/json`, `application/problem+json`, ...
pub fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.ends_with("/json") || essence.ends_with("+json")
}

/// A successful, normalized payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPayload {
    pub status: StatusCode,
    pub kind: &'static str,
    pub body: Value,
}

/// Turn a raw backend response into either a payload or the error the
/// browser should see.
pub fn normalize(
    response: &BackendResponse,
    unwrap_result: bool,
) -> Result<NormalizedPayload, ProxyError> {
    if !(200..=299).contains(&response.status) {
        return Err(backend_error(response));
    }

    let envelope =
        BackendEnvelope::classify(response.content_type.as_deref(), &response.body, unwrap_result)?;

    // 204 cannot carry the `{ "result": "" }` body.
    let status = match StatusCode::from_u16(response.status) {
        Ok(StatusCode::NO_CONTENT) | Err(_) => StatusCode::OK,
        Ok(status) => status,
    };

    Ok(NormalizedPayload {
        status,
        kind: envelope.kind(),
        body: envelope.into_value(),
    })
}

fn backend_error(response: &BackendResponse) -> ProxyError {
    let text = String::from_utf8_lossy(&response.body).into_owned();
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|value| error_message(&value));

    if response.status == 401 {
        let details = message.or_else(|| (!text.trim().is_empty()).then_some(text));
        return ProxyError::TokenExpired { details };
    }

    let message = message.unwrap_or_else(|| {
        if text.trim().is_empty() {
            StatusCode::from_u16(response.status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("error del servicio")
                .to_string()
        } else {
            text
        }
    });

    ProxyError::Backend {
        status: response.status,
        message,
    }
}

/// `error`, falling back to `message`.
fn error_message(value: &Value) -> Option<String> {
    ["error", "message"]
        .iter()
        .find_map(|key| match value.get(key)? {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Bool(false) => None,
            other => Some(other.to_string()),
        })
}
