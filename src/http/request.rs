//! Inbound request handling.
//!
//! # Responsibilities
//! - Generate a request ID (UUID v4) for tracing and propagation
//! - Read and classify the body by content type
//! - Enforce the body size limit
//!
//! # Design Decisions
//! - GET/DELETE/HEAD/OPTIONS bodies are never read
//! - Multipart is parsed into parts so it can be rebuilt, never re-encoded by hand
//! - JSON is parsed so malformed bodies fail here with 400, not at the backend

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, Method, Request};
use bytes::Bytes;
use futures_util::stream;
use http_body_util::LengthLimitError;
use multer::Multipart;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::error::ProxyError;
use crate::upstream::{is_json_content_type, FormPart, ForwardBody};

/// Request ID header name.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        id.parse().ok().map(RequestId::new)
    }
}

/// The request ID set by the request ID layer, if any.
pub fn request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Verbs whose body is ignored.
pub fn reads_body(method: &Method) -> bool {
    !matches!(
        *method,
        Method::GET | Method::DELETE | Method::HEAD | Method::OPTIONS
    )
}

/// Read the inbound body into the shape it will be forwarded in.
pub async fn read_body(
    method: &Method,
    headers: &HeaderMap,
    body: Body,
    limit: usize,
) -> Result<ForwardBody, ProxyError> {
    if !reads_body(method) {
        return Ok(ForwardBody::Empty);
    }

    let bytes = axum::body::to_bytes(body, limit).await.map_err(|e| {
        if e.into_inner().is::<LengthLimitError>() {
            ProxyError::PayloadTooLarge(limit)
        } else {
            ProxyError::InvalidBody("no se pudo leer el cuerpo".to_string())
        }
    })?;

    if bytes.is_empty() {
        return Ok(ForwardBody::Empty);
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match content_type.as_deref() {
        Some(ct) if is_multipart(ct) => parse_multipart(ct, bytes).await.map(ForwardBody::Multipart),
        Some(ct) if is_json_content_type(ct) => serde_json::from_slice(&bytes)
            .map(ForwardBody::Json)
            .map_err(|e| ProxyError::InvalidBody(e.to_string())),
        _ => Ok(ForwardBody::Raw {
            content_type,
            bytes,
        }),
    }
}

fn is_multipart(content_type: &str) -> bool {
    content_type
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("multipart/form-data")
}

async fn parse_multipart(content_type: &str, body: Bytes) -> Result<Vec<FormPart>, ProxyError> {
    let boundary =
        multer::parse_boundary(content_type).map_err(|e| ProxyError::InvalidBody(e.to_string()))?;

    let mut multipart = Multipart::new(
        stream::once(async move { Ok::<_, std::io::Error>(body) }),
        boundary,
    );

    let mut parts = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ProxyError::InvalidBody(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(|m| m.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| ProxyError::InvalidBody(e.to_string()))?;

        tracing::trace!(
            field = %name,
            file_name = ?file_name,
            size = data.len(),
            "Multipart field read"
        );

        parts.push(FormPart {
            name,
            file_name,
            content_type,
            data,
        });
    }
    Ok(parts)
}
