//! Response construction.
//!
//! # Responsibilities
//! - Render normalized payloads with the backend's success status
//! - Answer CORS preflights for resources that enable CORS
//! - Attach `Access-Control-Allow-Origin` to every CORS resource response
//!
//! Error responses are rendered by `ProxyError`'s `IntoResponse`.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::config::CorsConfig;
use crate::routing::Resource;
use crate::upstream::NormalizedPayload;

pub fn payload_response(payload: NormalizedPayload) -> Response {
    (payload.status, Json(payload.body)).into_response()
}

/// `204` with the `Access-Control-Allow-*` headers and no body.
pub fn preflight(resource: &Resource, cors: &CorsConfig) -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    if let Ok(methods) = HeaderValue::from_str(&resource.allow_methods_header()) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, methods);
    }
    if let Ok(allowed) = HeaderValue::from_str(&cors.allow_headers) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, allowed);
    }
    apply_cors(&mut response, cors);
    response
}

pub fn apply_cors(response: &mut Response, cors: &CorsConfig) {
    match HeaderValue::from_str(&cors.allow_origin) {
        Ok(origin) => {
            response
                .headers_mut()
                .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        }
        Err(_) => tracing::warn!(origin = %cors.allow_origin, "Unusable cors.allow_origin"),
    }
}
