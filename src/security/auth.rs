//! Bearer token handling.
//!
//! Tokens are opaque: the proxy never decodes or re-signs them. It only
//! checks that one is present where a resource demands it, and forwards the
//! header exactly as received.

use axum::http::{header, HeaderMap, HeaderValue};

use crate::error::ProxyError;

/// The token of a well-formed `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Apply a resource's auth policy; yields the header to forward.
pub fn authorize(headers: &HeaderMap, required: bool) -> Result<Option<HeaderValue>, ProxyError> {
    if required && bearer_token(headers).is_none() {
        return Err(ProxyError::MissingToken);
    }
    Ok(headers.get(header::AUTHORIZATION).cloned())
}
