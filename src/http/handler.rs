//! The generic proxy handler.
//!
//! Every resource goes through the same straight-line pipeline:
//!
//! ```text
//! match path → check verb → auth policy → resolve target
//!     → read body → forward (one call) → normalize → respond
//! ```
//!
//! Each step either hands its output to the next or returns a `ProxyError`;
//! exactly one response is written per request.

use std::future::Future;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    response::{IntoResponse, Response},
};

use crate::error::ProxyError;
use crate::http::request::{read_body, request_id};
use crate::http::response::{apply_cors, payload_response, preflight};
use crate::http::server::{AppState, Runtime};
use crate::observability::metrics;
use crate::routing::{resolve_target, QueryParams, RouteMatch};
use crate::security::authorize;
use crate::upstream::{normalize, OutboundCall};

pub async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let runtime = state.runtime.load_full();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let Some(route) = runtime.registry.match_path(&path) else {
        tracing::warn!(method = %method, path = %path, "No resource matched");
        metrics::record_request("none", &method, 404, start);
        return ProxyError::NotFound(path).into_response();
    };
    let resource = route.resource.clone();

    let mut response = if method == Method::OPTIONS && resource.config.cors {
        preflight(&resource, &runtime.config.cors)
    } else {
        match with_deadline(runtime.request_deadline(), forward(&runtime, &route, request)).await {
            Ok(response) => response,
            Err(error) => {
                log_error(resource.name(), &method, &error);
                if error.is_upstream() {
                    metrics::record_upstream_error(resource.name(), error.kind());
                }
                error.into_response()
            }
        }
    };

    if resource.config.cors {
        apply_cors(&mut response, &runtime.config.cors);
    }

    metrics::record_request(resource.name(), &method, response.status().as_u16(), start);
    response
}

/// Bound a whole forward (body read included) by `deadline`. Expiry is a
/// transport failure, rendered like any other 503.
pub async fn with_deadline<F>(deadline: Duration, forward: F) -> Result<Response, ProxyError>
where
    F: Future<Output = Result<Response, ProxyError>>,
{
    tokio::time::timeout(deadline, forward)
        .await
        .unwrap_or_else(|_| {
            Err(ProxyError::Unavailable {
                details: format!("sin respuesta tras {}s", deadline.as_secs()),
            })
        })
}

async fn forward(
    runtime: &Runtime,
    route: &RouteMatch,
    request: Request<Body>,
) -> Result<Response, ProxyError> {
    let resource = &route.resource;
    let method = request.method().clone();

    if !resource.allows(&method) {
        return Err(ProxyError::MethodNotAllowed(method));
    }

    let authorization = authorize(request.headers(), resource.requires_auth())?;
    let query = QueryParams::parse(request.uri().query());
    let target = resolve_target(resource, &method, route.subpath.as_deref(), &query)?;

    let (parts, body) = request.into_parts();
    let body = read_body(&method, &parts.headers, body, runtime.config.security.max_body_size).await?;

    tracing::debug!(
        resource = %resource.name(),
        method = %target.method,
        backend = %target.host_label(),
        path = %target.url.path(),
        body = body.kind(),
        "Forwarding request"
    );

    let backend = runtime
        .upstream
        .send(OutboundCall {
            target,
            authorization,
            request_id: request_id(&parts.headers),
            body,
        })
        .await?;

    let payload = normalize(&backend, resource.config.unwrap_result)?;

    tracing::debug!(
        resource = %resource.name(),
        status = payload.status.as_u16(),
        envelope = payload.kind,
        "Backend answered"
    );

    Ok(payload_response(payload))
}

fn log_error(resource: &str, method: &Method, error: &ProxyError) {
    let status = error.status().as_u16();
    match error {
        ProxyError::Unavailable { details } => tracing::error!(
            resource = %resource,
            method = %method,
            details = %details,
            "Backend unreachable"
        ),
        ProxyError::InvalidResponse { details } => tracing::error!(
            resource = %resource,
            method = %method,
            details = %details,
            "Backend sent a body that does not match its content type"
        ),
        _ => tracing::warn!(
            resource = %resource,
            method = %method,
            status,
            kind = error.kind(),
            error = %error,
            "Request failed"
        ),
    }
}
