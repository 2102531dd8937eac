//! The single outbound HTTP call.

use std::time::Duration;

use axum::http::{header, HeaderValue};
use reqwest::multipart::{Form, Part};

use crate::config::{TimeoutConfig, UpstreamConfig};
use crate::error::ProxyError;
use crate::routing::BackendTarget;
use crate::upstream::{BackendResponse, ForwardBody, FormPart};

/// Everything needed to issue one backend request.
#[derive(Debug)]
pub struct OutboundCall {
    pub target: BackendTarget,
    /// Forwarded verbatim, never re-derived.
    pub authorization: Option<HeaderValue>,
    pub request_id: Option<String>,
    pub body: ForwardBody,
}

/// Shared, connection-pooling client for every backend.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    upstream_timeout: Duration,
}

impl UpstreamClient {
    /// Build the pooled client with connect and total deadlines.
    pub fn new(timeouts: &TimeoutConfig, upstream: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let upstream_timeout = Duration::from_secs(timeouts.upstream_secs);
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(upstream_timeout)
            .user_agent(upstream.user_agent.clone());
        if !upstream.use_system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            http: builder.build()?,
            upstream_timeout,
        })
    }

    /// Issue the call and buffer the response body.
    pub async fn send(&self, call: OutboundCall) -> Result<BackendResponse, ProxyError> {
        let OutboundCall {
            target,
            authorization,
            request_id,
            body,
        } = call;

        let mut request = self.http.request(target.method.clone(), target.url.clone());

        if let Some(authorization) = authorization {
            request = request.header(header::AUTHORIZATION, authorization);
        }
        if let Some(request_id) = request_id {
            request = request.header("x-request-id", request_id);
        }

        request = match body {
            ForwardBody::Empty => request,
            ForwardBody::Json(value) => request.json(&value),
            ForwardBody::Multipart(parts) => request.multipart(build_form(parts)?),
            ForwardBody::Raw {
                content_type,
                bytes,
            } => {
                if let Some(content_type) = content_type {
                    request = request.header(header::CONTENT_TYPE, content_type);
                }
                request.body(bytes)
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(&target, e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(&target, e))?;

        Ok(BackendResponse {
            status,
            content_type,
            body,
        })
    }

    fn transport_error(&self, target: &BackendTarget, error: reqwest::Error) -> ProxyError {
        let details = if error.is_timeout() {
            format!(
                "sin respuesta de {} tras {}s",
                target.host_label(),
                self.upstream_timeout.as_secs()
            )
        } else if error.is_connect() {
            format!("no se pudo conectar con {}", target.host_label())
        } else {
            error.to_string()
        };
        ProxyError::Unavailable { details }
    }
}

/// Re-attach every part under its original field name and filename.
fn build_form(parts: Vec<FormPart>) -> Result<Form, ProxyError> {
    let mut form = Form::new();
    for part in parts {
        let mut outbound = Part::bytes(part.data.to_vec());
        if let Some(file_name) = part.file_name {
            outbound = outbound.file_name(file_name);
        }
        if let Some(content_type) = part.content_type {
            outbound = outbound
                .mime_str(&content_type)
                .map_err(|e| ProxyError::InvalidBody(format!("{}: {e}", part.name)))?;
        }
        form = form.part(part.name, outbound);
    }
    Ok(form)
}
