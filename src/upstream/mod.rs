//! Outbound side of the proxy.
//!
//! # Data Flow
//! ```text
//! BackendTarget + ForwardBody + Authorization
//!     → client.rs (single reqwest call, deadline enforced)
//!     → BackendResponse (status, content-type, bytes)
//!     → envelope.rs (classify + normalize)
//!     → NormalizedPayload | ProxyError
//! ```
//!
//! No retries: a failed call is reported once.

pub mod client;
pub mod envelope;

use bytes::Bytes;
use serde_json::Value;

pub use client::{OutboundCall, UpstreamClient};
pub use envelope::{is_json_content_type, normalize, BackendEnvelope, NormalizedPayload};

/// One part of a multipart form, as received from the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Request body in the form it will be re-sent.
#[derive(Debug, Clone, PartialEq)]
pub enum ForwardBody {
    Empty,
    /// Re-serialized with `Content-Type: application/json`.
    Json(Value),
    /// Rebuilt as a fresh form; the transport picks the boundary.
    Multipart(Vec<FormPart>),
    /// Any other content type, bytes untouched.
    Raw {
        content_type: Option<String>,
        bytes: Bytes,
    },
}

impl ForwardBody {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardBody::Empty => "empty",
            ForwardBody::Json(_) => "json",
            ForwardBody::Multipart(_) => "multipart",
            ForwardBody::Raw { .. } => "raw",
        }
    }
}

/// What the backend sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}
