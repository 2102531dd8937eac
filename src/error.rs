//! Error kinds surfaced to the browser.
//!
//! Every failure a handler can hit is one of these variants. Each renders as
//! the normalized error envelope `{ error, details?, status }`, so nothing
//! escapes the handler boundary as a bare transport fault.

use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Message used for every `401` coming from a backend.
pub const TOKEN_EXPIRED: &str = "token expirado";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProxyError {
    #[error("parámetro requerido")]
    MissingParam(String),

    #[error("cuerpo inválido")]
    InvalidBody(String),

    #[error("acción no soportada")]
    UnknownAction(String),

    #[error("ruta inválida")]
    InvalidSubpath(String),

    #[error("token no proporcionado")]
    MissingToken,

    #[error("{}", TOKEN_EXPIRED)]
    TokenExpired { details: Option<String> },

    #[error("servicio no disponible")]
    Unavailable { details: String },

    /// Non-2xx answer from the backend, message already extracted.
    #[error("{message}")]
    Backend { status: u16, message: String },

    #[error("respuesta inválida del servicio")]
    InvalidResponse { details: String },

    #[error("recurso no encontrado")]
    NotFound(String),

    #[error("método no permitido")]
    MethodNotAllowed(Method),

    #[error("cuerpo demasiado grande")]
    PayloadTooLarge(usize),
}

impl ProxyError {
    /// HTTP status sent to the browser.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingParam(_)
            | ProxyError::InvalidBody(_)
            | ProxyError::UnknownAction(_)
            | ProxyError::InvalidSubpath(_) => StatusCode::BAD_REQUEST,
            ProxyError::MissingToken | ProxyError::TokenExpired { .. } => StatusCode::UNAUTHORIZED,
            ProxyError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Backend { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ProxyError::InvalidResponse { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::NotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Optional `details` field of the envelope.
    pub fn details(&self) -> Option<String> {
        match self {
            ProxyError::MissingParam(name) => Some(name.clone()),
            ProxyError::InvalidBody(reason) => Some(reason.clone()),
            ProxyError::UnknownAction(action) => Some(action.clone()),
            ProxyError::InvalidSubpath(path) => Some(path.clone()),
            ProxyError::TokenExpired { details } => details.clone(),
            ProxyError::Unavailable { details } => Some(details.clone()),
            ProxyError::InvalidResponse { details } => Some(details.clone()),
            ProxyError::NotFound(path) => Some(path.clone()),
            ProxyError::MethodNotAllowed(method) => Some(method.to_string()),
            ProxyError::PayloadTooLarge(limit) => Some(format!("límite de {limit} bytes")),
            ProxyError::MissingToken | ProxyError::Backend { .. } => None,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::MissingParam(_)
            | ProxyError::InvalidBody(_)
            | ProxyError::UnknownAction(_)
            | ProxyError::InvalidSubpath(_)
            | ProxyError::PayloadTooLarge(_) => "client_input",
            ProxyError::MissingToken => "missing_token",
            ProxyError::TokenExpired { .. } => "token_expired",
            ProxyError::Unavailable { .. } => "transport",
            ProxyError::Backend { .. } => "backend",
            ProxyError::InvalidResponse { .. } => "response_shape",
            ProxyError::NotFound(_) | ProxyError::MethodNotAllowed(_) => "routing",
        }
    }

    /// True when the failure came from talking to the backend.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ProxyError::TokenExpired { .. }
                | ProxyError::Unavailable { .. }
                | ProxyError::Backend { .. }
                | ProxyError::InvalidResponse { .. }
        )
    }

    /// The `{ error, details?, status }` envelope.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
            details: self.details(),
            status: self.status().as_u16(),
        }
    }
}

/// The error envelope returned to the browser.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub status: u16,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
