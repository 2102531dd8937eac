//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID + trace layers)
//!     → handler.rs (resource lookup, auth, target, forward, normalize)
//!     → request.rs (body classification, size limit)
//!     → response.rs (payload / CORS rendering)
//!     → Send to client
//! ```

pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer, Runtime, ServerError};
