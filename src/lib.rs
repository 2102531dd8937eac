//! ZEUS SAFETY API proxy library.
//!
//! Forwards browser requests for each configured resource to its backend
//! service and returns a normalized JSON response.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
