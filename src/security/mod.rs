//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Matched request:
//!     → auth.rs (bearer check for resources with auth = "required")
//!     → request body limit (http/request.rs, 413 when exceeded)
//!     → Pass to target resolution
//! ```
//!
//! # Design Decisions
//! - Fail closed: a required token that is missing never reaches a backend
//! - Tokens are forwarded byte-for-byte, never inspected beyond the scheme

pub mod auth;

pub use auth::{authorize, bearer_token};
