//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound path
//!     → registry.rs (resource lookup, optional sub-path)
//!
//! Resource + verb + query
//!     → target.rs (required params, action keyword, maps, passthrough)
//!     → param_map.rs (free-text value → canonical key)
//!     → BackendTarget (method + URL), or a 400 before any I/O
//! ```
//!
//! # Design Decisions
//! - Resources compiled at load, immutable at runtime
//! - Target resolution is a pure function
//! - One declarative `ResourceConfig` per route instead of per-route code

pub mod param_map;
pub mod registry;
pub mod target;

pub use registry::{Resource, ResourceRegistry, RouteMatch};
pub use target::{resolve_target, BackendTarget, QueryParams};
