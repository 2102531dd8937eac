//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers and layers produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!     → spans.rs (per-request span carrying the request ID)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint
//! ```

pub mod logging;
pub mod metrics;
pub mod spans;
