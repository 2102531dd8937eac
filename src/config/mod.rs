//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, env overrides)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → compiled into the server runtime snapshot
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps its runtime snapshot
//! ```

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AuthPolicy, CorsConfig, ListenerConfig, LogFormat, ObservabilityConfig, ParamMapConfig,
    ProxyConfig, ResourceConfig, SecurityConfig, TimeoutConfig, UpstreamConfig,
};
