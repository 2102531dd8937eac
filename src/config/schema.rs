//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.
//! Per-verb tables are keyed by the upper-case verb name (`GET`, `POST`, ...);
//! validation checks the keys.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Outbound client settings.
    pub upstream: UpstreamConfig,

    /// CORS headers for resources that enable them.
    pub cors: CorsConfig,

    /// Request limits.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Declarative resource table.
    pub resources: Vec<ResourceConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration for outbound calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Total time allowed for one backend call in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
        }
    }
}

/// Outbound HTTP client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Honor HTTP(S)_PROXY environment variables for backend calls.
    pub use_system_proxy: bool,

    /// User-Agent sent to backends.
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            use_system_proxy: false,
            user_agent: concat!("zeus-proxy/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// CORS response headers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allow_origin: String,
    pub allow_headers: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_headers: "Content-Type, Authorization".to_string(),
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 10 * 1024 * 1024, // 10MB, file uploads go through here
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty output for development, JSON for log shipping.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// How a resource treats the `Authorization` header.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthPolicy {
    /// Forward whatever is present and let the backend decide.
    #[default]
    Forward,
    /// Reject locally with 401 unless a non-empty bearer token is present.
    Required,
}

impl fmt::Display for AuthPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthPolicy::Forward => f.write_str("forward"),
            AuthPolicy::Required => f.write_str("required"),
        }
    }
}

/// Maps a free-text inbound parameter onto a canonical backend key.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParamMapConfig {
    /// Inbound query parameter.
    pub from: String,

    /// Outbound query parameter.
    pub to: String,

    /// Value used when the inbound value is absent or unrecognized.
    pub default: String,

    /// Inbound value -> canonical value. Keys are matched loosely
    /// (case, accents and separators are ignored).
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

/// One proxied resource.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResourceConfig {
    /// Resource identifier for logging/metrics.
    pub name: String,

    /// Local path, e.g. `/api/colaboradores`.
    pub path: String,

    /// Backend base URL.
    pub base_url: String,

    /// Supported inbound verbs.
    #[serde(default = "default_methods")]
    pub methods: Vec<String>,

    #[serde(default)]
    pub auth: AuthPolicy,

    /// Answer OPTIONS and attach `Access-Control-Allow-*` headers.
    #[serde(default)]
    pub cors: bool,

    /// Accept `<path>/<sub/path>` and append the sub-path to `base_url`.
    #[serde(default)]
    pub subpaths: bool,

    /// Outbound name of the action keyword (`metodo`, `method`, ...).
    /// No action keyword is sent when unset.
    #[serde(default)]
    pub action_key: Option<String>,

    /// Inbound parameters carrying the action keyword, first match wins.
    #[serde(default = "default_action_params")]
    pub action_params: Vec<String>,

    /// Inbound keyword -> backend keyword.
    #[serde(default)]
    pub actions: BTreeMap<String, String>,

    /// Verb -> backend keyword used when no action parameter is given.
    #[serde(default = "default_actions")]
    pub default_actions: BTreeMap<String, String>,

    /// Whitelisted query parameters forwarded when present and non-empty.
    #[serde(default)]
    pub passthrough: Vec<String>,

    /// Inbound name -> outbound name for passthrough parameters.
    #[serde(default)]
    pub rename: BTreeMap<String, String>,

    /// Static parameters appended to every outbound call.
    #[serde(default)]
    pub fixed_params: BTreeMap<String, String>,

    #[serde(default)]
    pub param_maps: Vec<ParamMapConfig>,

    /// Verb (or `*`) -> parameters that must be present and non-empty.
    #[serde(default)]
    pub required: BTreeMap<String, Vec<String>>,

    /// Verb -> outbound verb, when the backend expects a different one.
    #[serde(default)]
    pub upstream_methods: BTreeMap<String, String>,

    /// Replace `{"result": "<json>"}` envelopes with their parsed content.
    #[serde(default = "default_true")]
    pub unwrap_result: bool,
}

fn default_methods() -> Vec<String> {
    vec!["GET".to_string()]
}

fn default_action_params() -> Vec<String> {
    vec!["method".to_string(), "metodo".to_string()]
}

fn default_actions() -> BTreeMap<String, String> {
    [
        ("GET", "listar"),
        ("POST", "crear"),
        ("PUT", "actualizar"),
        ("DELETE", "eliminar"),
    ]
    .into_iter()
    .map(|(verb, action)| (verb.to_string(), action.to_string()))
    .collect()
}

fn default_true() -> bool {
    true
}

impl ResourceConfig {
    /// A resource with every optional field at its default.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            base_url: base_url.into(),
            methods: default_methods(),
            auth: AuthPolicy::default(),
            cors: false,
            subpaths: false,
            action_key: None,
            action_params: default_action_params(),
            actions: BTreeMap::new(),
            default_actions: default_actions(),
            passthrough: Vec::new(),
            rename: BTreeMap::new(),
            fixed_params: BTreeMap::new(),
            param_maps: Vec::new(),
            required: BTreeMap::new(),
            upstream_methods: BTreeMap::new(),
            unwrap_result: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_resource_gets_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [[resources]]
            name = "regiones"
            path = "/api/regiones"
            base_url = "http://127.0.0.1:9000/regiones"
            "#,
        )
        .unwrap();

        let resource = &config.resources[0];
        assert_eq!(resource.methods, vec!["GET"]);
        assert_eq!(resource.auth, AuthPolicy::Forward);
        assert_eq!(resource.action_params, vec!["method", "metodo"]);
        assert_eq!(resource.default_actions.get("GET").map(String::as_str), Some("listar"));
        assert!(resource.unwrap_result);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.timeouts.upstream_secs, 30);
    }

    #[test]
    fn param_map_parses() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [[resources]]
            name = "franja-precios"
            path = "/api/franja-precios"
            base_url = "http://127.0.0.1:9000/precios"
            auth = "required"

            [[resources.param_maps]]
            from = "id"
            to = "mercado"
            default = "Malvinas_online"
            values = { FERRETERIA = "Ferreteria_online" }
            "#,
        )
        .unwrap();

        let resource = &config.resources[0];
        assert_eq!(resource.auth, AuthPolicy::Required);
        assert_eq!(resource.param_maps[0].to, "mercado");
        assert_eq!(
            resource.param_maps[0].values.get("FERRETERIA").map(String::as_str),
            Some("Ferreteria_online")
        );
    }
}
