//! Resource lookup by local path.
//!
//! # Responsibilities
//! - Compile `ResourceConfig`s into ready-to-use resources
//! - Map an inbound path to its resource (and optional sub-path)
//!
//! # Design Decisions
//! - Immutable after construction; swapped whole on config reload
//! - Longest path wins, so `/api/permisos-area` never shadows a longer path
//! - Explicit `None` rather than a silent default resource

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Method;
use url::Url;

use crate::config::validation::ValidationError;
use crate::config::{AuthPolicy, ResourceConfig};
use crate::routing::param_map::ParamMap;

/// A resource with its verbs, URL and maps pre-parsed.
#[derive(Debug, Clone)]
pub struct Resource {
    pub config: ResourceConfig,
    pub base_url: Url,
    pub methods: Vec<Method>,
    pub upstream_methods: HashMap<Method, Method>,
    pub param_maps: Vec<ParamMap>,
}

impl Resource {
    /// Parse the base URL, verbs and parameter maps of one resource.
    pub fn compile(config: ResourceConfig) -> Result<Self, ValidationError> {
        let invalid_url = || ValidationError::InvalidBaseUrl {
            name: config.name.clone(),
            url: config.base_url.clone(),
        };
        let base_url = Url::parse(&config.base_url).map_err(|_| invalid_url())?;
        if base_url.cannot_be_a_base() {
            return Err(invalid_url());
        }

        let parse_verb = |verb: &str, field: &'static str| {
            Method::from_bytes(verb.as_bytes()).map_err(|_| ValidationError::UnknownVerb {
                name: config.name.clone(),
                verb: verb.to_string(),
                field,
            })
        };

        let methods = config
            .methods
            .iter()
            .map(|verb| parse_verb(verb, "methods"))
            .collect::<Result<Vec<_>, _>>()?;

        let mut upstream_methods = HashMap::new();
        for (inbound, outbound) in &config.upstream_methods {
            upstream_methods.insert(
                parse_verb(inbound, "upstream_methods")?,
                parse_verb(outbound, "upstream_methods")?,
            );
        }

        let param_maps = config.param_maps.iter().map(ParamMap::from_config).collect();

        Ok(Self {
            base_url,
            methods,
            upstream_methods,
            param_maps,
            config,
        })
    }

    /// Resource name used in logs and metric labels.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Whether the resource serves this inbound verb.
    pub fn allows(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    /// True for `auth = "required"` resources.
    pub fn requires_auth(&self) -> bool {
        self.config.auth == AuthPolicy::Required
    }

    /// Outbound verb for an inbound one.
    pub fn upstream_method(&self, method: &Method) -> Method {
        self.upstream_methods
            .get(method)
            .cloned()
            .unwrap_or_else(|| method.clone())
    }

    /// `Access-Control-Allow-Methods` value.
    pub fn allow_methods_header(&self) -> String {
        let mut verbs: Vec<&str> = self.methods.iter().map(Method::as_str).collect();
        if !verbs.contains(&"OPTIONS") {
            verbs.push("OPTIONS");
        }
        verbs.join(", ")
    }
}

/// Result of a path lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub resource: Arc<Resource>,
    /// Remainder after the resource path, without leading/trailing slashes.
    pub subpath: Option<String>,
}

#[derive(Debug, Default)]
pub struct ResourceRegistry {
    /// Sorted by path length, longest first.
    resources: Vec<Arc<Resource>>,
}

impl ResourceRegistry {
    /// Compile every resource, collecting all errors.
    pub fn from_config(configs: &[ResourceConfig]) -> Result<Self, Vec<ValidationError>> {
        let mut resources = Vec::with_capacity(configs.len());
        let mut errors = Vec::new();
        for config in configs {
            match Resource::compile(config.clone()) {
                Ok(resource) => resources.push(Arc::new(resource)),
                Err(e) => errors.push(e),
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        resources.sort_by(|a, b| b.config.path.len().cmp(&a.config.path.len()));
        Ok(Self { resources })
    }

    /// Resource owning `path`, longest configured path first.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch> {
        let path = path.trim_end_matches('/');
        for resource in &self.resources {
            let base = resource.config.path.as_str();
            if path == base {
                return Some(RouteMatch {
                    resource: resource.clone(),
                    subpath: None,
                });
            }
            if resource.config.subpaths {
                if let Some(rest) = path.strip_prefix(base).and_then(|r| r.strip_prefix('/')) {
                    let rest = rest.trim_matches('/');
                    return Some(RouteMatch {
                        resource: resource.clone(),
                        subpath: (!rest.is_empty()).then(|| rest.to_string()),
                    });
                }
            }
        }
        None
    }

    /// Resources in lookup order.
    pub fn resources(&self) -> impl Iterator<Item = &Arc<Resource>> {
        self.resources.iter()
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
