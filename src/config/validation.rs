//! Configuration validation.
//!
//! Serde handles syntax; this module checks what serde cannot: unique
//! resource names and paths, parseable backend URLs, and per-verb tables that
//! only mention verbs the resource actually serves. All problems are
//! reported, not just the first.

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{ProxyConfig, ResourceConfig};

/// Verbs a resource may declare.
pub const KNOWN_VERBS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),
    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),
    #[error("resource `{0}` is declared more than once")]
    DuplicateName(String),
    #[error("path `{path}` is used by both `{first}` and `{second}`")]
    DuplicatePath {
        path: String,
        first: String,
        second: String,
    },
    #[error("resource `{name}`: path `{path}` must start with /api/ and not end with /")]
    InvalidPath { name: String, path: String },
    #[error("resource `{name}`: base_url `{url}` is not an http(s) URL")]
    InvalidBaseUrl { name: String, url: String },
    #[error("resource `{name}`: unknown verb `{verb}` in {field}")]
    UnknownVerb {
        name: String,
        verb: String,
        field: &'static str,
    },
    #[error("resource `{name}`: {field} mentions `{verb}`, which the resource does not serve")]
    UnservedVerb {
        name: String,
        verb: String,
        field: &'static str,
    },
    #[error("resource `{0}`: no methods declared")]
    NoMethods(String),
    #[error("resource `{name}`: param map from `{from}` has an empty default")]
    EmptyMapDefault { name: String, from: String },
    #[error("resource `{0}`: action_params is empty but action_key is set")]
    NoActionParams(String),
}

/// Validate a whole configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("upstream_secs"));
    }

    let mut names = HashSet::new();
    let mut paths: Vec<(&str, &str)> = Vec::new();
    for resource in &config.resources {
        if !names.insert(resource.name.as_str()) {
            errors.push(ValidationError::DuplicateName(resource.name.clone()));
        }
        if let Some((_, first)) = paths.iter().find(|(path, _)| *path == resource.path) {
            errors.push(ValidationError::DuplicatePath {
                path: resource.path.clone(),
                first: first.to_string(),
                second: resource.name.clone(),
            });
        } else {
            paths.push((&resource.path, &resource.name));
        }
        validate_resource(resource, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_resource(resource: &ResourceConfig, errors: &mut Vec<ValidationError>) {
    let name = &resource.name;

    if !resource.path.starts_with("/api/") || resource.path.ends_with('/') {
        errors.push(ValidationError::InvalidPath {
            name: name.clone(),
            path: resource.path.clone(),
        });
    }

    match Url::parse(&resource.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
        _ => errors.push(ValidationError::InvalidBaseUrl {
            name: name.clone(),
            url: resource.base_url.clone(),
        }),
    }

    if resource.methods.is_empty() {
        errors.push(ValidationError::NoMethods(name.clone()));
    }
    for verb in &resource.methods {
        if !KNOWN_VERBS.contains(&verb.as_str()) {
            errors.push(ValidationError::UnknownVerb {
                name: name.clone(),
                verb: verb.clone(),
                field: "methods",
            });
        }
    }

    let served = |verb: &str| resource.methods.iter().any(|m| m == verb);

    // default_actions ships with entries for every common verb, so only
    // unknown verbs are errors there.
    for verb in resource.default_actions.keys() {
        if !KNOWN_VERBS.contains(&verb.as_str()) {
            errors.push(ValidationError::UnknownVerb {
                name: name.clone(),
                verb: verb.clone(),
                field: "default_actions",
            });
        }
    }

    for (field, keys) in [
        ("required", resource.required.keys().collect::<Vec<_>>()),
        ("upstream_methods", resource.upstream_methods.keys().collect()),
    ] {
        for verb in keys {
            if field == "required" && verb == "*" {
                continue;
            }
            if !KNOWN_VERBS.contains(&verb.as_str()) {
                errors.push(ValidationError::UnknownVerb {
                    name: name.clone(),
                    verb: verb.clone(),
                    field,
                });
            } else if !served(verb) {
                errors.push(ValidationError::UnservedVerb {
                    name: name.clone(),
                    verb: verb.clone(),
                    field,
                });
            }
        }
    }

    for target in resource.upstream_methods.values() {
        if !KNOWN_VERBS.contains(&target.as_str()) {
            errors.push(ValidationError::UnknownVerb {
                name: name.clone(),
                verb: target.clone(),
                field: "upstream_methods",
            });
        }
    }

    if resource.action_key.is_some() && resource.action_params.is_empty() {
        errors.push(ValidationError::NoActionParams(name.clone()));
    }

    for map in &resource.param_maps {
        if map.default.trim().is_empty() {
            errors.push(ValidationError::EmptyMapDefault {
                name: name.clone(),
                from: map.from.clone(),
            });
        }
    }
}
