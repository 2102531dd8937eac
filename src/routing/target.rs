//! Backend target resolution.
//!
//! Pure: the same resource, verb, sub-path and query always produce the same
//! [`BackendTarget`], and nothing here touches the network.
//!
//! Outbound query order: action keyword, fixed parameters, mapped
//! parameters, passthrough parameters. The first occurrence of an outbound
//! name wins.

use std::collections::HashSet;

use axum::http::Method;
use url::{form_urlencoded, Url};

use crate::error::ProxyError;
use crate::routing::registry::Resource;

/// Resolved outbound method and URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    pub method: Method,
    pub url: Url,
}

impl BackendTarget {
    /// `host[:port]`, for messages that must not leak query strings.
    pub fn host_label(&self) -> String {
        match (self.url.host_str(), self.url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            _ => self.url.to_string(),
        }
    }
}

/// Inbound query parameters in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// Decode a raw query string, keeping arrival order.
    pub fn parse(query: Option<&str>) -> Self {
        Self(
            query
                .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
                .unwrap_or_default(),
        )
    }

    /// First value for `name` that is non-empty after trimming.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.trim())
            .find(|value| !value.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Compute where and how a request is forwarded.
pub fn resolve_target(
    resource: &Resource,
    method: &Method,
    subpath: Option<&str>,
    query: &QueryParams,
) -> Result<BackendTarget, ProxyError> {
    let config = &resource.config;

    for key in [method.as_str(), "*"] {
        for param in config.required.get(key).into_iter().flatten() {
            if query.get(param).is_none() {
                return Err(ProxyError::MissingParam(param.clone()));
            }
        }
    }

    let mut url = resource.base_url.clone();
    if let Some(subpath) = subpath {
        append_subpath(&mut url, subpath)?;
    }

    let mut pairs = OutboundPairs::default();

    if let Some(action_key) = &config.action_key {
        let requested = config.action_params.iter().find_map(|p| query.get(p));
        let action = match requested {
            Some(keyword) if config.actions.is_empty() => Some(keyword.to_string()),
            Some(keyword) => Some(
                config
                    .actions
                    .get(keyword)
                    .cloned()
                    .ok_or_else(|| ProxyError::UnknownAction(keyword.to_string()))?,
            ),
            None => config.default_actions.get(method.as_str()).cloned(),
        };
        if let Some(action) = action {
            pairs.push(action_key, action);
        }
    }

    for (key, value) in &config.fixed_params {
        pairs.push(key, value.clone());
    }

    for map in &resource.param_maps {
        pairs.push(&map.to, map.resolve(query.get(&map.from)).to_string());
    }

    for name in &config.passthrough {
        if let Some(value) = query.get(name) {
            let outbound = config.rename.get(name).unwrap_or(name);
            pairs.push(outbound, value.to_string());
        }
    }

    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs.0);
    }

    Ok(BackendTarget {
        method: resource.upstream_method(method),
        url,
    })
}

fn append_subpath(url: &mut Url, subpath: &str) -> Result<(), ProxyError> {
    let segments: Vec<&str> = subpath.split('/').filter(|s| !s.is_empty()).collect();
    if segments.iter().any(|s| *s == "." || *s == "..") {
        return Err(ProxyError::InvalidSubpath(subpath.to_string()));
    }
    url.path_segments_mut()
        .map_err(|_| ProxyError::InvalidSubpath(subpath.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(())
}

#[derive(Default)]
struct OutboundPairs(Vec<(String, String)>, HashSet<String>);

impl OutboundPairs {
    fn push(&mut self, key: &str, value: String) {
        if self.1.insert(key.to_string()) {
            self.0.push((key.to_string(), value));
        }
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
