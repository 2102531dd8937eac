use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::session::SessionContext;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The proxy answered 401; the session has been logged out.
    #[error("session expired")]
    SessionExpired,

    #[error("{status}: {error}")]
    Api {
        status: u16,
        error: String,
        details: Option<String>,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    details: Option<String>,
}

/// Front-end client for the proxy's `/api/*` resources.
#[derive(Debug, Clone)]
pub struct ZeusClient {
    http: Client,
    base_url: String,
}

impl ZeusClient {
    /// Client for the proxy at `base_url`.
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `GET` a resource and decode the normalized payload.
    pub async fn get(
        &self,
        session: &mut SessionContext,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ClientError> {
        self.request(session, Method::GET, path, query, None).await
    }

    /// Send a JSON body with any verb.
    pub async fn send_json(
        &self,
        session: &mut SessionContext,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: &Value,
    ) -> Result<Value, ClientError> {
        self.request(session, method, path, query, Some(body)).await
    }

    /// Permission lists are cached on the session for five minutes.
    pub async fn permissions(
        &self,
        session: &mut SessionContext,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ClientError> {
        let key = cache_key(path, query);
        if let Some(cached) = session.cached_permissions(&key) {
            return Ok(cached.clone());
        }

        let value = self.get(session, path, query).await?;
        session.cache_permissions(key, value.clone());
        Ok(value)
    }

    async fn request(
        &self,
        session: &mut SessionContext,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value, ClientError> {
        let mut req = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .query(query);
        if let Some(token) = session.token() {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let res = req.send().await?;
        let status = res.status();
        let bytes = res.bytes().await?;

        if status == StatusCode::UNAUTHORIZED {
            session.logout();
            return Err(ClientError::SessionExpired);
        }

        if !status.is_success() {
            let (error, details) = match serde_json::from_slice::<ErrorBody>(&bytes) {
                Ok(body) => (body.error, body.details),
                Err(_) => (String::from_utf8_lossy(&bytes).into_owned(), None),
            };
            return Err(ClientError::Api {
                status: status.as_u16(),
                error,
                details,
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn cache_key(path: &str, query: &[(&str, &str)]) -> String {
    let mut key = path.to_string();
    for (k, v) in query {
        key.push_str(&format!("&{k}={v}"));
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_includes_query() {
        assert_eq!(
            cache_key("/api/permisos-area", &[("listado", "1")]),
            "/api/permisos-area&listado=1"
        );
        assert_ne!(
            cache_key("/api/permisos-area", &[("id", "1")]),
            cache_key("/api/permisos-area", &[("id", "2")])
        );
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        assert_eq!(ZeusClient::new("http://proxy/").base_url, "http://proxy");
    }
}
