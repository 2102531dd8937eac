//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{to_bytes, Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};

use zeus_proxy::config::ProxyConfig;
use zeus_proxy::{HttpServer, Shutdown};

/// One request as the backend saw it.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Captured {
    /// Decoded query pairs in wire order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        url::form_urlencoded::parse(self.query.as_deref().unwrap_or_default().as_bytes())
            .into_owned()
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
    /// Hold the answer this long.
    pub delay: Option<Duration>,
}

impl Reply {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: Some("application/json".into()),
            body: body.into(),
            delay: None,
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: Some("text/plain; charset=utf-8".into()),
            body: body.into(),
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Default)]
struct Shared {
    calls: Vec<Captured>,
    reply: Option<Reply>,
}

/// Programmable backend that records every request it receives.
#[derive(Clone)]
pub struct MockBackend {
    addr: SocketAddr,
    shared: Arc<Mutex<Shared>>,
}

impl MockBackend {
    pub async fn start(reply: Reply) -> Self {
        let shared = Arc::new(Mutex::new(Shared {
            calls: Vec::new(),
            reply: Some(reply),
        }));
        let app = Router::new()
            .fallback(record)
            .with_state(shared.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, shared }
    }

    /// Base URL for a resource served under `path`.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn calls(&self) -> usize {
        self.shared.lock().unwrap().calls.len()
    }

    pub fn last(&self) -> Captured {
        self.shared
            .lock()
            .unwrap()
            .calls
            .last()
            .cloned()
            .expect("backend was never called")
    }

    pub fn set_reply(&self, reply: Reply) {
        self.shared.lock().unwrap().reply = Some(reply);
    }
}

async fn record(State(shared): State<Arc<Mutex<Shared>>>, req: Request) -> Response {
    let (parts, body) = req.into_parts();
    let body = to_bytes(body, usize::MAX).await.unwrap_or_default();

    let reply = {
        let mut shared = shared.lock().unwrap();
        shared.calls.push(Captured {
            method: parts.method,
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
            headers: parts.headers,
            body,
        });
        shared.reply.clone().unwrap_or_else(|| Reply::json(200, "[]"))
    };

    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }
    let mut response = Response::builder()
        .status(StatusCode::from_u16(reply.status).unwrap());
    if let Some(content_type) = reply.content_type {
        response = response.header(header::CONTENT_TYPE, content_type);
    }
    response
        .body(Body::from(reply.body))
        .unwrap()
        .into_response()
}

/// A running proxy bound to an ephemeral port.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub updates: mpsc::UnboundedSender<ProxyConfig>,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_proxy(config: ProxyConfig) -> TestProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).expect("valid test config");

    let shutdown = Shutdown::new();
    let rx: broadcast::Receiver<()> = shutdown.subscribe();
    let (updates, update_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let _ = server.run(listener, update_rx, rx).await;
    });

    TestProxy {
        addr,
        shutdown,
        updates,
    }
}

/// Client that never goes through a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
