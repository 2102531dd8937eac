//! SDK behaviour against a running proxy.

use serde_json::json;
use zeus_sdk::{ClientError, SessionContext, ZeusClient};

use zeus_proxy::config::{AuthPolicy, ProxyConfig, ResourceConfig};

mod common;
use common::{start_proxy, MockBackend, Reply};

fn permisos_config(backend: &MockBackend) -> ProxyConfig {
    let mut resource = ResourceConfig::new(
        "permisos-area",
        "/api/permisos-area",
        backend.url("/permisos/area"),
    );
    resource.auth = AuthPolicy::Required;
    resource.passthrough = vec!["listado".into(), "id".into()];

    let mut config = ProxyConfig::default();
    config.resources.push(resource);
    config
}

#[tokio::test]
async fn expired_token_logs_session_out() {
    let backend = MockBackend::start(Reply::json(401, r#"{"error":"jwt expired"}"#)).await;
    let proxy = start_proxy(permisos_config(&backend)).await;
    let client = ZeusClient::new(&proxy.url(""));

    let mut session = SessionContext::new("stale-token", None);
    session.cache_permissions("otro", json!(["VER"]));

    let err = client
        .get(&mut session, "/api/permisos-area", &[("listado", "1")])
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::SessionExpired));
    assert!(!session.is_authenticated());
    assert!(session.cached_permissions("otro").is_none());
    assert_eq!(backend.last().headers["authorization"], "Bearer stale-token");
}

#[tokio::test]
async fn missing_token_is_also_a_logout() {
    let backend = MockBackend::start(Reply::json(200, "[]")).await;
    let proxy = start_proxy(permisos_config(&backend)).await;
    let client = ZeusClient::new(&proxy.url(""));

    let mut session = SessionContext::anonymous();
    let err = client
        .get(&mut session, "/api/permisos-area", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::SessionExpired));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn permission_list_is_fetched_once() {
    let backend = MockBackend::start(Reply::json(200, r#"["VER","EDITAR"]"#)).await;
    let proxy = start_proxy(permisos_config(&backend)).await;
    let client = ZeusClient::new(&proxy.url(""));
    let mut session = SessionContext::new("valid", None);

    let first = client
        .permissions(&mut session, "/api/permisos-area", &[("id", "3")])
        .await
        .unwrap();
    let second = client
        .permissions(&mut session, "/api/permisos-area", &[("id", "3")])
        .await
        .unwrap();

    assert_eq!(first, json!(["VER", "EDITAR"]));
    assert_eq!(first, second);
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn api_errors_carry_envelope_fields() {
    let backend = MockBackend::start(Reply::json(200, "[]")).await;
    let mut config = permisos_config(&backend);
    config.resources[0].required.insert("GET".into(), vec!["id".into()]);
    let proxy = start_proxy(config).await;
    let client = ZeusClient::new(&proxy.url(""));
    let mut session = SessionContext::new("valid", None);

    let err = client
        .get(&mut session, "/api/permisos-area", &[])
        .await
        .unwrap_err();

    match err {
        ClientError::Api {
            status,
            error,
            details,
        } => {
            assert_eq!(status, 400);
            assert_eq!(error, "parámetro requerido");
            assert_eq!(details.as_deref(), Some("id"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(session.is_authenticated());
}
