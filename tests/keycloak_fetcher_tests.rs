//! Keycloak JWKS source against a mock server.

mod common;

use common::{key_store, PUBLIC_PEM};
use jwts_service::config::KeycloakConfig;
use jwts_service::jwks::{JwksFetcher, JwksPublisher, KeycloakFetcher};
use jwts_service::TokenError;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CERTS_PATH: &str = "/realms/main/protocol/openid-connect/certs";

fn fetcher(server: &MockServer) -> KeycloakFetcher {
    KeycloakFetcher::new(&KeycloakConfig {
        url: server.uri(),
        realm_name: "main".to_string(),
        timeout: Duration::from_secs(5),
        insecure_tls: false,
    })
    .unwrap()
}

fn realm_certs() -> serde_json::Value {
    json!({
        "keys": [
            {
                "kid": "kc-sig",
                "kty": "RSA",
                "alg": "RS256",
                "use": "sig",
                "n": "pVOg",
                "e": "AQAB",
                "x5c": ["MIICmzCCAYMCBgGD"],
                "x5t": "abc",
                "x5t#S256": "def"
            },
            {
                "kid": "kc-enc",
                "kty": "RSA",
                "alg": "RSA-OAEP",
                "use": "enc",
                "n": "sQg",
                "e": "AQAB"
            }
        ]
    })
}

#[tokio::test]
async fn test_fetch_decodes_realm_certs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CERTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(realm_certs()))
        .expect(1)
        .mount(&server)
        .await;

    let jwks = fetcher(&server).fetch_jwks().await.unwrap();

    let kids: Vec<&str> = jwks.keys.iter().map(|k| k.kid.as_str()).collect();
    assert_eq!(kids, vec!["kc-sig", "kc-enc"]);
    assert_eq!(jwks.keys[0].key_use, "sig");
    assert_eq!(jwks.keys[1].alg, "RSA-OAEP");
}

#[tokio::test]
async fn test_missing_fields_default_to_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CERTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"keys": [{"kid": "bare"}]})))
        .mount(&server)
        .await;

    let jwks = fetcher(&server).fetch_jwks().await.unwrap();
    assert_eq!(jwks.keys[0].kid, "bare");
    assert_eq!(jwks.keys[0].n, "");
    assert_eq!(jwks.keys[0].key_use, "");
}

#[tokio::test]
async fn test_error_status_is_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CERTS_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("realm unavailable"))
        .mount(&server)
        .await;

    let err = fetcher(&server).fetch_jwks().await.unwrap_err();
    match err {
        TokenError::Fetch(msg) => {
            assert!(msg.contains("503"), "{msg}");
            assert!(msg.contains("realm unavailable"), "{msg}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_error_body_is_truncated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CERTS_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("x".repeat(64 << 10)))
        .mount(&server)
        .await;

    let err = fetcher(&server).fetch_jwks().await.unwrap_err();
    assert!(err.to_string().len() < 8 << 10);
}

#[tokio::test]
async fn test_malformed_body_is_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CERTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = fetcher(&server).fetch_jwks().await.unwrap_err();
    assert!(matches!(err, TokenError::Fetch(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_fetch_error() {
    let server = MockServer::start().await;
    let fetcher = fetcher(&server);
    drop(server);

    let err = fetcher.fetch_jwks().await.unwrap_err();
    assert!(err.is_startup_fatal());
}

#[tokio::test]
async fn test_publisher_places_realm_keys_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CERTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(realm_certs()))
        .expect(1)
        .mount(&server)
        .await;

    let publisher = JwksPublisher::new(key_store("local", None, Some(PUBLIC_PEM)))
        .with_fetcher(Arc::new(fetcher(&server)));
    publisher.build_once().await.unwrap();
    publisher.build_once().await.unwrap();

    let kids: Vec<&str> = publisher
        .get_set()
        .unwrap()
        .keys
        .iter()
        .map(|k| k.kid.as_str())
        .collect();
    assert_eq!(kids, vec!["kc-sig", "kc-enc", "local"]);
}

#[tokio::test]
async fn test_publisher_failure_caches_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CERTS_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let publisher = JwksPublisher::new(key_store("local", None, Some(PUBLIC_PEM)))
        .with_fetcher(Arc::new(fetcher(&server)));

    let err = publisher.build_once().await.unwrap_err();
    assert!(matches!(err, TokenError::Fetch(_)));
    assert!(publisher.get_set().is_none());
}

#[tokio::test]
async fn test_publisher_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CERTS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(realm_certs())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let publisher = JwksPublisher::new(key_store("local", None, None))
        .with_fetcher(Arc::new(fetcher(&server)))
        .with_fetch_timeout(Duration::from_millis(100));

    let err = publisher.build_once().await.unwrap_err();
    assert!(err.to_string().contains("timed out"), "{err}");
    assert!(publisher.get_set().is_none());
}
