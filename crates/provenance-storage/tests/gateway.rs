//! Integration tests for the gateway fetcher against a mock HTTP server.

use std::time::Duration;

use provenance_storage::{GatewayConfig, GatewayFetcher, ManifestFetcher, StorageError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(server: &MockServer) -> GatewayFetcher {
    let config = GatewayConfig::default()
        .with_gateway_url(format!("{}/ipfs/", server.uri()))
        .with_timeout_secs(1)
        .with_max_manifest_bytes(64);
    GatewayFetcher::new(config).expect("fetcher build")
}

#[tokio::test]
async fn content_uri_goes_through_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ipfs/bafymanifest"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"version":"1.0"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let body = fetcher(&server).fetch("ipfs://bafymanifest").await.unwrap();
    assert_eq!(&body[..], br#"{"version":"1.0"}"#);
}

#[tokio::test]
async fn http_uri_is_fetched_directly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/manifests/a.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let uri = format!("{}/manifests/a.json", server.uri());
    let body = fetcher(&server).fetch(&uri).await.unwrap();
    assert_eq!(&body[..], b"{}");
}

#[tokio::test]
async fn unsupported_scheme_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = fetcher(&server).fetch("ar://sometx").await.unwrap_err();
    assert!(matches!(err, StorageError::UnsupportedUriScheme(_)));
}

#[tokio::test]
async fn missing_document_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = fetcher(&server).fetch("ipfs://bafygone").await.unwrap_err();
    assert_eq!(err, StorageError::NotFound("ipfs://bafygone".into()));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = fetcher(&server).fetch("ipfs://bafyx").await.unwrap_err();
    assert!(err.is_transient(), "got {err:?}");
}

#[tokio::test]
async fn slow_gateway_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{}")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = fetcher(&server).fetch("ipfs://bafyslow").await.unwrap_err();
    assert!(matches!(err, StorageError::UpstreamUnavailable(_)));
}

#[tokio::test]
async fn oversized_document_is_refused() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 65]))
        .mount(&server)
        .await;

    let err = fetcher(&server).fetch("ipfs://bafybig").await.unwrap_err();
    assert!(matches!(err, StorageError::TooLarge { limit: 64, .. }));
}
