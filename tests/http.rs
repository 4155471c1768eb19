mod common;

use bgremove::config::ConfigOptions;
use bgremove::{Error, Runtime};
use common::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn serve(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

fn remote_config(server: &MockServer) -> bgremove::Config {
    ConfigOptions {
        // no trailing slash: one is added before joining
        public_path: Some(format!("{}/dist", server.uri())),
        ..Default::default()
    }
    .validate()
    .unwrap()
}

#[tokio::test]
async fn model_is_fetched_over_http() {
    let server = MockServer::start().await;
    let model = model_bytes(24);
    let manifest = r#"{
        "/models/medium": {
            "mime": "application/octet-stream",
            "size": 24,
            "chunks": { "aa11": [0, 9], "bb22": { "range": [10, 23] } }
        }
    }"#;
    serve(&server, "/dist/resources.json", manifest.as_bytes().to_vec()).await;
    serve(&server, "/dist/aa11", model[..10].to_vec()).await;
    serve(&server, "/dist/bb22", model[10..].to_vec()).await;

    let adapter = ConstantMaskAdapter::new(0.5);
    let runtime = Runtime::new(adapter.clone());
    runtime
        .remove_background(sample_png(), &remote_config(&server))
        .await
        .unwrap();

    assert_eq!(adapter.models(), vec![model]);
}

#[tokio::test]
async fn missing_model_key_is_reported() {
    let server = MockServer::start().await;
    serve(&server, "/dist/resources.json", b"{}".to_vec()).await;

    let runtime = Runtime::new(ConstantMaskAdapter::new(0.5));
    let err = runtime.preload(&remote_config(&server)).await.unwrap_err();

    assert!(matches!(err, Error::ResourceNotFound(key) if key == "/models/medium"));
}

#[tokio::test]
async fn malformed_manifest_is_rejected() {
    let server = MockServer::start().await;
    let manifest = r#"{ "/models/medium": { "mime": "application", "size": 1, "chunks": {} } }"#;
    serve(&server, "/dist/resources.json", manifest.as_bytes().to_vec()).await;

    let runtime = Runtime::new(ConstantMaskAdapter::new(0.5));
    let err = runtime.preload(&remote_config(&server)).await.unwrap_err();

    assert!(matches!(err, Error::MalformedResource(_)));
}
