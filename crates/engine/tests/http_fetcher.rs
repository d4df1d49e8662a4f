//! End-to-end tests against a local provider stand-in.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    Json, Router,
    extract::Path,
    http::{HeaderMap, StatusCode, header},
    routing::get,
};
use cep_api::LookupClient;
use cep_engine::provider::builtin;
use cep_engine::{FetchError, HttpFetcher, KeyShape, LookupError, ProviderFetcher, Resolver};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use url::Url;

async fn viacep_found(Path(cep): Path<String>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if accept != "application/json" {
        return (StatusCode::NOT_ACCEPTABLE, Json(json!({})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "cep": format!("{}-{}", &cep[..5], &cep[5..]),
            "logradouro": "Praça da Sé",
            "bairro": "Sé",
            "localidade": "São Paulo",
            "uf": "SP",
            "ibge": "3550308",
            "ddd": "11"
        })),
    )
}

async fn viacep_missing(Path(_cep): Path<String>) -> Json<Value> {
    Json(json!({"erro": true}))
}

async fn slow(Path(_cep): Path<String>) -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({"cep": "01001000"}))
}

async fn html(Path(_cep): Path<String>) -> (StatusCode, &'static str) {
    (StatusCode::OK, "<html><body>maintenance</body></html>")
}

async fn gone(Path(_cep): Path<String>) -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "<html>not here</html>")
}

async fn user_agent(headers: HeaderMap) -> Json<Value> {
    let agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    Json(json!({"user_agent": agent}))
}

async fn spawn_server() -> SocketAddr {
    let router = Router::new()
        .route("/found/ws/{cep}/json/", get(viacep_found))
        .route("/missing/ws/{cep}/json/", get(viacep_missing))
        .route("/slow/ws/{cep}/json/", get(slow))
        .route("/html/{cep}", get(html))
        .route("/gone/{cep}", get(gone))
        .route("/agent", get(user_agent));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
    let address = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    address
}

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(LookupClient::new("entrega-test/1.0").expect("client"))
}

#[tokio::test]
async fn fetcher_sends_headers_and_parses_json() {
    let address = spawn_server().await;
    let token = CancellationToken::new();

    let url = Url::parse(&format!("http://{address}/agent")).unwrap();
    let response = fetcher().fetch(&url, &token).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!({"user_agent": "entrega-test/1.0"}));

    let url = Url::parse(&format!("http://{address}/found/ws/01001000/json/")).unwrap();
    let response = fetcher().fetch(&url, &token).await.unwrap();
    assert_eq!(response.body["localidade"], json!("São Paulo"));
}

#[tokio::test]
async fn fetcher_reports_invalid_json_on_success_status() {
    let address = spawn_server().await;
    let url = Url::parse(&format!("http://{address}/html/01001000")).unwrap();

    let error = fetcher().fetch(&url, &CancellationToken::new()).await.unwrap_err();
    match error {
        FetchError::InvalidBody(message) => assert!(message.contains("status 200"), "{message}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn fetcher_keeps_status_when_error_body_is_not_json() {
    let address = spawn_server().await;
    let url = Url::parse(&format!("http://{address}/gone/01001000")).unwrap();

    let response = fetcher().fetch(&url, &CancellationToken::new()).await.unwrap();
    assert_eq!(response.status, 404);
    assert_eq!(response.body, Value::Null);
}

#[tokio::test]
async fn fetcher_stops_when_cancelled() {
    let address = spawn_server().await;
    let url = Url::parse(&format!("http://{address}/slow/ws/01001000/json/")).unwrap();
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let start = Instant::now();
    assert_eq!(fetcher().fetch(&url, &token).await, Err(FetchError::Cancelled));
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn connection_refused_is_a_request_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let url = Url::parse(&format!("http://{address}/ws/01001000/json/")).unwrap();
    let error = fetcher().fetch(&url, &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(error, FetchError::Request(_)), "{error:?}");
}

#[tokio::test]
async fn resolver_falls_back_past_slow_and_missing_providers() {
    let address = spawn_server().await;
    // brasilapi's path layout does not exist under /missing, so axum answers 404.
    let resolver = Resolver::builder(KeyShape::CEP)
        .provider(builtin::viacep(&format!("http://{address}/slow"), Duration::from_secs(10)).with_timeout(Duration::from_millis(200)))
        .provider(builtin::brasilapi(&format!("http://{address}/missing"), Duration::from_millis(500)))
        .user_agent("entrega-test/1.0")
        .build()
        .expect("valid configuration");
    let start = Instant::now();
    assert_eq!(resolver.resolve("01001-000").await, Err(LookupError::Exhausted));
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "{elapsed:?}");
}

#[tokio::test]
async fn resolver_returns_first_working_provider_over_http() {
    let address = spawn_server().await;
    let resolver = Resolver::builder(KeyShape::CEP)
        .provider(builtin::viacep(&format!("http://{address}/missing"), Duration::from_millis(500)))
        .provider(builtin::viacep(&format!("http://{address}/found"), Duration::from_millis(500)))
        .build();
    // Two providers built from the same constructor share a name.
    assert!(resolver.is_err());

    let renamed = cep_engine::ProviderSpec::new(
        "viacep-mirror",
        Duration::from_millis(500),
        {
            let base = format!("http://{address}/found");
            move |key: &cep_engine::LookupKey| format!("{base}/ws/{key}/json/")
        },
        builtin::transform_viacep,
    );
    let resolver = Resolver::builder(KeyShape::CEP)
        .provider(builtin::viacep(&format!("http://{address}/missing"), Duration::from_millis(500)))
        .provider(renamed)
        .build()
        .expect("valid configuration");

    let resolved = resolver.resolve("01001000").await.expect("mirror resolves");
    assert_eq!(resolved.cep, "01001000");
    assert_eq!(resolved.localidade.as_deref(), Some("São Paulo"));
    assert_eq!(resolved.ibge.as_deref(), Some("3550308"));
}
