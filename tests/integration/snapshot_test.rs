//! Integration tests for the price snapshot fetcher against a mock HTTP API

use cc_ticker::config::SnapshotConfig;
use cc_ticker::snapshot::{SnapshotError, SnapshotPriceFetcher, SnapshotSource};
use cc_ticker::ticker::Symbol;
use rust_decimal_macros::dec;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-key";

fn fetcher(server: &MockServer) -> SnapshotPriceFetcher {
    let config = SnapshotConfig {
        base_url: server.uri(),
        timeout_secs: None,
    };
    SnapshotPriceFetcher::new(&config, API_KEY).unwrap()
}

fn symbols(names: &[&str]) -> Vec<Symbol> {
    names.iter().map(|s| Symbol::from(*s)).collect()
}

#[tokio::test]
async fn test_load_tickers_reshapes_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/pricemulti"))
        .and(query_param("fsyms", "BTC,ETH"))
        .and(query_param("tsyms", "USD"))
        .and(query_param("api_key", API_KEY))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"BTC":{"USD":50000},"ETH":{"USD":3000}}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let prices = assert_ok!(fetcher(&server).load_tickers(&symbols(&["BTC", "ETH"])).await);

    assert_eq!(prices.len(), 2);
    assert_eq!(prices.get("BTC"), Some(&dec!(50000)));
    assert_eq!(prices.get("ETH"), Some(&dec!(3000)));
}

#[tokio::test]
async fn test_unknown_symbol_is_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/pricemulti"))
        .and(query_param("fsyms", "BTC,XYZ"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"BTC":{"USD":50000}}"#))
        .mount(&server)
        .await;

    let prices = fetcher(&server)
        .load_tickers(&symbols(&["BTC", "XYZ"]))
        .await
        .unwrap();

    assert_eq!(prices.len(), 1);
    assert_eq!(prices.get("BTC"), Some(&dec!(50000)));
    assert!(!prices.contains_key("XYZ"));
}

#[tokio::test]
async fn test_empty_input_sends_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(0)
        .mount(&server)
        .await;

    let result = fetcher(&server).load_tickers(&[]).await;
    assert!(matches!(result, Err(SnapshotError::NoSymbols)));
}

#[tokio::test]
async fn test_api_error_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/pricemulti"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"Response":"Error","Message":"You are over your rate limit please upgrade your account!","HasWarning":false,"Type":99,"RateLimit":{},"Data":{}}"#,
        ))
        .mount(&server)
        .await;

    match fetcher(&server).load_tickers(&symbols(&["BTC"])).await {
        Err(SnapshotError::Api(message)) => assert!(message.contains("rate limit")),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_http_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/pricemulti"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    match fetcher(&server).load_tickers(&symbols(&["BTC"])).await {
        Err(SnapshotError::Status { status, body }) => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body, "upstream down");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_undecodable_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/pricemulti"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = assert_err!(fetcher(&server).load_tickers(&symbols(&["BTC"])).await);
    assert!(matches!(err, SnapshotError::Decode(_)));
}

#[tokio::test]
async fn test_network_failure_hides_api_key() {
    // Nothing listens on port 1
    let config = SnapshotConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        timeout_secs: Some(2),
    };
    let fetcher = SnapshotPriceFetcher::new(&config, "very-secret").unwrap();

    let err = fetcher.load_tickers(&symbols(&["BTC"])).await.unwrap_err();
    assert!(matches!(err, SnapshotError::Request(_)));
    assert!(!err.to_string().contains("very-secret"));
}

#[tokio::test]
async fn test_configured_timeout_applies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/pricemulti"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"BTC":{"USD":1}}"#)
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = SnapshotConfig {
        base_url: server.uri(),
        timeout_secs: Some(1),
    };
    let fetcher = SnapshotPriceFetcher::new(&config, API_KEY).unwrap();
    let result = fetcher.load_tickers(&symbols(&["BTC"])).await;
    assert!(matches!(result, Err(SnapshotError::Request(_))));
}

#[tokio::test]
async fn test_usable_as_trait_object() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/pricemulti"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"SOL":{"USD":142.25}}"#))
        .mount(&server)
        .await;

    let source: Box<dyn SnapshotSource> = Box::new(fetcher(&server));
    let prices = source.load_tickers(&symbols(&["SOL"])).await.unwrap();
    assert_eq!(prices.get("SOL"), Some(&dec!(142.25)));
}
