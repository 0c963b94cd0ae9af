//! Integration tests for the streaming ticker against a local WebSocket server

use cc_ticker::config::StreamConfig;
use cc_ticker::ticker::{ConnectionPhase, StreamingTickerClient};
use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_hdr_async, WebSocketStream};

type ServerSocket = WebSocketStream<TcpStream>;

const WELCOME: &str = r#"{"TYPE":"20","MESSAGE":"STREAMERWELCOME","SERVER_UPTIME_SECONDS":1}"#;

fn stream_config(addr: std::net::SocketAddr) -> StreamConfig {
    StreamConfig {
        url: format!("ws://{}/v2", addr),
        initial_reconnect_delay_ms: 10,
        max_reconnect_delay_ms: 50,
        ..Default::default()
    }
}

async fn accept(listener: &TcpListener, uri: Arc<Mutex<Option<String>>>) -> ServerSocket {
    let (stream, _) = listener.accept().await.unwrap();
    let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        *uri.lock().unwrap() = Some(req.uri().to_string());
        Ok(resp)
    };
    accept_hdr_async(stream, callback).await.unwrap()
}

/// Next text frame from the client, parsed as JSON
async fn next_control(ws: &mut ServerSocket) -> Value {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).unwrap(),
            Some(Ok(_)) => continue,
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}

fn price_frame(symbol: &str, price: &str) -> Message {
    Message::Text(format!(
        r#"{{"TYPE":"5","MARKET":"CCCAGG","FROMSYMBOL":"{}","TOSYMBOL":"USD","FLAGS":1,"PRICE":{},"LASTUPDATE":1700000000}}"#,
        symbol, price
    ))
}

#[tokio::test]
async fn test_live_prices_and_reconnect_replay() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let uri = Arc::new(Mutex::new(None));

    let client = StreamingTickerClient::connect(&stream_config(addr), "integration-key");
    let (price_tx, mut prices) = mpsc::unbounded_channel();
    client.subscribe_to_ticker("BTC", move |price: Decimal| {
        let _ = price_tx.send(price);
    });

    tokio::time::timeout(Duration::from_secs(10), async {
        // First session: queued SubAdd arrives once the socket opens
        let mut ws = accept(&listener, Arc::clone(&uri)).await;
        ws.send(Message::Text(WELCOME.to_string())).await.unwrap();

        let control = next_control(&mut ws).await;
        assert_eq!(control["action"], "SubAdd");
        assert_eq!(control["subs"][0], "5~CCCAGG~BTC~USD");

        ws.send(price_frame("ETH", "3000")).await.unwrap();
        ws.send(price_frame("BTC", "50000.25")).await.unwrap();
        assert_eq!(prices.recv().await, Some(dec!(50000.25)));

        // Drop the session without a close frame
        drop(ws);

        // Second session: the registry is replayed
        let mut ws = accept(&listener, Arc::clone(&uri)).await;
        let control = next_control(&mut ws).await;
        assert_eq!(control["action"], "SubAdd");
        assert_eq!(control["subs"][0], "5~CCCAGG~BTC~USD");

        ws.send(price_frame("BTC", "50100")).await.unwrap();
        assert_eq!(prices.recv().await, Some(dec!(50100)));

        client.unsubscribe_from_ticker("BTC");
        let control = next_control(&mut ws).await;
        assert_eq!(control["action"], "SubRemove");
        assert_eq!(control["subs"][0], "5~CCCAGG~BTC~USD");
    })
    .await
    .expect("timed out");

    let seen = uri.lock().unwrap().clone().unwrap();
    assert_eq!(seen, "/v2?api_key=integration-key");

    let stats = client.stats();
    assert_eq!(stats.connects, 2);
    assert!(stats.reconnects >= 1);
    assert!(stats.dispatched >= 2);
    assert_eq!(client.phase(), ConnectionPhase::Ready);
    assert!(client.subscribed_symbols().await.is_empty());

    client.shutdown().await;
}

#[tokio::test]
async fn test_gives_up_after_max_reconnects() {
    // Bind then drop to get a port nothing listens on
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let config = StreamConfig {
        max_reconnect_attempts: 2,
        ..stream_config(addr)
    };
    let client = StreamingTickerClient::connect(&config, "k");
    client.subscribe_to_ticker("BTC", |_: Decimal| {});

    tokio::time::timeout(Duration::from_secs(10), async {
        while client.phase() != ConnectionPhase::Closed {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("client never gave up");

    // Registry survives; the parked add is dropped with the transport
    assert_eq!(client.subscribed_symbols().await.len(), 1);
    let stats = client.stats();
    assert_eq!(stats.connects, 0);
    assert_eq!(stats.control_sent, 0);
    assert_eq!(stats.control_cancelled, 1);

    client.shutdown().await;
}

#[tokio::test]
async fn test_subscribe_burst_with_chatty_server() {
    const SYMBOLS: usize = 600;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Every SubAdd is answered with an ack and a price, like the real streamer
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener, Arc::new(Mutex::new(None))).await;
        for _ in 0..SYMBOLS {
            let control = next_control(&mut ws).await;
            let sub = control["subs"][0].as_str().unwrap().to_string();
            let symbol = sub.split('~').nth(2).unwrap().to_string();
            let ack = format!(
                r#"{{"TYPE":"16","MESSAGE":"SUBSCRIBECOMPLETE","SUB":"{}"}}"#,
                sub
            );
            ws.send(Message::Text(ack)).await.unwrap();
            ws.send(price_frame(&symbol, "1.5")).await.unwrap();
        }
        ws
    });

    let config = StreamConfig {
        inbound_buffer: 4,
        ..stream_config(addr)
    };
    let client = StreamingTickerClient::connect(&config, "k");

    let delivered = Arc::new(AtomicUsize::new(0));
    for i in 0..SYMBOLS {
        let delivered = Arc::clone(&delivered);
        client.subscribe_to_ticker(format!("C{}", i), move |_: Decimal| {
            delivered.fetch_add(1, Ordering::Relaxed);
        });
    }

    let _ws = tokio::time::timeout(Duration::from_secs(20), server)
        .await
        .expect("server never saw every subscription")
        .unwrap();

    tokio::time::timeout(Duration::from_secs(10), async {
        while delivered.load(Ordering::Relaxed) < SYMBOLS {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("prices stopped flowing");

    assert_eq!(client.subscribed_symbols().await.len(), SYMBOLS);
    let stats = client.stats();
    assert_eq!(stats.control_sent, SYMBOLS as u64);
    assert_eq!(stats.discarded_other_type, SYMBOLS as u64);

    tokio::time::timeout(Duration::from_secs(5), client.shutdown())
        .await
        .expect("shutdown hung");
}
