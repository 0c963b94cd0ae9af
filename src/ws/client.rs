//! WebSocket client with automatic reconnection

use super::types::{OutboundFrame, WsConfig, WsError, WsMessage};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Reusable WebSocket client with automatic reconnection and ping/pong handling
pub struct WsClient {
    config: WsConfig,
}

impl WsClient {
    /// Create a new WebSocket client with the given configuration
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    /// Create a new client with just a URL using default config
    pub fn with_url(url: impl Into<String>) -> Self {
        Self::new(WsConfig::new(url))
    }

    /// Get the configured URL
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Connect and return both a receiver and a sender for bidirectional communication
    ///
    /// Spawns a background task that owns the socket. The receiver yields text
    /// frames plus status events (`Connected` for every established session,
    /// `Reconnecting` after a loss, `Disconnected` once the task gives up).
    ///
    /// Each frame written to the sender names the session it was meant for
    /// (the number carried by `Connected`); frames for any other session are
    /// dropped, so consumers should resend their state when they see a new
    /// `Connected`. The outbound side is unbounded: writers never wait on the
    /// socket, and the inbound side is only ever held up by its own reader.
    ///
    /// Dropping either half closes the connection.
    pub fn connect_bidirectional(
        &self,
    ) -> (mpsc::Receiver<WsMessage>, mpsc::UnboundedSender<OutboundFrame>) {
        let (msg_tx, msg_rx) = mpsc::channel(self.config.inbound_buffer);
        let (send_tx, send_rx) = mpsc::unbounded_channel();
        let config = self.config.clone();

        tokio::spawn(async move {
            if let Err(e) = Self::run_connection_loop(config, msg_tx, send_rx).await {
                tracing::error!(error = %e, "WebSocket connection loop failed");
            }
        });

        (msg_rx, send_tx)
    }

    /// Run the connection loop with automatic reconnection
    async fn run_connection_loop(
        config: WsConfig,
        tx: mpsc::Sender<WsMessage>,
        mut send_rx: mpsc::UnboundedReceiver<OutboundFrame>,
    ) -> Result<(), WsError> {
        let mut reconnect_attempts = 0;
        let mut reconnect_delay = config.initial_reconnect_delay;
        let mut session = 0u64;

        loop {
            match Self::open(&config).await {
                Ok(ws_stream) => {
                    // A session was established, so backoff starts over
                    reconnect_attempts = 0;
                    reconnect_delay = config.initial_reconnect_delay;
                    session += 1;

                    let outcome =
                        Self::run_session(ws_stream, session, &config, &tx, &mut send_rx).await;
                    match outcome {
                        Ok(()) => {
                            tracing::info!("WebSocket consumer dropped, connection closed");
                            return Ok(());
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "WebSocket session lost");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        url = %config.redacted_url(),
                        "WebSocket connect failed"
                    );
                }
            }

            reconnect_attempts += 1;

            // Check max reconnects (0 = infinite)
            if config.max_reconnect_attempts > 0
                && reconnect_attempts > config.max_reconnect_attempts
            {
                tracing::error!(
                    max = config.max_reconnect_attempts,
                    "Max reconnection attempts reached"
                );
                let _ = tx.send(WsMessage::Disconnected).await;
                return Err(WsError::MaxReconnectsExceeded);
            }

            if tx.is_closed() {
                tracing::info!("Receiver dropped, stopping reconnection");
                return Ok(());
            }

            tracing::info!(
                attempt = reconnect_attempts,
                delay_ms = reconnect_delay.as_millis() as u64,
                "WebSocket reconnecting"
            );
            let _ = tx
                .send(WsMessage::Reconnecting {
                    attempt: reconnect_attempts,
                })
                .await;

            sleep(reconnect_delay).await;
            reconnect_delay = (reconnect_delay * 2).min(config.max_reconnect_delay);
        }
    }

    async fn open(config: &WsConfig) -> Result<WsStream, WsError> {
        tracing::info!(url = %config.redacted_url(), "Connecting to WebSocket");

        let (ws_stream, _response) = connect_async(config.url.as_str())
            .await
            .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;

        Ok(ws_stream)
    }

    /// Pump one session until it fails (`Err`) or the consumer goes away (`Ok`)
    async fn run_session(
        ws_stream: WsStream,
        session: u64,
        config: &WsConfig,
        tx: &mpsc::Sender<WsMessage>,
        send_rx: &mut mpsc::UnboundedReceiver<OutboundFrame>,
    ) -> Result<(), WsError> {
        let (mut write, mut read) = ws_stream.split();

        tracing::info!(session, "WebSocket connected");

        if tx.send(WsMessage::Connected { session }).await.is_err() {
            return Ok(());
        }

        let mut keepalive = (!config.ping_interval.is_zero()).then(|| {
            let mut interval = tokio::time::interval(config.ping_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });
        let mut ping_sent_at: Option<Instant> = None;

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if tx.send(WsMessage::Text(text)).await.is_err() {
                                tracing::debug!("Receiver dropped, closing connection");
                                let _ = write.send(Message::Close(None)).await;
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Binary(data))) => {
                            if tx.send(WsMessage::Binary(data)).await.is_err() {
                                tracing::debug!("Receiver dropped, closing connection");
                                let _ = write.send(Message::Close(None)).await;
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await
                                .map_err(|e| WsError::SendFailed(e.to_string()))?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            ping_sent_at = None;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(?frame, "Received close frame");
                            return Err(WsError::ClosedByServer);
                        }
                        Some(Ok(Message::Frame(_))) => {}
                        Some(Err(e)) => {
                            return Err(WsError::ConnectionFailed(e.to_string()));
                        }
                        None => {
                            return Err(WsError::ConnectionFailed(
                                "Stream ended unexpectedly".into(),
                            ));
                        }
                    }
                }

                frame = send_rx.recv() => {
                    match frame {
                        Some(frame) if frame.session != session => {
                            tracing::debug!(
                                session,
                                frame_session = frame.session,
                                "Discarded outbound frame from previous session"
                            );
                        }
                        Some(frame) => {
                            write.send(Message::Text(frame.text)).await
                                .map_err(|e| WsError::SendFailed(e.to_string()))?;
                        }
                        None => {
                            tracing::debug!("Sender dropped, closing connection");
                            let _ = write.send(Message::Close(None)).await;
                            return Ok(());
                        }
                    }
                }

                _ = next_ping(&mut keepalive) => {
                    match ping_sent_at {
                        Some(sent) if sent.elapsed() >= config.pong_timeout => {
                            return Err(WsError::PongTimeout);
                        }
                        Some(_) => {}
                        None => {
                            write.send(Message::Ping(Vec::new())).await
                                .map_err(|e| WsError::SendFailed(e.to_string()))?;
                            ping_sent_at = Some(Instant::now());
                        }
                    }
                }
            }
        }
    }
}

/// Next keepalive tick; never resolves when keepalive is off
async fn next_ping(keepalive: &mut Option<Interval>) {
    match keepalive {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
