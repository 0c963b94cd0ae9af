//! Streaming ticker client
//!
//! One client owns one streamer connection. Subscriptions live in a registry
//! held by a single driver task, which applies subscribe/unsubscribe commands
//! and inbound frames strictly one at a time.

use super::messages::{describe_type, is_error_type, ControlMessage, Inbound};
use super::queue::{Enqueued, OutboundQueue};
use super::registry::SubscriptionRegistry;
use super::types::{CallbackFault, ConnectionPhase, PriceCallback, Symbol, TickerStats};
use crate::config::StreamConfig;
use crate::telemetry::{self, CounterMetric, DiscardReason, GaugeMetric};
use crate::ws::{OutboundFrame, WsClient, WsMessage};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

const FAULT_CHANNEL_CAPACITY: usize = 64;

enum Command {
    Subscribe {
        symbol: Symbol,
        callback: PriceCallback,
    },
    Unsubscribe {
        symbol: Symbol,
    },
    Symbols {
        reply: oneshot::Sender<Vec<Symbol>>,
    },
}

/// Live aggregate index prices for subscribed symbols
///
/// Subscribe and unsubscribe never block and never fail; they are applied in
/// call order by the driver task. Callbacks run on the driver task, one after
/// another, so a slow callback delays every later update.
pub struct StreamingTickerClient {
    commands: mpsc::UnboundedSender<Command>,
    stats: Arc<Mutex<TickerStats>>,
    phase: watch::Receiver<ConnectionPhase>,
    faults: broadcast::Sender<CallbackFault>,
    driver: JoinHandle<()>,
}

impl StreamingTickerClient {
    /// Open the streamer connection and start dispatching
    ///
    /// Must be called inside a tokio runtime.
    pub fn connect(config: &StreamConfig, api_key: &str) -> Self {
        let ws = WsClient::new(config.ws_config(api_key));
        tracing::info!(url = %config.url, "Opening ticker stream");
        let (ws_rx, ws_tx) = ws.connect_bidirectional();
        Self::with_transport(ws_rx, ws_tx)
    }

    /// Run the client over an existing transport
    ///
    /// `ws_rx` carries frames and status events in the shape produced by
    /// [`WsClient::connect_bidirectional`]; `ws_tx` accepts outbound frames
    /// stamped with the session they were written for. Nothing is written to
    /// `ws_tx` until a `Connected` event arrives.
    pub fn with_transport(
        ws_rx: mpsc::Receiver<WsMessage>,
        ws_tx: mpsc::UnboundedSender<OutboundFrame>,
    ) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (phase_tx, phase) = watch::channel(ConnectionPhase::Connecting);
        let (faults, _) = broadcast::channel(FAULT_CHANNEL_CAPACITY);
        let stats = Arc::new(Mutex::new(TickerStats::default()));

        let driver = Driver {
            registry: SubscriptionRegistry::new(),
            queue: OutboundQueue::new(),
            phase: ConnectionPhase::Connecting,
            sessions: 0,
            session: 0,
            ws_tx,
            stats: Arc::clone(&stats),
            phase_tx,
            faults: faults.clone(),
        };
        let driver = tokio::spawn(driver.run(command_rx, ws_rx));

        Self {
            commands,
            stats,
            phase,
            faults,
            driver,
        }
    }

    /// Deliver aggregate index prices for `symbol` to `callback`
    ///
    /// Earlier callbacks for the same symbol keep receiving updates. Sends one
    /// `SubAdd` upstream, or parks it until the connection is ready.
    pub fn subscribe_to_ticker<F>(&self, symbol: impl Into<Symbol>, callback: F)
    where
        F: Fn(Decimal) + Send + Sync + 'static,
    {
        self.submit(Command::Subscribe {
            symbol: symbol.into(),
            callback: Arc::new(callback),
        });
    }

    /// Drop every callback for `symbol` and send one `SubRemove` upstream
    pub fn unsubscribe_from_ticker(&self, symbol: impl Into<Symbol>) {
        self.submit(Command::Unsubscribe {
            symbol: symbol.into(),
        });
    }

    /// Symbols with at least one callback, after every earlier call has applied
    pub async fn subscribed_symbols(&self) -> Vec<Symbol> {
        let (reply, rx) = oneshot::channel();
        self.submit(Command::Symbols { reply });
        rx.await.unwrap_or_default()
    }

    /// Counter snapshot
    pub fn stats(&self) -> TickerStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current connection phase
    pub fn phase(&self) -> ConnectionPhase {
        *self.phase.borrow()
    }

    /// Receive faults raised by panicking callbacks from now on
    pub fn faults(&self) -> broadcast::Receiver<CallbackFault> {
        self.faults.subscribe()
    }

    /// Stop the driver and close the connection
    pub async fn shutdown(self) {
        let Self {
            commands, driver, ..
        } = self;
        drop(commands);
        if let Err(e) = driver.await {
            tracing::warn!(error = %e, "Ticker driver ended abnormally");
        }
    }

    fn submit(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::debug!("Ticker driver stopped, command ignored");
        }
    }
}

struct Driver {
    registry: SubscriptionRegistry,
    queue: OutboundQueue,
    phase: ConnectionPhase,
    sessions: u64,
    /// Transport session control frames are currently written for
    session: u64,
    ws_tx: mpsc::UnboundedSender<OutboundFrame>,
    stats: Arc<Mutex<TickerStats>>,
    phase_tx: watch::Sender<ConnectionPhase>,
    faults: broadcast::Sender<CallbackFault>,
}

impl Driver {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut ws_rx: mpsc::Receiver<WsMessage>,
    ) {
        let mut transport_open = true;

        loop {
            tokio::select! {
                // Commands first: a subscribe issued before a frame arrived applies before it
                biased;

                command = commands.recv() => {
                    match command {
                        Some(command) => self.handle_command(command),
                        None => {
                            tracing::debug!("Ticker client dropped, stopping driver");
                            break;
                        }
                    }
                }

                event = ws_rx.recv(), if transport_open => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => {
                            transport_open = false;
                            self.close();
                        }
                    }
                }
            }
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Subscribe { symbol, callback } => {
                let callbacks = self.registry.add(symbol.clone(), callback);
                tracing::debug!(%symbol, callbacks, "Subscribed to ticker");
                self.update_symbol_gauge();
                self.send_control(ControlMessage::add(&symbol));
            }
            Command::Unsubscribe { symbol } => {
                let dropped = self.registry.remove(&symbol);
                tracing::debug!(%symbol, dropped, "Unsubscribed from ticker");
                self.update_symbol_gauge();
                self.send_control(ControlMessage::remove(&symbol));
            }
            Command::Symbols { reply } => {
                let _ = reply.send(self.registry.symbols().cloned().collect());
            }
        }
    }

    fn handle_event(&mut self, event: WsMessage) {
        match event {
            WsMessage::Text(text) => self.handle_frame(&text),
            WsMessage::Binary(data) => {
                tracing::trace!(len = data.len(), "Ignoring binary frame");
                self.discard(DiscardReason::Malformed);
            }
            WsMessage::Connected { session } => self.on_connected(session),
            WsMessage::Reconnecting { attempt } => {
                if self.phase != ConnectionPhase::Reconnecting {
                    self.record(CounterMetric::Reconnecting, 1);
                }
                tracing::warn!(attempt, "Ticker stream lost, reconnecting");
                self.set_phase(ConnectionPhase::Reconnecting);
            }
            WsMessage::Disconnected => {
                tracing::error!(
                    symbols = self.registry.len(),
                    "Ticker stream closed, subscriptions will not receive updates"
                );
                self.close();
            }
        }
    }

    fn on_connected(&mut self, session: u64) {
        self.sessions += 1;
        self.session = session;
        self.record(CounterMetric::Connected, 1);
        self.set_phase(ConnectionPhase::Ready);

        if self.sessions == 1 {
            let pending: Vec<ControlMessage> = self.queue.drain().collect();
            tracing::info!(pending = pending.len(), "Ticker stream ready");
            for message in pending {
                self.write(message);
            }
        } else {
            // The feed forgets subscriptions with the session; the registry is the truth
            let stale = self.queue.clear();
            if stale > 0 {
                self.record(CounterMetric::ControlCancelled, stale as u64);
            }
            let symbols: Vec<Symbol> = self.registry.symbols().cloned().collect();
            tracing::info!(
                session,
                replayed = symbols.len(),
                "Ticker stream reconnected, replaying subscriptions"
            );
            for symbol in &symbols {
                self.write(ControlMessage::add(symbol));
            }
        }

        telemetry::set_gauge(GaugeMetric::QueuedControl, 0.0);
    }

    fn handle_frame(&mut self, text: &str) {
        match Inbound::parse(text) {
            Inbound::Price { symbol, price } => {
                if !self.registry.contains(&symbol) {
                    tracing::trace!(%symbol, "No callbacks for symbol");
                    self.discard(DiscardReason::Unsubscribed);
                    return;
                }

                let outcome = self.registry.dispatch(&symbol, price);
                self.record(CounterMetric::CallbackInvoked, outcome.invoked() as u64);
                self.record(CounterMetric::PriceDispatched, 1);

                for fault in outcome.faults {
                    self.record(CounterMetric::CallbackFault, 1);
                    tracing::warn!(
                        symbol = %fault.symbol,
                        callback = fault.callback_index,
                        message = %fault.message,
                        "Price callback panicked"
                    );
                    // No receivers is fine
                    let _ = self.faults.send(fault);
                }
            }
            Inbound::NoPrice { symbol } => {
                tracing::trace!(%symbol, "Index update without price");
                self.discard(DiscardReason::NoPrice);
            }
            Inbound::Other { kind, detail } => {
                if is_error_type(&kind) {
                    tracing::warn!(
                        kind = %kind,
                        name = describe_type(&kind),
                        detail = detail.as_deref().unwrap_or(""),
                        "Streamer reported an error"
                    );
                } else {
                    tracing::debug!(kind = %kind, name = describe_type(&kind), "Streamer message");
                }
                self.discard(DiscardReason::OtherType);
            }
            Inbound::Malformed => {
                tracing::trace!(len = text.len(), "Discarding malformed frame");
                self.discard(DiscardReason::Malformed);
            }
        }
    }

    fn send_control(&mut self, message: ControlMessage) {
        match self.phase {
            ConnectionPhase::Ready => {
                self.write(message);
                return;
            }
            ConnectionPhase::Closed => {
                tracing::debug!(
                    symbol = %message.symbol(),
                    "Stream closed, control message dropped"
                );
                self.record(CounterMetric::ControlCancelled, 1);
                return;
            }
            ConnectionPhase::Connecting | ConnectionPhase::Reconnecting => {}
        }

        self.record(CounterMetric::ControlQueued, 1);
        match self.queue.push(message) {
            Enqueued::Queued => {}
            Enqueued::Superseded { dropped } => {
                tracing::debug!(dropped, "Queued subscription cancelled before sending");
                self.record(CounterMetric::ControlCancelled, dropped as u64);
            }
        }
        telemetry::set_gauge(GaugeMetric::QueuedControl, self.queue.len() as f64);
    }

    fn write(&mut self, message: ControlMessage) {
        let text = match message.to_json() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode control message");
                return;
            }
        };

        if self.ws_tx.send(OutboundFrame::new(self.session, text)).is_err() {
            tracing::warn!(symbol = %message.symbol(), "Transport gone, control message dropped");
            self.close();
            return;
        }

        tracing::debug!(
            action = ?message.action,
            symbol = %message.symbol(),
            "Sent control message"
        );
        self.record(CounterMetric::ControlSent, 1);
    }

    fn discard(&self, reason: DiscardReason) {
        self.record(CounterMetric::Discarded(reason), 1);
    }

    /// The transport is gone for good; nothing queued will ever be sent
    fn close(&mut self) {
        self.set_phase(ConnectionPhase::Closed);
        let dropped = self.queue.clear();
        if dropped > 0 {
            self.record(CounterMetric::ControlCancelled, dropped as u64);
            telemetry::set_gauge(GaugeMetric::QueuedControl, 0.0);
        }
    }

    fn set_phase(&mut self, phase: ConnectionPhase) {
        self.phase = phase;
        self.phase_tx.send_replace(phase);
    }

    fn update_symbol_gauge(&self) {
        telemetry::set_gauge(GaugeMetric::SubscribedSymbols, self.registry.len() as f64);
    }

    /// Bump both the exported metric and the in-process counter
    fn record(&self, metric: CounterMetric, value: u64) {
        telemetry::increment(metric, value);

        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        let field = match metric {
            CounterMetric::PriceDispatched => &mut stats.dispatched,
            CounterMetric::CallbackInvoked => &mut stats.callbacks_invoked,
            CounterMetric::CallbackFault => &mut stats.callback_faults,
            CounterMetric::Discarded(DiscardReason::Malformed) => &mut stats.discarded_malformed,
            CounterMetric::Discarded(DiscardReason::OtherType) => &mut stats.discarded_other_type,
            CounterMetric::Discarded(DiscardReason::Unsubscribed) => {
                &mut stats.discarded_unsubscribed
            }
            CounterMetric::Discarded(DiscardReason::NoPrice) => &mut stats.discarded_no_price,
            CounterMetric::ControlSent => &mut stats.control_sent,
            CounterMetric::ControlQueued => &mut stats.control_queued,
            CounterMetric::ControlCancelled => &mut stats.control_cancelled,
            CounterMetric::Connected => &mut stats.connects,
            CounterMetric::Reconnecting => &mut stats.reconnects,
            CounterMetric::SnapshotRequest | CounterMetric::SnapshotFailure => return,
        };
        *field += value;
    }
}
