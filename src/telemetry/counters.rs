//! Prometheus counters and gauges

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Why an inbound frame produced no callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Not JSON, or missing `TYPE`/`FROMSYMBOL`
    Malformed,
    /// `TYPE` other than the aggregate index
    OtherType,
    /// No callbacks registered for the symbol
    Unsubscribed,
    /// Aggregate index frame without `PRICE`
    NoPrice,
}

impl DiscardReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DiscardReason::Malformed => "malformed",
            DiscardReason::OtherType => "other_type",
            DiscardReason::Unsubscribed => "unsubscribed",
            DiscardReason::NoPrice => "no_price",
        }
    }
}

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Price update delivered to a symbol's callbacks
    PriceDispatched,
    /// Single callback invocation
    CallbackInvoked,
    /// Callback panicked
    CallbackFault,
    /// Inbound frame dropped
    Discarded(DiscardReason),
    /// Control message written to the socket
    ControlSent,
    /// Control message parked until ready
    ControlQueued,
    /// Parked control message dropped
    ControlCancelled,
    /// Streaming session established
    Connected,
    /// Streaming session lost
    Reconnecting,
    /// Snapshot request issued
    SnapshotRequest,
    /// Snapshot request failed
    SnapshotFailure,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Symbols with at least one callback
    SubscribedSymbols,
    /// Control messages waiting for a session
    QueuedControl,
}

const MESSAGES_DISCARDED: &str = "ccticker_messages_discarded_total";
const SUBSCRIBED_SYMBOLS: &str = "ccticker_subscribed_symbols";
const QUEUED_CONTROL: &str = "ccticker_queued_control_messages";

/// Add `value` to a counter
pub fn increment(metric: CounterMetric, value: u64) {
    let name = match metric {
        CounterMetric::PriceDispatched => "ccticker_prices_dispatched_total",
        CounterMetric::CallbackInvoked => "ccticker_callbacks_invoked_total",
        CounterMetric::CallbackFault => "ccticker_callback_faults_total",
        CounterMetric::Discarded(reason) => {
            counter!(MESSAGES_DISCARDED, "reason" => reason.as_str()).increment(value);
            return;
        }
        CounterMetric::ControlSent => "ccticker_control_sent_total",
        CounterMetric::ControlQueued => "ccticker_control_queued_total",
        CounterMetric::ControlCancelled => "ccticker_control_cancelled_total",
        CounterMetric::Connected => "ccticker_connects_total",
        CounterMetric::Reconnecting => "ccticker_reconnects_total",
        CounterMetric::SnapshotRequest => "ccticker_snapshot_requests_total",
        CounterMetric::SnapshotFailure => "ccticker_snapshot_failures_total",
    };
    counter!(name).increment(value);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let name = match metric {
        GaugeMetric::SubscribedSymbols => SUBSCRIBED_SYMBOLS,
        GaugeMetric::QueuedControl => QUEUED_CONTROL,
    };
    gauge!(name).set(value);
}

/// Install the Prometheus recorder and serve `/metrics` on `port`
///
/// Must run inside a tokio runtime.
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics exporter: {}", e))?;

    describe_metrics();
    tracing::info!(%addr, "Metrics exporter listening");
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "ccticker_prices_dispatched_total",
        "Aggregate index updates delivered to callbacks"
    );
    describe_counter!(
        "ccticker_callbacks_invoked_total",
        "Individual price callback invocations"
    );
    describe_counter!(
        "ccticker_callback_faults_total",
        "Price callbacks that panicked"
    );
    describe_counter!(
        MESSAGES_DISCARDED,
        "Inbound frames dropped without delivery, by reason"
    );
    describe_counter!(
        "ccticker_control_sent_total",
        "SubAdd/SubRemove frames written to the streamer"
    );
    describe_counter!(
        "ccticker_control_queued_total",
        "Control frames parked while the connection was not ready"
    );
    describe_counter!(
        "ccticker_control_cancelled_total",
        "Parked control frames dropped before sending"
    );
    describe_counter!("ccticker_connects_total", "Streaming sessions established");
    describe_counter!("ccticker_reconnects_total", "Streaming sessions lost");
    describe_counter!(
        "ccticker_snapshot_requests_total",
        "Batch price requests issued"
    );
    describe_counter!(
        "ccticker_snapshot_failures_total",
        "Batch price requests that failed"
    );
    describe_gauge!(SUBSCRIBED_SYMBOLS, "Symbols with at least one callback");
    describe_gauge!(QUEUED_CONTROL, "Control frames waiting for a session");
}
