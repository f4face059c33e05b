//! Prometheus Metrics Module
//!
//! Exposes application metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Feed**: messages, ticks delivered/dropped, malformed payloads
//! - **Connection**: feed connection state and reconnect attempts
//! - **Subscriptions**: subscribed symbols and watched open positions
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the HTTP server port.

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::infrastructure::feed::messages::ControlAction;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new();
            let handle = builder
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    // Feed counters
    describe_counter!(
        "journal_feed_messages_received_total",
        "Total text frames received from the price feed"
    );
    describe_counter!(
        "journal_feed_ticks_delivered_total",
        "Total tick deliveries to registered listeners"
    );
    describe_counter!(
        "journal_feed_ticks_dropped_total",
        "Total ticks dropped because no listener was registered"
    );
    describe_counter!(
        "journal_feed_malformed_payloads_total",
        "Total inbound payloads discarded as malformed"
    );
    describe_counter!(
        "journal_feed_control_messages_total",
        "Total subscription control messages sent upstream"
    );
    describe_counter!(
        "journal_feed_reconnects_total",
        "Total reconnect attempts scheduled after transport failures"
    );

    // Connection and subscription gauges
    describe_gauge!(
        "journal_feed_connected",
        "Whether the feed connection is open (1) or not (0)"
    );
    describe_gauge!(
        "journal_feed_subscriptions",
        "Number of symbols with upstream interest"
    );
    describe_gauge!(
        "journal_open_positions",
        "Number of open trades watched for live prices"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a text frame received from the feed.
pub fn record_feed_message() {
    counter!("journal_feed_messages_received_total").increment(1);
}

/// Record tick deliveries to listeners.
pub fn record_ticks_delivered(count: u64) {
    counter!("journal_feed_ticks_delivered_total").increment(count);
}

/// Record a tick dropped for lack of listeners.
pub fn record_tick_dropped() {
    counter!("journal_feed_ticks_dropped_total").increment(1);
}

/// Record a malformed inbound payload.
pub fn record_malformed_payload() {
    counter!("journal_feed_malformed_payloads_total").increment(1);
}

/// Record a control message sent upstream.
pub fn record_control_sent(action: ControlAction) {
    counter!(
        "journal_feed_control_messages_total",
        "action" => action.as_str()
    )
    .increment(1);
}

/// Record a scheduled reconnect attempt.
pub fn record_reconnect() {
    counter!("journal_feed_reconnects_total").increment(1);
}

/// Update the feed connection gauge.
pub fn set_feed_connected(connected: bool) {
    gauge!("journal_feed_connected").set(if connected { 1.0 } else { 0.0 });
}

/// Update the subscribed symbol count.
pub fn set_subscribed_symbols(count: usize) {
    gauge!("journal_feed_subscriptions").set(count as f64);
}

/// Update the watched open position count.
pub fn set_open_positions(count: usize) {
    gauge!("journal_open_positions").set(count as f64);
}
