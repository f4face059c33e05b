//! Feed Client Integration Tests
//!
//! Drives the market data hub against a real local WebSocket server
//! standing in for the upstream feed: subscription wiring, tick delivery,
//! and reconnect reconciliation.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

use journal_server::{ApiToken, ConnectionState, HubConfig, MarketDataHub, Tick, TickListener};

use common::{MockFeed, wait_for};

fn hub_for(feed: &MockFeed) -> Arc<MarketDataHub> {
    Arc::new(MarketDataHub::new(
        HubConfig {
            stream_url: feed.url(),
            api_token: ApiToken::new("test-token").unwrap(),
            reconnect_delay: Duration::from_millis(100),
        },
        CancellationToken::new(),
    ))
}

fn recording_listener() -> (TickListener, Arc<Mutex<Vec<Tick>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let listener = TickListener::new(move |tick: &Tick| sink.lock().push(tick.clone()));
    (listener, seen)
}

#[tokio::test]
async fn test_listener_interest_reaches_the_feed() {
    let mut feed = MockFeed::start().await;
    let hub = hub_for(&feed);
    let (listener, seen) = recording_listener();

    // Interest registered before the connection exists is replayed once
    // the handshake completes.
    hub.add_listener("AAPL", &listener);
    Arc::clone(&hub).connect();

    let control = feed.expect_control().await;
    assert_eq!(control["type"], "subscribe");
    assert_eq!(control["symbol"], "AAPL");

    feed.push_trade("AAPL", "150.25", 1_000);
    wait_for(|| !seen.lock().is_empty(), "tick delivery").await;

    let ticks = seen.lock().clone();
    assert_eq!(
        ticks,
        vec![Tick::new(
            "AAPL".to_string(),
            Decimal::new(15025, 2),
            1_000
        )]
    );
}

#[tokio::test]
async fn test_last_listener_removal_unsubscribes_and_drops_ticks() {
    let mut feed = MockFeed::start().await;
    let hub = hub_for(&feed);
    let (listener, seen) = recording_listener();

    hub.add_listener("AAPL", &listener);
    Arc::clone(&hub).connect();
    feed.expect_subscribes(vec!["AAPL"]).await;

    feed.push_trade("AAPL", "150.25", 1_000);
    wait_for(|| !seen.lock().is_empty(), "first tick").await;

    hub.remove_listener("AAPL", &listener);
    let control = feed.expect_control().await;
    assert_eq!(control["type"], "unsubscribe");
    assert_eq!(control["symbol"], "AAPL");

    // A tick in flight after the unsubscribe lands nowhere.
    feed.push_trade("AAPL", "150.30", 2_000);
    wait_for(|| hub.snapshot().ticks_dropped >= 1, "dropped tick").await;
    assert_eq!(seen.lock().len(), 1);
}

#[tokio::test]
async fn test_both_listeners_receive_the_same_tick() {
    let mut feed = MockFeed::start().await;
    let hub = hub_for(&feed);
    let (first, first_seen) = recording_listener();
    let (second, second_seen) = recording_listener();

    hub.add_listener("MSFT", &first);
    hub.add_listener("MSFT", &second);
    Arc::clone(&hub).connect();
    feed.expect_subscribes(vec!["MSFT"]).await;

    feed.push_trade("MSFT", "300", 1_000);
    wait_for(
        || !first_seen.lock().is_empty() && !second_seen.lock().is_empty(),
        "fan-out to both listeners",
    )
    .await;

    assert_eq!(*first_seen.lock(), *second_seen.lock());
    assert_eq!(first_seen.lock().len(), 1);
}

#[tokio::test]
async fn test_reconnect_replays_every_interested_symbol() {
    let mut feed = MockFeed::start().await;
    let hub = hub_for(&feed);
    let (aapl_listener, _) = recording_listener();
    let (msft_listener, msft_seen) = recording_listener();

    hub.add_listener("AAPL", &aapl_listener);
    Arc::clone(&hub).connect();
    feed.expect_subscribes(vec!["AAPL"]).await;
    assert_eq!(feed.connection_count(), 1);

    // Kill the transport and register new interest while disconnected.
    feed.drop_connection();
    wait_for(
        || hub.snapshot().connection != ConnectionState::Open,
        "disconnect",
    )
    .await;
    hub.add_listener("MSFT", &msft_listener);

    // After the fixed delay the hub dials again and reconciles the whole
    // registry, including the symbol that gained interest while down.
    feed.expect_subscribes(vec!["AAPL", "MSFT"]).await;
    assert_eq!(feed.connection_count(), 2);
    assert_eq!(hub.snapshot().reconnects, 1);

    feed.push_trade("MSFT", "300", 2_000);
    wait_for(|| !msft_seen.lock().is_empty(), "tick after reconnect").await;
}

#[tokio::test]
async fn test_cancelled_hub_does_not_redial() {
    let feed = MockFeed::start().await;
    let cancel = CancellationToken::new();
    let hub = Arc::new(MarketDataHub::new(
        HubConfig {
            stream_url: feed.url(),
            api_token: ApiToken::new("test-token").unwrap(),
            reconnect_delay: Duration::from_millis(50),
        },
        cancel.clone(),
    ));
    let (listener, _) = recording_listener();

    hub.add_listener("AAPL", &listener);
    Arc::clone(&hub).connect();
    wait_for(|| feed.connection_count() == 1, "first connection").await;

    cancel.cancel();
    feed.drop_connection();
    wait_for(
        || hub.snapshot().connection == ConnectionState::Disconnected,
        "shutdown",
    )
    .await;

    // Give a would-be reconnect timer room to fire.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(feed.connection_count(), 1);
    assert_eq!(hub.snapshot().reconnects, 0);
}
