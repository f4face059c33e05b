//! Market Data Types
//!
//! Value types shared between the feed client and its consumers: the tick
//! itself, the listener handle ticks are delivered through, and the upstream
//! connection lifecycle.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A symbol string (stock ticker, exchange-prefixed pair, etc.).
///
/// Symbols are case-sensitive and compared exactly as supplied.
pub type Symbol = String;

// =============================================================================
// Tick
// =============================================================================

/// A single price observation for one symbol.
///
/// Immutable value produced by the upstream feed and handed to every
/// listener registered for the symbol at the moment of delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    /// Symbol the price belongs to.
    pub symbol: Symbol,
    /// Traded price.
    pub price: Decimal,
    /// Event time in milliseconds since the Unix epoch, as sent upstream.
    pub timestamp: i64,
}

impl Tick {
    /// Create a new tick.
    #[must_use]
    pub const fn new(symbol: Symbol, price: Decimal, timestamp: i64) -> Self {
        Self {
            symbol,
            price,
            timestamp,
        }
    }

    /// Event time as a UTC datetime, if the millisecond timestamp is
    /// representable.
    #[must_use]
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

// =============================================================================
// Listener Handle
// =============================================================================

/// Callback handle that receives every tick for a subscribed symbol.
///
/// Equality is reference identity: clones of one handle compare equal, two
/// handles built from identical closures do not. A consumer keeps a clone of
/// the handle it registered and passes it back to remove exactly that
/// registration.
#[derive(Clone)]
pub struct TickListener {
    callback: Arc<dyn Fn(&Tick) + Send + Sync>,
}

impl TickListener {
    /// Wrap a callback in a listener handle.
    pub fn new(callback: impl Fn(&Tick) + Send + Sync + 'static) -> Self {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Invoke the callback with a tick.
    pub fn invoke(&self, tick: &Tick) {
        (self.callback)(tick);
    }
}

impl PartialEq for TickListener {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }
}

impl Eq for TickListener {}

impl fmt::Debug for TickListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TickListener({:p})", Arc::as_ptr(&self.callback))
    }
}

// =============================================================================
// Connection State
// =============================================================================

/// Lifecycle of the upstream feed connection.
///
/// Owned exclusively by the hub; consumers never observe or mutate it
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No transport connection and none in flight.
    #[default]
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// The transport is established and control messages can be sent.
    Open,
}

impl ConnectionState {
    /// Get the state name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
        }
    }

    /// Check whether the transport is established.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}
