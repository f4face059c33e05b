//! Feed WebSocket Message Types
//!
//! Wire format types for the upstream price feed. The feed speaks compact
//! JSON: clients send subscription control requests, the server pushes trade
//! payloads carrying batches of tick records and the occasional keepalive.
//!
//! # Message Types
//!
//! ## Outbound (client -> server)
//! - `ControlRequest`: subscribe/unsubscribe for one symbol
//!
//! ## Inbound (server -> client)
//! - `TradePayload`: real-time trades, an array of tick records
//! - `ping`: keepalive, carries no data

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::market::Tick;

// =============================================================================
// Outbound Messages (Client -> Server)
// =============================================================================

/// Control request kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    /// Start streaming trades for a symbol.
    Subscribe,
    /// Stop streaming trades for a symbol.
    Unsubscribe,
}

impl ControlAction {
    /// Get the action name as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
        }
    }
}

/// Subscription control request, one symbol per message.
///
/// # Wire Format (JSON)
/// ```json
/// {"type": "subscribe", "symbol": "AAPL"}
/// {"type": "unsubscribe", "symbol": "AAPL"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRequest {
    /// Request kind: "subscribe" or "unsubscribe"
    #[serde(rename = "type")]
    pub action: ControlAction,

    /// Symbol the request applies to
    pub symbol: String,
}

impl ControlRequest {
    /// Create a subscribe request.
    #[must_use]
    pub fn subscribe(symbol: impl Into<String>) -> Self {
        Self {
            action: ControlAction::Subscribe,
            symbol: symbol.into(),
        }
    }

    /// Create an unsubscribe request.
    #[must_use]
    pub fn unsubscribe(symbol: impl Into<String>) -> Self {
        Self {
            action: ControlAction::Unsubscribe,
            symbol: symbol.into(),
        }
    }
}

// =============================================================================
// Inbound Messages (Server -> Client)
// =============================================================================

/// One tick record inside a trade payload.
///
/// # Wire Format (JSON)
/// ```json
/// {"s": "BINANCE:BTCUSDT", "p": 7296.89, "t": 1575526691134, "v": 0.011467}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Symbol the trade executed on
    #[serde(rename = "s")]
    pub symbol: String,

    /// Last price
    #[serde(rename = "p")]
    pub price: Decimal,

    /// Trade time, milliseconds since the Unix epoch
    #[serde(rename = "t")]
    pub timestamp: i64,

    /// Volume, when the feed reports it
    #[serde(rename = "v", default)]
    pub volume: Option<Decimal>,
}

impl TradeRecord {
    /// Convert the record into a domain tick.
    #[must_use]
    pub fn to_tick(&self) -> Tick {
        Tick::new(self.symbol.clone(), self.price, self.timestamp)
    }
}

/// Real-time trade payload.
///
/// # Wire Format (JSON)
/// ```json
/// {
///   "type": "trade",
///   "data": [
///     {"s": "AAPL", "p": 150.25, "t": 1575526691134}
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradePayload {
    /// Message type (always "trade")
    #[serde(rename = "type")]
    pub msg_type: String,

    /// Tick records carried by this payload
    #[serde(default)]
    pub data: Vec<TradeRecord>,
}

impl TradePayload {
    /// The first tick record, converted to a domain tick.
    ///
    /// The feed batches records per payload; this client consumes the first
    /// record only.
    #[must_use]
    pub fn first_tick(&self) -> Option<Tick> {
        self.data.first().map(TradeRecord::to_tick)
    }
}

/// Inbound feed message, discriminated by its `type` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedMessage {
    /// Real-time trade payload
    Trade(TradePayload),

    /// Keepalive from the feed
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_subscribe_request() {
        let req = ControlRequest::subscribe("AAPL");
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"type":"subscribe","symbol":"AAPL"}"#);
    }

    #[test]
    fn test_serialize_unsubscribe_request() {
        let req = ControlRequest::unsubscribe("BINANCE:BTCUSDT");
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"type":"unsubscribe","symbol":"BINANCE:BTCUSDT"}"#);
    }

    #[test]
    fn test_deserialize_trade_payload() {
        let json = r#"{
            "type": "trade",
            "data": [
                {"s": "AAPL", "p": 150.25, "t": 1575526691134, "v": 100},
                {"s": "AAPL", "p": 150.26, "t": 1575526691140}
            ]
        }"#;
        let payload: TradePayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.data.len(), 2);
        assert_eq!(payload.data[0].symbol, "AAPL");
        assert_eq!(payload.data[0].price, Decimal::new(15025, 2));
        assert_eq!(payload.data[1].volume, None);
    }

    #[test]
    fn test_first_tick_takes_first_record() {
        let payload = TradePayload {
            msg_type: "trade".to_string(),
            data: vec![
                TradeRecord {
                    symbol: "AAPL".to_string(),
                    price: Decimal::new(15025, 2),
                    timestamp: 1_000,
                    volume: None,
                },
                TradeRecord {
                    symbol: "AAPL".to_string(),
                    price: Decimal::new(15030, 2),
                    timestamp: 2_000,
                    volume: None,
                },
            ],
        };

        let tick = payload.first_tick().unwrap();
        assert_eq!(tick.price, Decimal::new(15025, 2));
        assert_eq!(tick.timestamp, 1_000);
    }

    #[test]
    fn test_first_tick_of_empty_payload() {
        let payload = TradePayload {
            msg_type: "trade".to_string(),
            data: vec![],
        };
        assert!(payload.first_tick().is_none());
    }
}
