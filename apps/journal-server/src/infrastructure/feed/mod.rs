//! Upstream Price Feed Client
//!
//! WebSocket client for the real-time price feed: wire types, the JSON
//! codec, and the hub that owns the connection and fans ticks out to
//! listeners.

pub mod codec;
pub mod hub;
pub mod messages;

pub use codec::{CodecError, JsonCodec};
pub use hub::{FeedSnapshot, HubConfig, MarketDataHub};
pub use messages::{ControlAction, ControlRequest, FeedMessage, TradePayload, TradeRecord};
