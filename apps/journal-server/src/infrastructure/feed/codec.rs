//! Feed Codec
//!
//! JSON encoding and decoding for the upstream feed. Inbound messages are
//! discriminated by their `type` field; only known types decode, everything
//! else is reported so the caller can drop it.

use crate::infrastructure::feed::messages::{FeedMessage, TradePayload};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Message type is not one this client consumes.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    /// Message is valid JSON but not shaped like a feed message.
    #[error("invalid message format: {0}")]
    InvalidFormat(String),
}

/// JSON codec for the feed socket.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode an inbound text frame into a [`FeedMessage`].
    ///
    /// # Errors
    ///
    /// Returns an error if JSON parsing fails, the `type` field is missing,
    /// or the type is not one this client consumes.
    pub fn decode(&self, text: &str) -> Result<FeedMessage, CodecError> {
        let value: serde_json::Value = serde_json::from_str(text)?;

        let msg_type = value
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CodecError::InvalidFormat("missing \"type\" field".to_string()))?;

        match msg_type {
            "trade" => {
                let payload: TradePayload = serde_json::from_value(value)?;
                Ok(FeedMessage::Trade(payload))
            }
            "ping" => Ok(FeedMessage::Ping),
            other => Err(CodecError::UnknownMessageType(other.to_string())),
        }
    }

    /// Encode a value to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode<T: serde::Serialize>(&self, value: &T) -> Result<String, CodecError> {
        Ok(serde_json::to_string(value)?)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::infrastructure::feed::messages::ControlRequest;

    #[test]
    fn decode_trade_payload() {
        let codec = JsonCodec::new();
        let json = r#"{"type":"trade","data":[{"s":"AAPL","p":150.25,"t":1000}]}"#;

        let message = codec.decode(json).unwrap();
        match message {
            FeedMessage::Trade(payload) => {
                assert_eq!(payload.data.len(), 1);
                assert_eq!(payload.data[0].price, Decimal::new(15025, 2));
            }
            FeedMessage::Ping => panic!("expected Trade message"),
        }
    }

    #[test]
    fn decode_ping() {
        let codec = JsonCodec::new();
        let message = codec.decode(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(message, FeedMessage::Ping);
    }

    #[test]
    fn decode_rejects_unknown_type() {
        let codec = JsonCodec::new();
        let err = codec.decode(r#"{"type":"news","headline":"..."}"#).unwrap_err();
        assert!(matches!(err, CodecError::UnknownMessageType(t) if t == "news"));
    }

    #[test]
    fn decode_rejects_missing_type() {
        let codec = JsonCodec::new();
        let err = codec.decode(r#"{"data":[]}"#).unwrap_err();
        assert!(matches!(err, CodecError::InvalidFormat(_)));
    }

    #[test]
    fn decode_rejects_invalid_json() {
        let codec = JsonCodec::new();
        let err = codec.decode("not json").unwrap_err();
        assert!(matches!(err, CodecError::Json(_)));
    }

    #[test]
    fn encode_control_request() {
        let codec = JsonCodec::new();
        let json = codec.encode(&ControlRequest::subscribe("MSFT")).unwrap();
        assert_eq!(json, r#"{"type":"subscribe","symbol":"MSFT"}"#);
    }
}
