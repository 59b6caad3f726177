//! Finnhub WebSocket message types
//!
//! Inbound frames are JSON objects tagged by `type`. Only `trade` frames carry
//! records (`data`); the records themselves are forwarded untouched.

use serde::de::Error as _;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// `type` tag of frames that carry trade records
pub const TRADE_FRAME_TYPE: &str = "trade";

/// Outbound subscription request.
///
/// Serializes to `{"type":"subscribe","symbol":"<SYMBOL>"}`.
#[derive(Debug, Serialize)]
pub struct SubscribeRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    symbol: &'a str,
}

impl<'a> SubscribeRequest<'a> {
    pub fn new(symbol: &'a str) -> Self {
        Self {
            kind: "subscribe",
            symbol,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Decoded inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// `type == "trade"`; records in arrival order, possibly empty
    Trade { records: Vec<Value> },
    /// Anything else (ping, news, errors...). `frame_type` is the raw tag,
    /// empty when the frame had none.
    Other { frame_type: String },
}

impl InboundFrame {
    /// Decode a text frame. Fails if the payload is not a JSON object.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(mut map) = value else {
            return Err(serde_json::Error::custom("frame is not a JSON object"));
        };

        let frame_type = match map.get("type") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };

        if frame_type != TRADE_FRAME_TYPE {
            return Ok(InboundFrame::Other { frame_type });
        }

        let records = match map.remove("data") {
            Some(Value::Array(records)) => records,
            None | Some(Value::Null) => Vec::new(),
            Some(other) => {
                warn!(data = %other, "Trade frame data is not an array, ignoring");
                Vec::new()
            }
        };

        Ok(InboundFrame::Trade { records })
    }

    /// Tag used for logging and metrics
    pub fn frame_type(&self) -> &str {
        match self {
            InboundFrame::Trade { .. } => TRADE_FRAME_TYPE,
            InboundFrame::Other { frame_type } => frame_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subscribe_request_wire_format() {
        let json = SubscribeRequest::new("BINANCE:BTCUSDT").to_json().unwrap();
        assert_eq!(json, r#"{"type":"subscribe","symbol":"BINANCE:BTCUSDT"}"#);
    }

    #[test]
    fn test_subscribe_request_escapes_symbol() {
        let json = SubscribeRequest::new(r#"BAD"SYM"#).to_json().unwrap();
        assert_eq!(json, r#"{"type":"subscribe","symbol":"BAD\"SYM"}"#);
    }

    #[test]
    fn test_parse_trade_frame() {
        let text = r#"{"data":[{"p":7296.89,"s":"BINANCE:BTCUSDT","t":1575526691134,"v":0.011467},{"p":7296.9,"s":"BINANCE:BTCUSDT","t":1575526691135,"v":0.5}],"type":"trade"}"#;
        let frame = InboundFrame::parse(text).unwrap();
        match frame {
            InboundFrame::Trade { records } => {
                assert_eq!(records.len(), 2);
                assert_eq!(records[0]["p"], json!(7296.89));
                assert_eq!(records[1]["v"], json!(0.5));
            }
            other => panic!("expected trade frame, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_ping_frame() {
        let frame = InboundFrame::parse(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(
            frame,
            InboundFrame::Other {
                frame_type: "ping".to_string()
            }
        );
        assert_eq!(frame.frame_type(), "ping");
    }

    #[test]
    fn test_parse_trade_without_data() {
        let frame = InboundFrame::parse(r#"{"type":"trade"}"#).unwrap();
        assert_eq!(frame, InboundFrame::Trade { records: vec![] });
    }

    #[test]
    fn test_parse_trade_with_empty_data() {
        let frame = InboundFrame::parse(r#"{"type":"trade","data":[]}"#).unwrap();
        assert_eq!(frame, InboundFrame::Trade { records: vec![] });
    }

    #[test]
    fn test_parse_trade_with_null_data() {
        let frame = InboundFrame::parse(r#"{"type":"trade","data":null}"#).unwrap();
        assert_eq!(frame, InboundFrame::Trade { records: vec![] });
    }

    #[test]
    fn test_parse_trade_with_object_data() {
        let frame = InboundFrame::parse(r#"{"type":"trade","data":{"p":1}}"#).unwrap();
        assert_eq!(frame, InboundFrame::Trade { records: vec![] });
    }

    #[test]
    fn test_parse_missing_type() {
        let frame = InboundFrame::parse(r#"{"data":[{"p":1}]}"#).unwrap();
        assert_eq!(
            frame,
            InboundFrame::Other {
                frame_type: String::new()
            }
        );
    }

    #[test]
    fn test_parse_non_string_type() {
        let frame = InboundFrame::parse(r#"{"type":7}"#).unwrap();
        assert_eq!(frame.frame_type(), "7");
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(InboundFrame::parse("not json").is_err());
        assert!(InboundFrame::parse(r#"{"type":"trade","data":[{"p":1}"#).is_err());
    }

    #[test]
    fn test_parse_non_object() {
        let err = InboundFrame::parse(r#"["trade", []]"#).unwrap_err();
        assert!(err.to_string().contains("not a JSON object"));
    }
}
