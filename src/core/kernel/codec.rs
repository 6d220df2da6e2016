use crate::core::errors::ExchangeError;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio_tungstenite::tungstenite::Message;

/// Error payload attached to a failed WebSocket API response
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WsApiErrorBody {
    pub code: i64,
    pub msg: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RateLimit {
    pub rate_limit_type: String,
    pub interval: String,
    pub interval_num: u32,
    pub limit: u64,
    #[serde(default)]
    pub count: Option<u64>,
}

/// Response to a request previously sent over the WebSocket API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsApiResponse {
    /// Echo of the request id; `None` for errors the server could not attribute
    pub id: Option<String>,
    pub status: u16,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<WsApiErrorBody>,
    #[serde(default)]
    pub rate_limits: Option<Vec<RateLimit>>,
}

impl WsApiResponse {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status)
    }

    /// Unwrap the result payload, mapping an error body to `ExchangeError::ApiError`
    pub fn into_result(self) -> Result<Value, ExchangeError> {
        if let Some(error) = self.error {
            return Err(ExchangeError::ApiError {
                code: error.code,
                message: error.msg,
            });
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

/// Anything the server can push over a WebSocket API connection
#[derive(Debug, Clone)]
pub enum WsApiMessage {
    Response(WsApiResponse),
    /// Unsolicited payload, e.g. a user data stream event
    Event(Value),
}

/// Encode a request frame
///
/// `params` is omitted from the frame when empty, which is what the server
/// expects for parameterless methods such as `ping`.
pub fn encode_request(id: &str, method: &str, params: &Map<String, Value>) -> Message {
    let frame = if params.is_empty() {
        json!({ "id": id, "method": method })
    } else {
        json!({ "id": id, "method": method, "params": params })
    };
    Message::Text(frame.to_string())
}

/// Decode a text payload received on the connection
pub fn decode_message(text: &str) -> Result<WsApiMessage, ExchangeError> {
    let value: Value = serde_json::from_str(text)?;

    let is_response = value.get("status").is_some()
        && (value.get("id").is_some() || value.get("error").is_some());
    if is_response {
        let response: WsApiResponse = serde_json::from_value(value)?;
        return Ok(WsApiMessage::Response(response));
    }

    Ok(WsApiMessage::Event(value))
}

/// Render a parameter value the way it appears in a signature payload
pub fn payload_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Build the canonical `key=value&...` payload; keys are visited in sorted order
pub fn build_payload(params: &Map<String, Value>) -> String {
    let mut entries: Vec<(&String, &Value)> = params.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, payload_value(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_request_without_params() {
        let message = encode_request("abc", "ping", &Map::new());
        if let Message::Text(text) = message {
            let value: Value = serde_json::from_str(&text).unwrap();
            assert_eq!(value["id"], "abc");
            assert_eq!(value["method"], "ping");
            assert!(value.get("params").is_none());
        } else {
            panic!("Expected text message");
        }
    }

    #[test]
    fn test_encode_request_with_params() {
        let mut params = Map::new();
        params.insert("symbol".to_string(), json!("BTCUSDT"));
        params.insert("limit".to_string(), json!(5));

        let message = encode_request("1", "depth", &params);
        if let Message::Text(text) = message {
            let value: Value = serde_json::from_str(&text).unwrap();
            assert_eq!(value["params"]["symbol"], "BTCUSDT");
            assert_eq!(value["params"]["limit"], 5);
        } else {
            panic!("Expected text message");
        }
    }

    #[test]
    fn test_decode_success_response() {
        let text = r#"{"id":"922bcc6e","status":200,"result":{"serverTime":1656400526260},"rateLimits":[{"rateLimitType":"REQUEST_WEIGHT","interval":"MINUTE","intervalNum":1,"limit":6000,"count":1}]}"#;

        match decode_message(text).unwrap() {
            WsApiMessage::Response(response) => {
                assert!(response.is_success());
                assert_eq!(response.id.as_deref(), Some("922bcc6e"));
                let limits = response.rate_limits.clone().unwrap();
                assert_eq!(limits[0].rate_limit_type, "REQUEST_WEIGHT");
                assert_eq!(limits[0].count, Some(1));
                let result = response.into_result().unwrap();
                assert_eq!(result["serverTime"], 1_656_400_526_260_i64);
            }
            WsApiMessage::Event(_) => panic!("Expected response"),
        }
    }

    #[test]
    fn test_decode_error_response() {
        let text = r#"{"id":"x","status":400,"error":{"code":-1102,"msg":"Mandatory parameter 'symbol' was not sent."}}"#;

        let WsApiMessage::Response(response) = decode_message(text).unwrap() else {
            panic!("Expected response");
        };
        assert!(!response.is_success());
        match response.into_result() {
            Err(ExchangeError::ApiError { code, message }) => {
                assert_eq!(code, -1102);
                assert!(message.contains("symbol"));
            }
            other => panic!("Expected API error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_unattributed_error() {
        let text = r#"{"id":null,"status":400,"error":{"code":-1000,"msg":"malformed"}}"#;
        let WsApiMessage::Response(response) = decode_message(text).unwrap() else {
            panic!("Expected response");
        };
        assert!(response.id.is_none());
    }

    #[test]
    fn test_decode_event() {
        let text = r#"{"event":{"e":"outboundAccountPosition","E":1728972148778}}"#;
        assert!(matches!(
            decode_message(text).unwrap(),
            WsApiMessage::Event(_)
        ));
    }

    #[test]
    fn test_decode_invalid_json() {
        assert!(matches!(
            decode_message("not json"),
            Err(ExchangeError::JsonError(_))
        ));
    }

    #[test]
    fn test_build_payload_sorts_keys() {
        let mut params = Map::new();
        params.insert("timestamp".to_string(), json!(1_649_729_878_532_i64));
        params.insert("apiKey".to_string(), json!("key"));
        params.insert("symbol".to_string(), json!("BTCUSDT"));
        params.insert("quantity".to_string(), json!("0.01"));

        assert_eq!(
            build_payload(&params),
            "apiKey=key&quantity=0.01&symbol=BTCUSDT&timestamp=1649729878532"
        );
    }
}
