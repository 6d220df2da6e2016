use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("No Websocket API connection to submit request. Please connect first.")]
    NotConnected,

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API error: {code} - {message}")]
    ApiError { code: i64, message: String },

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    #[error("Connection timeout: {0}")]
    ConnectionTimeout(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),

    #[error("Other error: {0}")]
    Other(String),
}
