pub mod core;
pub mod websocket_api;

pub use core::{config::ClientConfig, errors::ExchangeError};
pub use websocket_api::{CloseOutcome, WebSocketApiClient};
