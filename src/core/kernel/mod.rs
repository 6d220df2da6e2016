//! Transport kernel for the WebSocket API
//!
//! Exchange-agnostic building blocks the client is assembled from:
//!
//! - `WsTransport`: the executor socket I/O runs on, shared by `Arc`
//! - `WebSocketConnection`: one socket, driven by a background task, reporting
//!   lifecycle events through `WsCallbacks`
//! - `codec`: request frame encoding and response decoding
//! - `Signer`: pluggable request signing (`HmacSigner`, `Ed25519Signer`)
pub mod codec;
pub mod signer;
pub mod ws;

pub use codec::{RateLimit, WsApiErrorBody, WsApiMessage, WsApiResponse};
pub use signer::{Ed25519Signer, HmacSigner, Signer};
pub use ws::{
    noop_callback, ReadyState, WebSocketCallback, WebSocketConnection, WsCallbacks, WsConfig,
    WsTransport,
};
