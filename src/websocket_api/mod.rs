pub mod account;
pub mod client;
pub mod general;
pub mod market;
pub mod request_handler;
pub mod trade;
pub mod types;
pub mod user_data_stream;

use crate::core::errors::ExchangeError;
use request_handler::{HandlerSlot, Params};
use serde_json::Value;

// Re-export main types for easier importing
pub use account::Account;
pub use client::{CloseOutcome, WebSocketApiClient};
pub use general::General;
pub use market::Market;
pub use trade::Trade;
pub use types::{CancelReplaceMode, OrderSide, OrderType, TimeInForce};
pub use user_data_stream::UserDataStream;

/// The request categories the API groups its methods into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    General,
    Market,
    Trade,
    Account,
    UserDataStream,
}

/// A category module, built from the client's handler slot
pub trait ApiCategory: Send + Sync + 'static {
    const CATEGORY: Category;

    fn new(handlers: HandlerSlot) -> Self;
}

pub(crate) fn set_param<V: Into<Value>>(params: &mut Params, key: &str, value: V) {
    params.insert(key.to_string(), value.into());
}

/// Fail unless at least one of `keys` is present
pub(crate) fn require_one_of(params: &Params, keys: &[&str]) -> Result<(), ExchangeError> {
    if keys.iter().any(|key| params.contains_key(*key)) {
        return Ok(());
    }
    Err(ExchangeError::InvalidParameters(format!(
        "One of {} is required",
        keys.join(", ")
    )))
}

/// `symbol` and `symbols` are mutually exclusive; with `required` exactly one must be set
pub(crate) fn check_symbol_or_symbols(params: &Params, required: bool) -> Result<(), ExchangeError> {
    match (params.contains_key("symbol"), params.contains_key("symbols")) {
        (true, true) => Err(ExchangeError::InvalidParameters(
            "symbol and symbols cannot be sent together".to_string(),
        )),
        (false, false) if required => Err(ExchangeError::InvalidParameters(
            "One of symbol, symbols is required".to_string(),
        )),
        _ => Ok(()),
    }
}
