use crate::core::errors::ExchangeError;
use crate::websocket_api::request_handler::{HandlerSlot, Params};
use crate::websocket_api::{check_symbol_or_symbols, ApiCategory, Category};

/// Connectivity and exchange metadata requests
pub struct General {
    handlers: HandlerSlot,
}

impl ApiCategory for General {
    const CATEGORY: Category = Category::General;

    fn new(handlers: HandlerSlot) -> Self {
        Self { handlers }
    }
}

impl General {
    /// Test connectivity
    pub fn ping(&self, params: Params) -> Result<String, ExchangeError> {
        self.handlers.get()?.public_request("ping", params)
    }

    pub fn server_time(&self, params: Params) -> Result<String, ExchangeError> {
        self.handlers.get()?.public_request("time", params)
    }

    /// Trading rules and symbol information. Filter with `symbol`, `symbols`, or `permissions`.
    pub fn exchange_info(&self, params: Params) -> Result<String, ExchangeError> {
        check_symbol_or_symbols(&params, false)?;
        self.handlers.get()?.public_request("exchangeInfo", params)
    }
}
