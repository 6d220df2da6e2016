use crate::core::errors::ExchangeError;
use crate::websocket_api::request_handler::{HandlerSlot, Params};
use crate::websocket_api::{set_param, ApiCategory, Category};

/// Listen key management for the user data stream
pub struct UserDataStream {
    handlers: HandlerSlot,
}

impl ApiCategory for UserDataStream {
    const CATEGORY: Category = Category::UserDataStream;

    fn new(handlers: HandlerSlot) -> Self {
        Self { handlers }
    }
}

impl UserDataStream {
    /// Obtain a listen key, valid for 60 minutes unless kept alive
    pub fn start(&self, params: Params) -> Result<String, ExchangeError> {
        self.handlers.get()?.api_request("userDataStream.start", params)
    }

    /// Extend the validity of `listen_key`
    pub fn ping(&self, listen_key: &str, mut params: Params) -> Result<String, ExchangeError> {
        set_param(&mut params, "listenKey", listen_key);
        self.handlers.get()?.api_request("userDataStream.ping", params)
    }

    pub fn stop(&self, listen_key: &str, mut params: Params) -> Result<String, ExchangeError> {
        set_param(&mut params, "listenKey", listen_key);
        self.handlers.get()?.api_request("userDataStream.stop", params)
    }
}
