use crate::core::errors::ExchangeError;
use crate::websocket_api::request_handler::{HandlerSlot, Params};
use crate::websocket_api::{check_symbol_or_symbols, set_param, ApiCategory, Category};
use tracing::instrument;

/// Public market data requests
///
/// Each method returns the id of the request it sent; the matching response
/// arrives through the client's `on_message` callback.
pub struct Market {
    handlers: HandlerSlot,
}

impl ApiCategory for Market {
    const CATEGORY: Category = Category::Market;

    fn new(handlers: HandlerSlot) -> Self {
        Self { handlers }
    }
}

impl Market {
    fn symbol_request(
        &self,
        method: &str,
        symbol: &str,
        mut params: Params,
    ) -> Result<String, ExchangeError> {
        set_param(&mut params, "symbol", symbol);
        self.handlers.get()?.public_request(method, params)
    }

    /// Order book depth. Optional: `limit`.
    #[instrument(skip(self, params), fields(symbol = %symbol))]
    pub fn order_book(&self, symbol: &str, params: Params) -> Result<String, ExchangeError> {
        self.symbol_request("depth", symbol, params)
    }

    /// Optional: `limit`.
    #[instrument(skip(self, params), fields(symbol = %symbol))]
    pub fn recent_trades(&self, symbol: &str, params: Params) -> Result<String, ExchangeError> {
        self.symbol_request("trades.recent", symbol, params)
    }

    /// Older trades, API key required. Optional: `fromId`, `limit`.
    #[instrument(skip(self, params), fields(symbol = %symbol))]
    pub fn historical_trades(
        &self,
        symbol: &str,
        mut params: Params,
    ) -> Result<String, ExchangeError> {
        set_param(&mut params, "symbol", symbol);
        self.handlers.get()?.api_request("trades.historical", params)
    }

    /// Optional: `fromId`, `startTime`, `endTime`, `limit`.
    #[instrument(skip(self, params), fields(symbol = %symbol))]
    pub fn aggregate_trades(&self, symbol: &str, params: Params) -> Result<String, ExchangeError> {
        self.symbol_request("trades.aggregate", symbol, params)
    }

    /// Optional: `startTime`, `endTime`, `timeZone`, `limit`.
    #[instrument(skip(self, params), fields(symbol = %symbol, interval = %interval))]
    pub fn klines(
        &self,
        symbol: &str,
        interval: &str,
        mut params: Params,
    ) -> Result<String, ExchangeError> {
        set_param(&mut params, "interval", interval);
        self.symbol_request("klines", symbol, params)
    }

    /// Klines tuned for chart display; same parameters as `klines`.
    #[instrument(skip(self, params), fields(symbol = %symbol, interval = %interval))]
    pub fn ui_klines(
        &self,
        symbol: &str,
        interval: &str,
        mut params: Params,
    ) -> Result<String, ExchangeError> {
        set_param(&mut params, "interval", interval);
        self.symbol_request("uiKlines", symbol, params)
    }

    #[instrument(skip(self, params), fields(symbol = %symbol))]
    pub fn avg_price(&self, symbol: &str, params: Params) -> Result<String, ExchangeError> {
        self.symbol_request("avgPrice", symbol, params)
    }

    /// 24h rolling statistics. Optional: `symbol` or `symbols`, `type`.
    pub fn ticker_24hr(&self, params: Params) -> Result<String, ExchangeError> {
        check_symbol_or_symbols(&params, false)?;
        self.handlers.get()?.public_request("ticker.24hr", params)
    }

    /// Requires `symbol` or `symbols`. Optional: `timeZone`, `type`.
    pub fn ticker_trading_day(&self, params: Params) -> Result<String, ExchangeError> {
        check_symbol_or_symbols(&params, true)?;
        self.handlers.get()?.public_request("ticker.tradingDay", params)
    }

    /// Rolling window statistics. Requires `symbol` or `symbols`. Optional: `windowSize`, `type`.
    pub fn ticker(&self, params: Params) -> Result<String, ExchangeError> {
        check_symbol_or_symbols(&params, true)?;
        self.handlers.get()?.public_request("ticker", params)
    }

    pub fn ticker_price(&self, params: Params) -> Result<String, ExchangeError> {
        check_symbol_or_symbols(&params, false)?;
        self.handlers.get()?.public_request("ticker.price", params)
    }

    pub fn ticker_book(&self, params: Params) -> Result<String, ExchangeError> {
        check_symbol_or_symbols(&params, false)?;
        self.handlers.get()?.public_request("ticker.book", params)
    }
}
