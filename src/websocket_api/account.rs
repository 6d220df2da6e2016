use crate::core::errors::ExchangeError;
use crate::websocket_api::request_handler::{HandlerSlot, Params};
use crate::websocket_api::{require_one_of, set_param, ApiCategory, Category};
use tracing::instrument;

/// Signed account queries
pub struct Account {
    handlers: HandlerSlot,
}

impl ApiCategory for Account {
    const CATEGORY: Category = Category::Account;

    fn new(handlers: HandlerSlot) -> Self {
        Self { handlers }
    }
}

impl Account {
    fn signed(&self, method: &str, params: Params) -> Result<String, ExchangeError> {
        self.handlers.get()?.signature_request(method, params)
    }

    /// Balances and permissions. Optional: `omitZeroBalances`.
    pub fn account_status(&self, params: Params) -> Result<String, ExchangeError> {
        self.signed("account.status", params)
    }

    /// Current unfilled order counts against the order rate limits
    pub fn order_rate_limits(&self, params: Params) -> Result<String, ExchangeError> {
        self.signed("account.rateLimits.orders", params)
    }

    /// Optional: `orderId`, `startTime`, `endTime`, `limit`.
    #[instrument(skip(self, params), fields(symbol = %symbol))]
    pub fn order_history(&self, symbol: &str, mut params: Params) -> Result<String, ExchangeError> {
        set_param(&mut params, "symbol", symbol);
        self.signed("allOrders", params)
    }

    /// Optional: `fromId`, `startTime`, `endTime`, `limit`.
    pub fn oco_history(&self, params: Params) -> Result<String, ExchangeError> {
        self.signed("allOrderLists", params)
    }

    /// Optional: `orderId`, `startTime`, `endTime`, `fromId`, `limit`.
    #[instrument(skip(self, params), fields(symbol = %symbol))]
    pub fn trade_history(&self, symbol: &str, mut params: Params) -> Result<String, ExchangeError> {
        set_param(&mut params, "symbol", symbol);
        self.signed("myTrades", params)
    }

    /// Orders expired by self-trade prevention. Requires `preventedMatchId` or `orderId`.
    #[instrument(skip(self, params), fields(symbol = %symbol))]
    pub fn prevented_matches(
        &self,
        symbol: &str,
        mut params: Params,
    ) -> Result<String, ExchangeError> {
        require_one_of(&params, &["preventedMatchId", "orderId"])?;
        set_param(&mut params, "symbol", symbol);
        self.signed("myPreventedMatches", params)
    }
}
