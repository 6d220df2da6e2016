use crate::core::errors::ExchangeError;
use crate::websocket_api::request_handler::{HandlerSlot, Params};
use crate::websocket_api::types::{CancelReplaceMode, OrderSide, OrderType};
use crate::websocket_api::{require_one_of, set_param, ApiCategory, Category};
use rust_decimal::Decimal;
use tracing::instrument;

/// Signed order management requests
pub struct Trade {
    handlers: HandlerSlot,
}

impl ApiCategory for Trade {
    const CATEGORY: Category = Category::Trade;

    fn new(handlers: HandlerSlot) -> Self {
        Self { handlers }
    }
}

fn order_params(
    mut params: Params,
    symbol: &str,
    side: OrderSide,
    order_type: OrderType,
) -> Params {
    set_param(&mut params, "symbol", symbol);
    set_param(&mut params, "side", side);
    set_param(&mut params, "type", order_type);
    params
}

impl Trade {
    fn signed(&self, method: &str, params: Params) -> Result<String, ExchangeError> {
        self.handlers.get()?.signature_request(method, params)
    }

    /// Place an order. Quantity, price, and time in force go in `params`
    /// (`quantity`/`quoteOrderQty`, `price`, `timeInForce`, ...).
    #[instrument(skip(self, params), fields(symbol = %symbol, side = %side, order_type = %order_type))]
    pub fn new_order(
        &self,
        symbol: &str,
        side: OrderSide,
        order_type: OrderType,
        params: Params,
    ) -> Result<String, ExchangeError> {
        self.signed("order.place", order_params(params, symbol, side, order_type))
    }

    /// Validate an order without sending it to the matching engine
    #[instrument(skip(self, params), fields(symbol = %symbol, side = %side, order_type = %order_type))]
    pub fn test_new_order(
        &self,
        symbol: &str,
        side: OrderSide,
        order_type: OrderType,
        params: Params,
    ) -> Result<String, ExchangeError> {
        self.signed("order.test", order_params(params, symbol, side, order_type))
    }

    /// Requires `orderId` or `origClientOrderId`.
    #[instrument(skip(self, params), fields(symbol = %symbol))]
    pub fn get_order(&self, symbol: &str, mut params: Params) -> Result<String, ExchangeError> {
        require_one_of(&params, &["orderId", "origClientOrderId"])?;
        set_param(&mut params, "symbol", symbol);
        self.signed("order.status", params)
    }

    /// Requires `orderId` or `origClientOrderId`.
    #[instrument(skip(self, params), fields(symbol = %symbol))]
    pub fn cancel_order(&self, symbol: &str, mut params: Params) -> Result<String, ExchangeError> {
        require_one_of(&params, &["orderId", "origClientOrderId"])?;
        set_param(&mut params, "symbol", symbol);
        self.signed("order.cancel", params)
    }

    /// Cancel an existing order and place a new one atomically.
    /// Requires `cancelOrderId` or `cancelOrigClientOrderId`.
    #[instrument(skip(self, params), fields(symbol = %symbol, mode = %mode))]
    pub fn cancel_replace_order(
        &self,
        symbol: &str,
        mode: CancelReplaceMode,
        side: OrderSide,
        order_type: OrderType,
        params: Params,
    ) -> Result<String, ExchangeError> {
        require_one_of(&params, &["cancelOrderId", "cancelOrigClientOrderId"])?;
        let mut params = order_params(params, symbol, side, order_type);
        set_param(&mut params, "cancelReplaceMode", mode);
        self.signed("order.cancelReplace", params)
    }

    /// Optional: `symbol` (all symbols when omitted).
    pub fn open_orders(&self, params: Params) -> Result<String, ExchangeError> {
        self.signed("openOrders.status", params)
    }

    #[instrument(skip(self, params), fields(symbol = %symbol))]
    pub fn cancel_open_orders(
        &self,
        symbol: &str,
        mut params: Params,
    ) -> Result<String, ExchangeError> {
        set_param(&mut params, "symbol", symbol);
        self.signed("openOrders.cancelAll", params)
    }

    /// One-cancels-the-other order: a limit leg at `price` and a stop leg at `stop_price`.
    #[instrument(skip(self, params), fields(symbol = %symbol, side = %side))]
    pub fn new_oco_order(
        &self,
        symbol: &str,
        side: OrderSide,
        price: Decimal,
        quantity: Decimal,
        stop_price: Decimal,
        mut params: Params,
    ) -> Result<String, ExchangeError> {
        set_param(&mut params, "symbol", symbol);
        set_param(&mut params, "side", side);
        set_param(&mut params, "price", price.to_string());
        set_param(&mut params, "quantity", quantity.to_string());
        set_param(&mut params, "stopPrice", stop_price.to_string());
        self.signed("orderList.place", params)
    }

    /// Requires `orderListId` or `origClientOrderId`.
    pub fn get_oco_order(&self, params: Params) -> Result<String, ExchangeError> {
        require_one_of(&params, &["orderListId", "origClientOrderId"])?;
        self.signed("orderList.status", params)
    }

    /// Requires `orderListId` or `listClientOrderId`.
    #[instrument(skip(self, params), fields(symbol = %symbol))]
    pub fn cancel_oco_order(
        &self,
        symbol: &str,
        mut params: Params,
    ) -> Result<String, ExchangeError> {
        require_one_of(&params, &["orderListId", "listClientOrderId"])?;
        set_param(&mut params, "symbol", symbol);
        self.signed("orderList.cancel", params)
    }

    pub fn open_oco_orders(&self, params: Params) -> Result<String, ExchangeError> {
        self.signed("openOrderLists.status", params)
    }
}
