use crate::core::config::ClientConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{Signer, WebSocketConnection, WsCallbacks, WsTransport};
use crate::websocket_api::request_handler::{HandlerSlot, RequestHandler};
use crate::websocket_api::{
    Account, ApiCategory, Category, General, Market, Trade, UserDataStream,
};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

type CategoryCache = HashMap<Category, Arc<dyn Any + Send + Sync>>;

enum ConnectionState {
    Disconnected,
    Connected(Arc<WebSocketConnection>),
}

/// Result of [`WebSocketApiClient::close`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    AlreadyDisconnected,
}

/// Client for the WebSocket API
///
/// Owns one connection at a time and hands out one module per request
/// category. Modules are created on first access and cached for the
/// client's lifetime; they look up the current connection on every call,
/// so they stay valid across `close` and `connect`.
///
/// ```rust,no_run
/// use binance_wsapi::websocket_api::{request_handler::Params, WebSocketApiClient};
///
/// # fn example() -> Result<(), binance_wsapi::ExchangeError> {
/// let mut client = WebSocketApiClient::new();
/// client.connect(|message| println!("{}", message))?;
/// client.general()?.ping(Params::new())?;
/// client.close();
/// # Ok(())
/// # }
/// ```
pub struct WebSocketApiClient {
    config: ClientConfig,
    transport: Option<Arc<WsTransport>>,
    state: ConnectionState,
    handlers: HandlerSlot,
    categories: Mutex<CategoryCache>,
}

impl Default for WebSocketApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSocketApiClient {
    /// No credentials, default endpoint
    pub fn new() -> Self {
        Self::from_config(ClientConfig::read_only())
    }

    /// No credentials, custom endpoint
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::from_config(ClientConfig::new(String::new(), None, base_url.into()))
    }

    /// Credentials, default endpoint
    pub fn with_credentials(api_key: impl Into<String>, signer: Option<Arc<dyn Signer>>) -> Self {
        Self::from_config(ClientConfig::new(
            api_key.into(),
            signer,
            crate::core::config::WS_API_URL.to_string(),
        ))
    }

    pub fn with_credentials_and_url(
        api_key: impl Into<String>,
        signer: Option<Arc<dyn Signer>>,
        base_url: impl Into<String>,
    ) -> Self {
        Self::from_config(ClientConfig::new(api_key.into(), signer, base_url.into()))
    }

    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            state: ConnectionState::Disconnected,
            handlers: HandlerSlot::new(),
            categories: Mutex::new(HashMap::new()),
        }
    }

    /// Run socket I/O on `transport` instead of a transport picked at connect time
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<WsTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether a connection is held and has not been closed by either side
    pub fn is_connected(&self) -> bool {
        match &self.state {
            ConnectionState::Connected(connection) => {
                connection.ready_state() != crate::core::kernel::ReadyState::Closed
            }
            ConnectionState::Disconnected => false,
        }
    }

    /// Connect, delivering every received payload to `on_message`
    pub fn connect<M>(&mut self, on_message: M) -> Result<(), ExchangeError>
    where
        M: Fn(String) + Send + Sync + 'static,
    {
        self.connect_with_callbacks(WsCallbacks::message_only(on_message))
    }

    /// Connect with a callback for each lifecycle event
    pub fn connect_with<O, M, C, F>(
        &mut self,
        on_open: O,
        on_message: M,
        on_closing: C,
        on_failure: F,
    ) -> Result<(), ExchangeError>
    where
        O: Fn(String) + Send + Sync + 'static,
        M: Fn(String) + Send + Sync + 'static,
        C: Fn(String) + Send + Sync + 'static,
        F: Fn(String) + Send + Sync + 'static,
    {
        self.connect_with_callbacks(WsCallbacks::new(on_open, on_message, on_closing, on_failure))
    }

    /// Open a new connection, replacing (and closing) any connection already held
    ///
    /// Only argument problems are reported here; the handshake runs in the
    /// background and its outcome arrives via `on_open` or `on_failure`.
    #[instrument(skip(self, callbacks), fields(base_url = %self.config.base_url()))]
    pub fn connect_with_callbacks(&mut self, callbacks: WsCallbacks) -> Result<(), ExchangeError> {
        let url = parse_ws_url(self.config.base_url())?;
        let transport = self.transport()?;

        if let ConnectionState::Connected(previous) = &self.state {
            warn!(
                connection_id = previous.id(),
                "Replacing active connection"
            );
            previous.close();
        }

        let connection = Arc::new(WebSocketConnection::new(url, callbacks, transport));
        let handler = RequestHandler::new(
            Arc::clone(&connection),
            self.config.api_key().to_string(),
            self.config.signer().cloned(),
        );

        self.handlers.replace(Some(Arc::new(handler)));
        self.state = ConnectionState::Connected(Arc::clone(&connection));

        connection.connect()
    }

    /// Close the current connection. Safe to call any number of times.
    #[instrument(skip(self))]
    pub fn close(&mut self) -> CloseOutcome {
        match std::mem::replace(&mut self.state, ConnectionState::Disconnected) {
            ConnectionState::Connected(connection) => {
                self.handlers.replace(None);
                connection.close();
                info!(connection_id = connection.id(), "Client disconnected");
                CloseOutcome::Closed
            }
            ConnectionState::Disconnected => CloseOutcome::AlreadyDisconnected,
        }
    }

    pub fn general(&self) -> Result<Arc<General>, ExchangeError> {
        self.category()
    }

    pub fn market(&self) -> Result<Arc<Market>, ExchangeError> {
        self.category()
    }

    pub fn trade(&self) -> Result<Arc<Trade>, ExchangeError> {
        self.category()
    }

    pub fn account(&self) -> Result<Arc<Account>, ExchangeError> {
        self.category()
    }

    pub fn user_data_stream(&self) -> Result<Arc<UserDataStream>, ExchangeError> {
        self.category()
    }

    /// Get or create the module for `T::CATEGORY`
    fn category<T: ApiCategory>(&self) -> Result<Arc<T>, ExchangeError> {
        if !self.handlers.is_set() {
            return Err(ExchangeError::NotConnected);
        }

        let module = Arc::clone(
            self.categories
                .lock()
                .entry(T::CATEGORY)
                .or_insert_with(|| {
                    debug!(category = ?T::CATEGORY, "Creating category module");
                    Arc::new(T::new(self.handlers.clone())) as Arc<dyn Any + Send + Sync>
                }),
        );

        module.downcast::<T>().map_err(|_| {
            ExchangeError::Other(format!(
                "Category cache holds an unexpected module for {:?}",
                T::CATEGORY
            ))
        })
    }

    fn transport(&mut self) -> Result<Arc<WsTransport>, ExchangeError> {
        if let Some(transport) = &self.transport {
            return Ok(Arc::clone(transport));
        }
        let transport = Arc::new(WsTransport::new()?);
        self.transport = Some(Arc::clone(&transport));
        Ok(transport)
    }
}

impl Drop for WebSocketApiClient {
    fn drop(&mut self) {
        self.close();
    }
}

fn parse_ws_url(base_url: &str) -> Result<Url, ExchangeError> {
    let url = Url::parse(base_url).map_err(|e| {
        ExchangeError::InvalidParameters(format!("Invalid base URL '{}': {}", base_url, e))
    })?;

    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(ExchangeError::InvalidParameters(format!(
            "Unsupported URL scheme '{}', expected ws or wss",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::WS_API_URL;
    use crate::core::kernel::HmacSigner;

    #[test]
    fn test_default_construction() {
        let client = WebSocketApiClient::new();
        assert_eq!(client.config().api_key(), "");
        assert!(client.config().signer().is_none());
        assert_eq!(client.config().base_url(), WS_API_URL);
        assert!(!client.is_connected());
    }

    #[test]
    fn test_base_url_construction() {
        let client = WebSocketApiClient::with_base_url("wss://example.com/ws-api/v3");
        assert_eq!(client.config().api_key(), "");
        assert!(client.config().signer().is_none());
        assert_eq!(client.config().base_url(), "wss://example.com/ws-api/v3");
    }

    #[test]
    fn test_credentials_use_default_url() {
        let signer: Arc<dyn Signer> = Arc::new(HmacSigner::new("secret".to_string()));
        let client = WebSocketApiClient::with_credentials("key", Some(signer));
        assert_eq!(client.config().api_key(), "key");
        assert!(client.config().signer().is_some());
        assert_eq!(client.config().base_url(), WS_API_URL);
    }

    #[test]
    fn test_accessors_require_connection() {
        let client = WebSocketApiClient::new();
        assert!(matches!(client.general(), Err(ExchangeError::NotConnected)));
        assert!(matches!(client.market(), Err(ExchangeError::NotConnected)));
        assert!(matches!(client.trade(), Err(ExchangeError::NotConnected)));
        assert!(matches!(client.account(), Err(ExchangeError::NotConnected)));
        assert!(matches!(
            client.user_data_stream(),
            Err(ExchangeError::NotConnected)
        ));
        assert!(client.categories.lock().is_empty());
    }

    #[test]
    fn test_close_before_connect() {
        let mut client = WebSocketApiClient::new();
        assert_eq!(client.close(), CloseOutcome::AlreadyDisconnected);
        assert_eq!(client.close(), CloseOutcome::AlreadyDisconnected);
    }

    #[test]
    fn test_invalid_url_fails_synchronously() {
        let mut client = WebSocketApiClient::with_base_url("not a url");
        assert!(matches!(
            client.connect(|_| {}),
            Err(ExchangeError::InvalidParameters(_))
        ));
        assert!(matches!(client.general(), Err(ExchangeError::NotConnected)));

        let mut client = WebSocketApiClient::with_base_url("https://example.com");
        assert!(matches!(
            client.connect(|_| {}),
            Err(ExchangeError::InvalidParameters(_))
        ));
    }

    #[tokio::test]
    async fn test_accessors_are_memoised() {
        // Nothing listens on the discard port; the failure arrives asynchronously
        let mut client = WebSocketApiClient::with_base_url("ws://127.0.0.1:9");
        client.connect(|_| {}).unwrap();

        assert!(Arc::ptr_eq(&client.general().unwrap(), &client.general().unwrap()));
        assert!(Arc::ptr_eq(&client.market().unwrap(), &client.market().unwrap()));
        assert!(Arc::ptr_eq(&client.trade().unwrap(), &client.trade().unwrap()));
        assert!(Arc::ptr_eq(&client.account().unwrap(), &client.account().unwrap()));
        assert!(Arc::ptr_eq(
            &client.user_data_stream().unwrap(),
            &client.user_data_stream().unwrap()
        ));
        assert_eq!(client.categories.lock().len(), 5);
    }

    #[tokio::test]
    async fn test_close_detaches_cached_modules() {
        let mut client = WebSocketApiClient::with_base_url("ws://127.0.0.1:9");
        client.connect(|_| {}).unwrap();
        let general = client.general().unwrap();

        assert_eq!(client.close(), CloseOutcome::Closed);
        assert_eq!(client.close(), CloseOutcome::AlreadyDisconnected);
        assert!(matches!(client.general(), Err(ExchangeError::NotConnected)));
        assert!(matches!(
            general.ping(Default::default()),
            Err(ExchangeError::NotConnected)
        ));

        // Reconnecting rebinds the module that was handed out earlier
        client.connect(|_| {}).unwrap();
        assert!(Arc::ptr_eq(&general, &client.general().unwrap()));
        assert!(general.ping(Default::default()).is_ok());
    }
}
