use crate::core::errors::ExchangeError;
use crate::core::kernel::codec::{build_payload, encode_request, payload_value};
use crate::core::kernel::{Signer, WebSocketConnection};
use parking_lot::RwLock;
use secrecy::{ExposeSecret, Secret};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Optional request parameters, passed through to the server verbatim
pub type Params = Map<String, Value>;

/// Builds, signs, and sends requests over one connection
pub struct RequestHandler {
    connection: Arc<WebSocketConnection>,
    api_key: Secret<String>,
    signer: Option<Arc<dyn Signer>>,
}

impl RequestHandler {
    pub fn new(
        connection: Arc<WebSocketConnection>,
        api_key: String,
        signer: Option<Arc<dyn Signer>>,
    ) -> Self {
        Self {
            connection,
            api_key: Secret::new(api_key),
            signer,
        }
    }

    pub fn connection(&self) -> &Arc<WebSocketConnection> {
        &self.connection
    }

    /// Send a request that needs no credentials
    #[instrument(skip(self, params), fields(connection_id = self.connection.id()))]
    pub fn public_request(&self, method: &str, params: Params) -> Result<String, ExchangeError> {
        self.send(method, params)
    }

    /// Send a request authenticated by API key only
    #[instrument(skip(self, params), fields(connection_id = self.connection.id()))]
    pub fn api_request(&self, method: &str, mut params: Params) -> Result<String, ExchangeError> {
        let api_key = self.require_api_key()?;
        params.insert("apiKey".to_string(), Value::String(api_key.to_string()));
        self.send(method, params)
    }

    /// Send a request signed over all of its parameters
    ///
    /// `apiKey` and `timestamp` are added before signing; the signature covers
    /// every parameter in sorted key order.
    #[instrument(skip(self, params), fields(connection_id = self.connection.id()))]
    pub fn signature_request(
        &self,
        method: &str,
        mut params: Params,
    ) -> Result<String, ExchangeError> {
        let api_key = self.require_api_key()?;
        let signer = self.signer.as_ref().ok_or_else(|| {
            ExchangeError::AuthError("A signer is required for signed requests".to_string())
        })?;

        let request_id = take_request_id(&mut params);

        params.insert("apiKey".to_string(), Value::String(api_key.to_string()));
        params.insert("timestamp".to_string(), Value::from(get_timestamp()));

        let signature = signer.sign(&build_payload(&params))?;
        params.insert("signature".to_string(), Value::String(signature));

        self.dispatch(request_id, method, &params)
    }

    fn require_api_key(&self) -> Result<&str, ExchangeError> {
        let api_key = self.api_key.expose_secret();
        if api_key.is_empty() {
            return Err(ExchangeError::AuthError(
                "An API key is required for this request".to_string(),
            ));
        }
        Ok(api_key)
    }

    fn send(&self, method: &str, mut params: Params) -> Result<String, ExchangeError> {
        let request_id = take_request_id(&mut params);
        self.dispatch(request_id, method, &params)
    }

    fn dispatch(
        &self,
        request_id: String,
        method: &str,
        params: &Params,
    ) -> Result<String, ExchangeError> {
        self.connection
            .send(encode_request(&request_id, method, params))?;
        debug!(method, request_id = %request_id, "Request queued");
        Ok(request_id)
    }
}

/// Use the caller's `requestId` if one was given, otherwise a fresh UUID
fn take_request_id(params: &mut Params) -> String {
    params
        .remove("requestId")
        .map(|id| payload_value(&id))
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Current time in milliseconds since the epoch
pub fn get_timestamp() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Shared pointer to whichever `RequestHandler` the client currently holds
///
/// Category modules keep a clone and resolve it on every call, so a
/// reconnect swaps the handler for all of them at once.
#[derive(Clone, Default)]
pub struct HandlerSlot(Arc<RwLock<Option<Arc<RequestHandler>>>>);

impl HandlerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Result<Arc<RequestHandler>, ExchangeError> {
        self.0.read().clone().ok_or(ExchangeError::NotConnected)
    }

    pub fn is_set(&self) -> bool {
        self.0.read().is_some()
    }

    pub fn replace(&self, handler: Option<Arc<RequestHandler>>) -> Option<Arc<RequestHandler>> {
        std::mem::replace(&mut *self.0.write(), handler)
    }
}
