use crate::core::errors::ExchangeError;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// WebSocket connection configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Handshake timeout in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000, // 10 seconds
        }
    }
}

/// Executor every connection's socket I/O runs on
///
/// Shared by reference counting: hand the same `Arc<WsTransport>` to several
/// clients to multiplex them on one runtime. A runtime owned by the transport
/// is shut down when the last reference goes away.
pub struct WsTransport {
    handle: Handle,
    runtime: Option<Runtime>,
}

impl WsTransport {
    /// Bind to the ambient tokio runtime if there is one, otherwise own a runtime
    pub fn new() -> Result<Self, ExchangeError> {
        Handle::try_current().map_or_else(|_| Self::owned(), |handle| Ok(Self::from_handle(handle)))
    }

    /// Bind to the tokio runtime the caller is running in
    pub fn current() -> Result<Self, ExchangeError> {
        let handle = Handle::try_current().map_err(|e| {
            ExchangeError::Other(format!("No tokio runtime available for transport: {}", e))
        })?;
        Ok(Self::from_handle(handle))
    }

    /// Build a dedicated multi-threaded runtime for socket I/O
    pub fn owned() -> Result<Self, ExchangeError> {
        let runtime = Builder::new_multi_thread()
            .enable_all()
            .thread_name("wsapi-transport")
            .build()
            .map_err(|e| {
                ExchangeError::Other(format!("Failed to build transport runtime: {}", e))
            })?;

        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
        })
    }

    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            runtime: None,
        }
    }

    pub fn owns_runtime(&self) -> bool {
        self.runtime.is_some()
    }

    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        // shutdown_background never blocks, so this is safe inside async contexts
        if let Some(runtime) = self.runtime.take() {
            debug!("Shutting down owned transport runtime");
            runtime.shutdown_background();
        }
    }
}

/// Callback invoked with a single string payload
pub type WebSocketCallback = Arc<dyn Fn(String) + Send + Sync>;

/// The four lifecycle callbacks of a connection
#[derive(Clone)]
pub struct WsCallbacks {
    pub on_open: WebSocketCallback,
    pub on_message: WebSocketCallback,
    pub on_closing: WebSocketCallback,
    pub on_failure: WebSocketCallback,
}

impl WsCallbacks {
    pub fn new<O, M, C, F>(on_open: O, on_message: M, on_closing: C, on_failure: F) -> Self
    where
        O: Fn(String) + Send + Sync + 'static,
        M: Fn(String) + Send + Sync + 'static,
        C: Fn(String) + Send + Sync + 'static,
        F: Fn(String) + Send + Sync + 'static,
    {
        Self {
            on_open: Arc::new(on_open),
            on_message: Arc::new(on_message),
            on_closing: Arc::new(on_closing),
            on_failure: Arc::new(on_failure),
        }
    }

    /// Only `on_message` does anything; the other events are discarded
    pub fn message_only<M>(on_message: M) -> Self
    where
        M: Fn(String) + Send + Sync + 'static,
    {
        Self {
            on_open: noop_callback(),
            on_message: Arc::new(on_message),
            on_closing: noop_callback(),
            on_failure: noop_callback(),
        }
    }
}

pub fn noop_callback() -> WebSocketCallback {
    Arc::new(|_| {})
}

/// Observable state of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReadyState {
    Idle = 0,
    Connecting = 1,
    Open = 2,
    Closed = 3,
}

impl From<u8> for ReadyState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Connecting,
            2 => Self::Open,
            _ => Self::Closed,
        }
    }
}

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Routes socket events to the user's callbacks until the connection is closed locally
#[derive(Clone)]
struct Emitter {
    callbacks: WsCallbacks,
    closed: Arc<AtomicBool>,
}

impl Emitter {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn emit(&self, callback: &WebSocketCallback, payload: String) {
        if !self.is_closed() {
            callback(payload);
        }
    }

    fn open(&self, payload: String) {
        self.emit(&self.callbacks.on_open, payload);
    }

    fn message(&self, payload: String) {
        self.emit(&self.callbacks.on_message, payload);
    }

    fn closing(&self, payload: String) {
        self.emit(&self.callbacks.on_closing, payload);
    }

    fn failure(&self, payload: String) {
        self.emit(&self.callbacks.on_failure, payload);
    }
}

/// A single WebSocket connection driven by a background task on the transport
pub struct WebSocketConnection {
    id: u64,
    url: Url,
    config: WsConfig,
    emitter: Emitter,
    transport: Arc<WsTransport>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    ready_state: Arc<AtomicU8>,
}

impl WebSocketConnection {
    pub fn new(url: Url, callbacks: WsCallbacks, transport: Arc<WsTransport>) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            url,
            config: WsConfig::default(),
            emitter: Emitter {
                callbacks,
                closed: Arc::new(AtomicBool::new(false)),
            },
            transport,
            outbound: Mutex::new(None),
            ready_state: Arc::new(AtomicU8::new(ReadyState::Idle as u8)),
        }
    }

    pub fn with_config(mut self, config: WsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn ready_state(&self) -> ReadyState {
        ReadyState::from(self.ready_state.load(Ordering::SeqCst))
    }

    pub fn is_closed(&self) -> bool {
        self.emitter.is_closed()
    }

    /// Start the handshake in the background; completion is reported through `on_open`
    #[instrument(skip(self), fields(connection_id = self.id, url = %self.url))]
    pub fn connect(&self) -> Result<(), ExchangeError> {
        if self.is_closed() {
            return Err(ExchangeError::NotConnected);
        }

        let mut outbound = self.outbound.lock();
        if outbound.is_some() {
            return Err(ExchangeError::WebSocketError(format!(
                "Connection {} already started",
                self.id
            )));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *outbound = Some(tx);
        self.ready_state
            .store(ReadyState::Connecting as u8, Ordering::SeqCst);

        info!("Connecting to {}", self.url);
        self.transport.spawn(run_connection(
            self.id,
            self.url.to_string(),
            Duration::from_millis(self.config.connect_timeout_ms),
            self.emitter.clone(),
            Arc::clone(&self.ready_state),
            rx,
        ));
        Ok(())
    }

    /// Queue a frame for sending; frames queued during the handshake go out once it completes
    pub fn send(&self, message: Message) -> Result<(), ExchangeError> {
        if self.is_closed() || self.ready_state() == ReadyState::Closed {
            return Err(ExchangeError::NotConnected);
        }

        let outbound = self.outbound.lock();
        let tx = outbound.as_ref().ok_or(ExchangeError::NotConnected)?;
        tx.send(message).map_err(|_| ExchangeError::NotConnected)
    }

    pub fn send_text(&self, text: String) -> Result<(), ExchangeError> {
        self.send(Message::Text(text))
    }

    /// Close the connection. Returns `false` if it was already closed.
    ///
    /// Callbacks are silenced before the close frame is queued, so nothing
    /// fires for this connection once `close` returns.
    #[instrument(skip(self), fields(connection_id = self.id))]
    pub fn close(&self) -> bool {
        if self.emitter.closed.swap(true, Ordering::SeqCst) {
            return false;
        }

        if let Some(tx) = self.outbound.lock().take() {
            let _ = tx.send(Message::Close(None));
        }
        self.ready_state
            .store(ReadyState::Closed as u8, Ordering::SeqCst);
        info!("Connection closed by client");
        true
    }
}

impl Drop for WebSocketConnection {
    fn drop(&mut self) {
        self.close();
    }
}

#[instrument(skip_all, fields(connection_id = id, url = %url))]
async fn run_connection(
    id: u64,
    url: String,
    connect_timeout: Duration,
    emitter: Emitter,
    ready_state: Arc<AtomicU8>,
    mut outbound: mpsc::UnboundedReceiver<Message>,
) {
    let set_state = |state: ReadyState| ready_state.store(state as u8, Ordering::SeqCst);

    let ws_stream = match tokio::time::timeout(connect_timeout, connect_async(url.as_str())).await
    {
        Ok(Ok((stream, _))) => stream,
        Ok(Err(e)) => {
            warn!("WebSocket connection failed: {}", e);
            set_state(ReadyState::Closed);
            emitter.failure(format!("WebSocket connection failed: {}", e));
            return;
        }
        Err(_) => {
            warn!("WebSocket connection timeout");
            set_state(ReadyState::Closed);
            emitter.failure("WebSocket connection timeout".to_string());
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    if emitter.is_closed() {
        // Closed locally while the handshake was in flight
        let _ = write.send(Message::Close(None)).await;
        return;
    }

    set_state(ReadyState::Open);
    info!("Connected");
    emitter.open(id.to_string());

    loop {
        tokio::select! {
            outgoing = outbound.recv() => match outgoing {
                Some(Message::Close(frame)) => {
                    let _ = write.send(Message::Close(frame)).await;
                    break;
                }
                Some(message) => {
                    if let Err(e) = write.send(message).await {
                        warn!("Failed to send WebSocket message: {}", e);
                        emitter.failure(format!("Failed to send WebSocket message: {}", e));
                        break;
                    }
                }
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => emitter.message(text),
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                    Ok(text) => emitter.message(text),
                    Err(e) => warn!("Dropping non UTF-8 binary frame: {}", e),
                },
                Some(Ok(Message::Ping(payload))) => {
                    if let Err(e) = write.send(Message::Pong(payload)).await {
                        warn!("Failed to send pong response: {}", e);
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map(|f| f.reason.to_string()).unwrap_or_default();
                    debug!("Server closed connection: {}", reason);
                    emitter.closing(reason);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket error: {}", e);
                    emitter.failure(format!("WebSocket error: {}", e));
                    break;
                }
                None => {
                    emitter.closing(String::new());
                    break;
                }
            }
        }
    }

    set_state(ReadyState::Closed);
}
