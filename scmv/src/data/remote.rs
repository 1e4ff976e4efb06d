use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError, RwLock,
    },
    time::Duration,
};

use scmv_config::Config;
use serde::{Deserialize, Serialize};

use crate::context::AppContext;

pub const WS_URL: &str = "wss://scmv.vpngps.com:4445";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpClientConfig {
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 30_000,
            read_timeout_ms: 30_000,
            write_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsClientConfig {
    pub url: String,
    pub reconnect_delay_ms: u64,
}

impl Default for WsClientConfig {
    fn default() -> Self {
        Self {
            url: WS_URL.to_string(),
            reconnect_delay_ms: 5000,
        }
    }
}

/// Transport settings shared by every remote client
#[derive(Debug, Clone)]
pub struct HttpClient {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub user_agent: String,
}

impl HttpClient {
    pub fn new(config: &HttpClientConfig, context: &AppContext) -> Self {
        Self {
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            read_timeout: Duration::from_millis(config.read_timeout_ms),
            write_timeout: Duration::from_millis(config.write_timeout_ms),
            user_agent: context.user_agent(),
        }
    }

    pub fn provide(config: Config<HttpClientConfig>, context: Arc<AppContext>) -> Self {
        Self::new(&config, &context)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error(String),
}

/// Client for the scmv WebSocket server
///
/// Tracks the connection lifecycle, the socket itself is driven by the host through
/// [WsClient::on_open], [WsClient::on_failure] and [WsClient::on_closed].
/// Constructing it never opens a connection.
pub struct WsClient {
    http: Arc<HttpClient>,
    url: RwLock<String>,
    reconnect_delay: Duration,
    state: RwLock<ConnectionState>,
    should_reconnect: AtomicBool,
    /// Frames accepted by [WsClient::send], waiting for the socket
    outgoing: Mutex<Vec<String>>,
}

impl WsClient {
    pub fn new(http: Arc<HttpClient>, config: &WsClientConfig) -> Self {
        Self {
            http,
            url: RwLock::new(config.url.clone()),
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
            state: RwLock::new(ConnectionState::Disconnected),
            should_reconnect: AtomicBool::new(false),
            outgoing: Mutex::default(),
        }
    }

    pub fn provide(http: Arc<HttpClient>, config: Config<WsClientConfig>) -> Self {
        Self::new(http, &config)
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn url(&self) -> String {
        self.url.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Changes the server url, used by the next connection attempt
    pub fn set_url(&self, url: &str) {
        tracing::info!("Switching WebSocket url to {url}");
        *self.url.write().unwrap_or_else(PoisonError::into_inner) = url.to_string();
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    /// Whether a dropped connection should be retried after [WsClient::reconnect_delay]
    pub fn should_reconnect(&self) -> bool {
        self.should_reconnect.load(Ordering::SeqCst)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    /// Starts connecting, no-op while connected or connecting
    pub fn connect(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, ConnectionState::Connected | ConnectionState::Connecting) {
            tracing::debug!("Already connected or connecting");
            return;
        }

        self.should_reconnect.store(true, Ordering::SeqCst);
        tracing::info!("Connecting to {}", self.url());
        *state = ConnectionState::Connecting;
    }

    /// The socket finished its handshake
    pub fn on_open(&self) {
        tracing::info!("Connected to {}", self.url());
        self.set_state(ConnectionState::Connected);
    }

    pub fn on_failure(&self, message: &str) {
        tracing::warn!("WebSocket failure: {message}");
        self.set_state(ConnectionState::Error(message.to_string()));
        self.drop_outgoing();
    }

    /// The socket was closed by the server, a failure stays visible
    pub fn on_closed(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if !matches!(*state, ConnectionState::Error(_)) {
            *state = ConnectionState::Disconnected;
        }
        drop(state);
        self.drop_outgoing();
    }

    /// Closes the connection and disables reconnecting until the next [WsClient::connect]
    pub fn disconnect(&self) {
        self.should_reconnect.store(false, Ordering::SeqCst);
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if *state != ConnectionState::Disconnected {
            tracing::info!("Disconnecting from {}", self.url());
            *state = ConnectionState::Disconnected;
        }
        drop(state);
        self.drop_outgoing();
    }

    /// Queues a text frame - returns false if there is no open connection
    pub fn send(&self, message: &str) -> bool {
        if !self.is_connected() {
            tracing::warn!("Dropped message of {} bytes, not connected", message.len());
            return false;
        }
        tracing::debug!("Sending {} bytes", message.len());
        self.outgoing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
        true
    }

    /// Hands the queued frames to the socket
    pub fn take_outgoing(&self) -> Vec<String> {
        std::mem::take(&mut *self.outgoing.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn drop_outgoing(&self) {
        self.outgoing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
