//! Connection management for the stateful WebSocket transport.

use crate::classify::{classify, Disposition};
use crate::correlator::Correlator;
use crate::error::ClientError;
use crate::handshake::{HandshakeStep, HandshakeTracker};
use crate::state::{is_graceful_close, ConnectionState, Readiness};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use surrealkit_protocol::{
    Decoder, Encoder, Method, RpcError, RpcRequest, RpcResponse, SigninParams,
};
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Default namespace and database selected after signin.
pub const DEFAULT_NAMESPACE: &str = "test";
pub const DEFAULT_DATABASE: &str = "test";

/// Session identity sent during the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            username: "root".to_string(),
            password: "root".to_string(),
        }
    }
}

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// WebSocket endpoint, e.g. `ws://127.0.0.1:8000/rpc`.
    pub url: String,
    /// Identity used for `signin` / `use`.
    pub session: Session,
    /// Bounds opening the socket, and waiting for the handshake before a request.
    pub connect_timeout: Duration,
    /// Bounds waiting for a reply. `None` waits until the connection goes away.
    pub request_timeout: Option<Duration>,
}

impl ConnectionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            session: Session::default(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Some(Duration::from_secs(30)),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>, database: impl Into<String>) -> Self {
        self.session.namespace = namespace.into();
        self.session.database = database.into();
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.session.username = username.into();
        self.session.password = password.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Checks the URL scheme.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.url.starts_with("ws://") || self.url.starts_with("wss://") {
            Ok(())
        } else {
            Err(ClientError::InvalidUrl(self.url.clone()))
        }
    }
}

/// A connection to a SurrealDB RPC endpoint.
///
/// Requests are gated on the `signin` and `use` handshake. A request issued
/// while the socket is down reopens it first.
pub struct Connection {
    config: ConnectionConfig,
    session: RwLock<Session>,
    /// Write half of the socket for the current generation.
    writer: Mutex<Option<WsSink>>,
    /// Serializes socket opening.
    connect_lock: Mutex<()>,
    readiness: watch::Sender<Readiness>,
    correlator: Correlator,
    handshake: HandshakeTracker,
    /// Last critical rejection of a handshake step on the current socket.
    handshake_failure: RwLock<Option<(HandshakeStep, RpcError)>>,
    next_id: AtomicU32,
    /// Bumped for every socket; a read loop only affects its own generation.
    generation: AtomicU64,
}

impl Connection {
    /// Creates a new connection (not yet connected).
    pub fn new(config: ConnectionConfig) -> Self {
        let (readiness, _) = watch::channel(Readiness::new());
        Self {
            session: RwLock::new(config.session.clone()),
            config,
            writer: Mutex::new(None),
            connect_lock: Mutex::new(()),
            readiness,
            correlator: Correlator::new(),
            handshake: HandshakeTracker::new(),
            handshake_failure: RwLock::new(None),
            next_id: AtomicU32::new(0),
            generation: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Current session identity.
    pub fn session(&self) -> Session {
        self.session.read().clone()
    }

    /// Snapshot of state and handshake flags.
    pub fn readiness(&self) -> Readiness {
        *self.readiness.borrow()
    }

    pub fn state(&self) -> ConnectionState {
        self.readiness.borrow().state
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.borrow().is_ready()
    }

    /// Subscribes to readiness changes.
    pub fn subscribe(&self) -> watch::Receiver<Readiness> {
        self.readiness.subscribe()
    }

    /// Returns the number of requests awaiting a reply.
    pub fn pending_count(&self) -> usize {
        self.correlator.pending_count()
    }

    /// Mints the next request id. Wraps at `u32::MAX`.
    fn next_id(&self) -> String {
        self.next_id.fetch_add(1, Ordering::SeqCst).to_string()
    }

    fn transition(&self, next: ConnectionState) {
        if next == ConnectionState::Connecting {
            *self.handshake_failure.write() = None;
        }
        self.readiness.send_modify(|readiness| readiness.transition(next));
    }

    /// Returns the error a handshake step was rejected with, if any.
    pub fn handshake_error(&self) -> Option<RpcError> {
        self.handshake_failure
            .read()
            .as_ref()
            .map(|(_, error)| error.clone())
    }

    fn fail_handshake(&self, step: HandshakeStep, error: RpcError) {
        *self.handshake_failure.write() = Some((step, error));
        self.readiness
            .send_modify(|readiness| readiness.handshake_failed = true);
    }

    /// Forgets a rejection of `step` once it is retried or acknowledged.
    fn clear_handshake_failure(&self, step: HandshakeStep) {
        let mut failure = self.handshake_failure.write();
        if !matches!(failure.as_ref(), Some((failed, _)) if *failed == step) {
            return;
        }
        *failure = None;
        drop(failure);
        self.readiness
            .send_modify(|readiness| readiness.handshake_failed = false);
    }

    /// Opens the socket and sends the handshake.
    ///
    /// Returns once `signin` and `use` are transmitted; their acknowledgements
    /// arrive on the read loop. Does nothing if a socket is open or opening.
    pub async fn connect(self: &Arc<Self>) -> Result<(), ClientError> {
        let _guard = self.connect_lock.lock().await;
        if !self.state().needs_connect() {
            return Ok(());
        }
        self.config.validate()?;

        tracing::debug!(url = %self.config.url, "connecting");
        self.transition(ConnectionState::Connecting);
        self.handshake.reset();

        let opened = tokio::time::timeout(
            self.config.connect_timeout,
            connect_async(self.config.url.as_str()),
        )
        .await;
        let ws = match opened {
            Ok(Ok((ws, _))) => ws,
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "connection failed");
                self.transition(ConnectionState::Closed);
                return Err(e.into());
            }
            Err(_) => {
                tracing::debug!("connection timeout");
                self.transition(ConnectionState::Closed);
                return Err(ClientError::Timeout);
            }
        };

        let (sink, stream) = ws.split();
        let generation = {
            let mut writer = self.writer.lock().await;
            *writer = Some(sink);
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            self.transition(ConnectionState::Connected);
            generation
        };
        tracing::info!(url = %self.config.url, "websocket connection established");

        let conn = Arc::clone(self);
        tokio::spawn(async move { conn.read_loop(stream, generation).await });

        let session = self.session();
        self.send_handshake(
            HandshakeStep::Signin,
            SigninParams::new(session.username, session.password).into_params(),
        )
        .await?;
        self.send_handshake(
            HandshakeStep::Use,
            vec![json!(session.namespace), json!(session.database)],
        )
        .await
    }

    /// Closes the current socket (if any) and opens a new one.
    pub async fn reconnect(self: &Arc<Self>) -> Result<(), ClientError> {
        self.close().await?;
        self.connect().await
    }

    /// Closes the connection. Pending requests fail with `ConnectionClosed`.
    pub async fn close(&self) -> Result<(), ClientError> {
        let sink = {
            let mut writer = self.writer.lock().await;
            // Orphan the running read loop.
            self.generation.fetch_add(1, Ordering::SeqCst);
            self.transition(ConnectionState::Closed);
            writer.take()
        };
        self.handshake.reset();
        let dropped = self.correlator.fail_all();
        tracing::debug!(dropped, "connection closed locally");

        if let Some(mut sink) = sink {
            if let Err(e) = sink.close().await {
                tracing::debug!(error = %e, "error sending close frame");
            }
        }
        Ok(())
    }

    /// Replaces the credentials. Re-authenticates at once if connected.
    pub async fn signin(&self, username: &str, password: &str) -> Result<(), ClientError> {
        {
            let mut session = self.session.write();
            session.username = username.to_string();
            session.password = password.to_string();
        }
        self.clear_handshake_failure(HandshakeStep::Signin);
        if self.state() == ConnectionState::Connected {
            self.send_handshake(
                HandshakeStep::Signin,
                SigninParams::new(username, password).into_params(),
            )
            .await?;
        }
        Ok(())
    }

    /// Replaces the namespace and database. Re-selects at once if connected.
    pub async fn use_ns(&self, namespace: &str, database: &str) -> Result<(), ClientError> {
        {
            let mut session = self.session.write();
            session.namespace = namespace.to_string();
            session.database = database.to_string();
        }
        self.clear_handshake_failure(HandshakeStep::Use);
        if self.state() == ConnectionState::Connected {
            self.send_handshake(HandshakeStep::Use, vec![json!(namespace), json!(database)])
                .await?;
        }
        Ok(())
    }

    async fn send_handshake(&self, step: HandshakeStep, params: Vec<Value>) -> Result<(), ClientError> {
        let id = self.next_id();
        let request = RpcRequest::new(&id, step.method()).with_params(params);
        let encoded = Encoder::encode_request(&request)?;

        self.handshake.begin(&id, step);
        let mut writer = self.writer.lock().await;
        let Some(sink) = writer.as_mut() else {
            self.handshake.finish(&id);
            return Err(ClientError::NotConnected);
        };
        if let Err(e) = sink.send(Message::Text(encoded)).await {
            self.handshake.finish(&id);
            return Err(e.into());
        }
        tracing::debug!(id, method = %step.method(), "handshake step sent");
        Ok(())
    }

    /// Sends a command and waits for its result.
    ///
    /// Waits for the handshake first, reopening the socket if it is down.
    pub async fn request(self: &Arc<Self>, method: Method, params: Vec<Value>) -> Result<Value, ClientError> {
        let id = self.next_id();
        let request = RpcRequest::new(&id, method).with_params(params);
        let encoded = Encoder::encode_request(&request)?;

        let pending = loop {
            self.wait_ready().await?;

            let mut writer = self.writer.lock().await;
            // The socket may have gone away between the gate and the lock.
            if !self.is_ready() {
                continue;
            }
            let Some(sink) = writer.as_mut() else {
                continue;
            };

            let pending = self.correlator.register(&id);
            if let Err(e) = sink.send(Message::Text(encoded.clone())).await {
                self.correlator.cancel(&id);
                tracing::warn!(id, error = %e, "failed to send request");
                let generation = self.generation.load(Ordering::SeqCst);
                drop(writer);
                self.mark_closed(generation).await;
                return Err(e.into());
            }
            break pending;
        };
        tracing::debug!(id, %method, "request sent");

        self.correlator
            .await_result(pending, self.config.request_timeout)
            .await
    }

    /// Waits until the handshake has completed, connecting if needed.
    ///
    /// Fails with the server's error if a handshake step was rejected.
    async fn wait_ready(self: &Arc<Self>) -> Result<(), ClientError> {
        if self.is_ready() {
            return Ok(());
        }
        if self.state().needs_connect() {
            self.connect().await?;
        }

        let mut rx = self.readiness.subscribe();
        let waited = tokio::time::timeout(
            self.config.connect_timeout,
            rx.wait_for(|r| r.is_ready() || r.handshake_failed || r.state.needs_connect()),
        )
        .await;
        let readiness = match waited {
            Ok(Ok(readiness)) => *readiness,
            Ok(Err(_)) => return Err(ClientError::NotConnected),
            Err(_) => {
                tracing::debug!("timed out waiting for handshake");
                return Err(ClientError::Timeout);
            }
        };

        if readiness.is_ready() {
            Ok(())
        } else if readiness.handshake_failed {
            match self.handshake_error() {
                Some(error) => Err(ClientError::Rpc(error)),
                None => Err(ClientError::NotConnected),
            }
        } else {
            Err(ClientError::ConnectionClosed)
        }
    }

    /// Reads inbound frames until the socket closes or a newer one replaces it.
    async fn read_loop(self: Arc<Self>, mut stream: SplitStream<WsStream>, generation: u64) {
        tracing::debug!(generation, "read loop started");

        while let Some(frame) = stream.next().await {
            if self.generation.load(Ordering::SeqCst) != generation {
                tracing::debug!(generation, "read loop superseded");
                return;
            }
            match frame {
                Ok(Message::Text(text)) => match Decoder::decode_response(&text) {
                    Ok(message) => self.on_message(message),
                    Err(e) => tracing::warn!(error = %e, "ignoring undecodable message"),
                },
                Ok(Message::Binary(data)) => match Decoder::decode_response_bytes(&data) {
                    Ok(message) => self.on_message(message),
                    Err(e) => tracing::warn!(error = %e, "ignoring undecodable message"),
                },
                Ok(Message::Close(frame)) => {
                    match frame.map(|f| u16::from(f.code)) {
                        Some(code) if is_graceful_close(code) => {
                            tracing::info!(code, "websocket connection closed")
                        }
                        Some(code) => {
                            tracing::warn!(code, "websocket connection closed abnormally")
                        }
                        None => tracing::warn!("websocket connection closed without status code"),
                    }
                    self.mark_closed(generation).await;
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "websocket error");
                    self.mark_closed(generation).await;
                    return;
                }
            }
        }

        tracing::debug!(generation, "websocket stream ended");
        self.mark_closed(generation).await;
    }

    /// Moves to `Closed` if `generation` is still the current socket.
    async fn mark_closed(&self, generation: u64) {
        let mut writer = self.writer.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        writer.take();
        self.transition(ConnectionState::Closed);
        drop(writer);

        self.handshake.reset();
        let dropped = self.correlator.fail_all();
        if dropped > 0 {
            tracing::debug!(dropped, "failed pending requests");
        }
    }

    /// Routes one inbound message.
    fn on_message(&self, message: RpcResponse) {
        match classify(message) {
            Disposition::Result { id, value } => {
                if let Some(step) = self.handshake.finish(&id) {
                    self.acknowledge(step, &id, &value);
                } else {
                    self.correlator.deliver(&id, Ok(value));
                }
            }
            Disposition::Fatal { id: Some(id), error } => {
                if let Some(step) = self.handshake.finish(&id) {
                    tracing::error!(
                        id,
                        method = %step.method(),
                        code = error.code,
                        message = %error.message,
                        "handshake step failed"
                    );
                    self.fail_handshake(step, error);
                } else if !self.correlator.deliver(&id, Err(error.clone())) {
                    tracing::error!(id, code = error.code, message = %error.message, "rpc error");
                }
            }
            Disposition::Fatal { id: None, error } => {
                tracing::error!(code = error.code, message = %error.message, "rpc error");
            }
            Disposition::Recoverable { id, error } => {
                tracing::warn!(
                    id = id.as_deref().unwrap_or("<none>"),
                    code = error.code,
                    message = %error.message,
                    "recoverable rpc error"
                );
            }
            Disposition::Malformed(reason) => {
                tracing::warn!(%reason, "ignoring malformed message");
            }
        }
    }

    fn acknowledge(&self, step: HandshakeStep, id: &str, value: &Value) {
        if !step.is_expected_ack(value) {
            tracing::warn!(id, method = %step.method(), result = %value, "unexpected handshake reply");
        }
        self.clear_handshake_failure(step);
        self.readiness.send_modify(|readiness| match step {
            HandshakeStep::Signin => readiness.authenticated = true,
            HandshakeStep::Use => readiness.namespace_selected = true,
        });
        tracing::debug!(id, method = %step.method(), "handshake step acknowledged");
        if self.is_ready() {
            tracing::info!("connection ready");
        }
    }
}
