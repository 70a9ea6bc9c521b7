//! Reconnecting push-channel client.
//!
//! One background task owns at most one live connection. The desired endpoint
//! lives in a `watch` channel: setting it starts a connection, clearing it tears
//! the connection down, and re-setting the same value is a no-op. Every connect
//! attempt, including the one after a retry delay, re-reads the desired
//! endpoint first, so a stale timer can never reconnect to a cleared target.
//!
//! States: `Disconnected -> Connecting -> Open -> Disconnected`.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use eventhub_protocol::{Envelope, ServerFrame};
use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_CLOSE_RETRY_SECS, DEFAULT_ERROR_RETRY_SECS};
use crate::error::{ClientError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Disconnected,
    Connecting,
    Open,
}

/// Fixed reconnect delays. No backoff, no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// After the server closed an open stream.
    pub after_close: Duration,
    /// After a failed handshake or a transport error.
    pub after_error: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            after_close: Duration::from_secs(DEFAULT_CLOSE_RETRY_SECS),
            after_error: Duration::from_secs(DEFAULT_ERROR_RETRY_SECS),
        }
    }
}

/// Callback for every parsed notification.
pub type Handler = Arc<dyn Fn(Envelope) + Send + Sync>;

/// Opens transport connections. Swapped for a fake in tests.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Connection>>;
}

/// One open duplex transport, reduced to what the stream client needs.
#[async_trait]
pub trait Connection: Send {
    /// Next inbound text frame. `None` once the peer has closed.
    async fn next_text(&mut self) -> Option<Result<String>>;

    async fn close(&mut self);
}

/// Handle to the background connection task.
pub struct StreamClient {
    endpoint: watch::Sender<Option<String>>,
    state: watch::Receiver<StreamState>,
    handler: Arc<RwLock<Handler>>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StreamClient {
    /// Start the background task. It idles in `Disconnected` until an
    /// endpoint is set.
    pub fn spawn(connector: Arc<dyn Connector>, policy: RetryPolicy, handler: Handler) -> Self {
        let (endpoint_tx, endpoint_rx) = watch::channel(None);
        let (state_tx, state_rx) = watch::channel(StreamState::Disconnected);
        let handler = Arc::new(RwLock::new(handler));
        let cancel = CancellationToken::new();

        let driver = Driver {
            connector,
            policy,
            endpoint: endpoint_rx,
            state: state_tx,
            handler: Arc::clone(&handler),
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(driver.run());

        Self {
            endpoint: endpoint_tx,
            state: state_rx,
            handler,
            cancel,
            task: Mutex::new(Some(task)),
        }
    }

    /// Set or clear the target endpoint. Setting the current value again does
    /// nothing, so callers may invoke this on every session refresh.
    pub fn set_endpoint(&self, endpoint: Option<String>) {
        self.endpoint.send_if_modified(|current| {
            if *current == endpoint {
                false
            } else {
                *current = endpoint;
                true
            }
        });
    }

    /// Replace the notification callback. Takes effect for the next frame,
    /// including on an already-open connection.
    pub fn set_handler(&self, handler: Handler) {
        *self.handler.write().unwrap() = handler;
    }

    pub fn state(&self) -> StreamState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<StreamState> {
        self.state.clone()
    }

    /// Cancel any pending retry, close the live connection and wait for the
    /// task to finish. Idempotent.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let task = self.task.lock().unwrap().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Why a live connection ended.
enum Exit {
    Closed,
    Failed,
    EndpointChanged,
    Cancelled,
}

struct Driver {
    connector: Arc<dyn Connector>,
    policy: RetryPolicy,
    endpoint: watch::Receiver<Option<String>>,
    state: watch::Sender<StreamState>,
    handler: Arc<RwLock<Handler>>,
    cancel: CancellationToken,
}

impl Driver {
    async fn run(mut self) {
        loop {
            let Some(endpoint) = self.desired_endpoint().await else {
                break;
            };

            self.state.send_replace(StreamState::Connecting);
            debug!(%endpoint, "connecting");
            let attempt = tokio::select! {
                _ = self.cancel.cancelled() => break,
                res = self.connector.connect(&endpoint) => Some(res),
                _ = moved_away(&mut self.endpoint, &endpoint) => None,
            };
            let Some(attempt) = attempt else {
                info!(%endpoint, "stream endpoint changed during handshake, abandoning attempt");
                self.state.send_replace(StreamState::Disconnected);
                continue;
            };

            let delay = match attempt {
                Ok(mut conn) => {
                    // the target may have moved while the handshake was in flight
                    if self.endpoint.borrow().as_deref() != Some(endpoint.as_str()) {
                        conn.close().await;
                        self.state.send_replace(StreamState::Disconnected);
                        continue;
                    }
                    self.state.send_replace(StreamState::Open);
                    info!(%endpoint, "stream open");

                    let exit = self.pump(conn.as_mut(), &endpoint).await;
                    conn.close().await;
                    self.state.send_replace(StreamState::Disconnected);
                    match exit {
                        Exit::Cancelled => break,
                        Exit::EndpointChanged => continue,
                        Exit::Closed => {
                            info!(retry_in = ?self.policy.after_close, "stream closed by server");
                            self.policy.after_close
                        }
                        Exit::Failed => self.policy.after_error,
                    }
                }
                Err(e) => {
                    warn!(%endpoint, error = %e, retry_in = ?self.policy.after_error, "stream connect failed");
                    self.state.send_replace(StreamState::Disconnected);
                    self.policy.after_error
                }
            };

            // wait out the delay; an endpoint change cuts it short and the
            // next iteration decides whether to connect at all
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
                changed = self.endpoint.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        self.state.send_replace(StreamState::Disconnected);
        debug!("stream task stopped");
    }

    /// Block until an endpoint is configured. `None` means stop.
    async fn desired_endpoint(&mut self) -> Option<String> {
        loop {
            if let Some(endpoint) = self.endpoint.borrow_and_update().clone() {
                return Some(endpoint);
            }
            tokio::select! {
                _ = self.cancel.cancelled() => return None,
                changed = self.endpoint.changed() => changed.ok()?,
            }
        }
    }

    async fn pump(&mut self, conn: &mut dyn Connection, endpoint: &str) -> Exit {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return Exit::Cancelled,
                _ = moved_away(&mut self.endpoint, endpoint) => {
                    info!("stream endpoint changed, disconnecting");
                    return Exit::EndpointChanged;
                }
                frame = conn.next_text() => match frame {
                    Some(Ok(text)) => self.dispatch(&text),
                    Some(Err(e)) => {
                        warn!(error = %e, retry_in = ?self.policy.after_error, "stream transport error");
                        return Exit::Failed;
                    }
                    None => return Exit::Closed,
                },
            }
        }
    }

    fn dispatch(&self, text: &str) {
        match ServerFrame::parse(text) {
            Ok(ServerFrame::Connected(hello)) => debug!(message = %hello.message, "server hello"),
            Ok(ServerFrame::Notification(envelope)) => {
                // read per frame so a replaced handler applies immediately
                let handler = Arc::clone(&*self.handler.read().unwrap());
                handler(envelope);
            }
            Err(e) => warn!(error = %e, len = text.len(), "dropping malformed frame"),
        }
    }
}

/// Resolves once the desired endpoint is no longer `endpoint`, or the client
/// handle is gone. Re-setting the same value keeps it pending.
async fn moved_away(rx: &mut watch::Receiver<Option<String>>, endpoint: &str) {
    loop {
        if rx.changed().await.is_err() {
            return;
        }
        if rx.borrow_and_update().as_deref() != Some(endpoint) {
            return;
        }
    }
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// WebSocket transport over `tokio-tungstenite`.
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Connection>> {
        let (ws, _) = tokio_tungstenite::connect_async(endpoint)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Box::new(WsConnection { ws }))
    }
}

struct WsConnection {
    ws: WsStream,
}

#[async_trait]
impl Connection for WsConnection {
    async fn next_text(&mut self) -> Option<Result<String>> {
        use tokio_tungstenite::tungstenite::Message;
        loop {
            match self.ws.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(_)) => return None,
                // pings are answered by tungstenite itself
                Ok(_) => continue,
                Err(e) => return Some(Err(ClientError::Transport(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.ws.close(None).await;
    }
}
