//! WebSocket client for the Signal K stream.
//!
//! Keeps one connection to the server alive, feeding every received delta
//! into the local [`DeltaBus`] and writing queued commands out.
//!
//! Subscriptions are registered with the client rather than sent directly:
//! every registered command goes out right after each (re)connect, and a
//! command is never sent twice on the same connection.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use signalk_bus::DeltaBus;
use signalk_types::{Delta, SubscribeCommand, UnsubscribeCommand};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, error, info, warn};

use super::frames::{parse_frame, ServerFrame};
use crate::config::{ReconnectConfig, ServerConfig};
use crate::error::ClientError;

/// Identifier of a registered subscribe command.
pub type CommandId = u64;

/// Work queued for the connection.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Outbound {
    Subscribe(CommandId),
    Unsubscribe(CommandId, UnsubscribeCommand),
    Delta(Delta),
}

/// Subscribe commands that must be active on every connection.
#[derive(Debug, Default)]
struct Registry {
    next_id: CommandId,
    commands: BTreeMap<CommandId, SubscribeCommand>,
}

impl Registry {
    fn snapshot(&self) -> Vec<(CommandId, SubscribeCommand)> {
        self.commands
            .iter()
            .map(|(id, command)| (*id, command.clone()))
            .collect()
    }
}

/// Cloneable handle for queueing work on the client.
#[derive(Clone)]
pub struct ClientHandle {
    outbound: mpsc::UnboundedSender<Outbound>,
    registry: Arc<Mutex<Registry>>,
}

impl ClientHandle {
    /// Register `command`, sending it now if connected and after every
    /// reconnect.
    ///
    /// # Errors
    ///
    /// `ClientError::Closed` once the connection loop has stopped.
    pub fn subscribe(&self, command: SubscribeCommand) -> Result<CommandId, ClientError> {
        let id = {
            let mut registry = self.registry.lock();
            registry.next_id += 1;
            let id = registry.next_id;
            registry.commands.insert(id, command);
            id
        };

        if self.outbound.send(Outbound::Subscribe(id)).is_err() {
            self.registry.lock().commands.remove(&id);
            return Err(ClientError::Closed);
        }
        Ok(id)
    }

    /// Drop a registered command and unsubscribe it on the server.
    pub fn unsubscribe(&self, id: CommandId) {
        let Some(command) = self.registry.lock().commands.remove(&id) else {
            return;
        };
        if self
            .outbound
            .send(Outbound::Unsubscribe(id, command.to_unsubscribe()))
            .is_err()
        {
            debug!(id, "Client stopped, unsubscribe not sent");
        }
    }

    /// Queue a delta for the server.
    ///
    /// # Errors
    ///
    /// `ClientError::Closed` once the connection loop has stopped.
    pub fn send_delta(&self, delta: Delta) -> Result<(), ClientError> {
        self.outbound
            .send(Outbound::Delta(delta))
            .map_err(|_| ClientError::Closed)
    }

    /// Number of registered subscribe commands.
    #[must_use]
    pub fn registered(&self) -> usize {
        self.registry.lock().commands.len()
    }
}

/// Why the connection loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientExit {
    /// Shutdown was requested.
    Shutdown,
    /// Every reconnect attempt failed.
    GaveUp { attempts: u32 },
}

impl fmt::Display for ClientExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shutdown => f.write_str("shut down"),
            Self::GaveUp { attempts } => write!(f, "gave up after {attempts} failed connection attempts"),
        }
    }
}

/// Signal K server client.
pub struct SignalKClient {
    server: ServerConfig,
    bus: Arc<DeltaBus>,
    handle: ClientHandle,
    outbound: Mutex<Option<mpsc::UnboundedReceiver<Outbound>>>,
    exit: Arc<watch::Sender<Option<ClientExit>>>,
}

impl SignalKClient {
    /// Create a client feeding `bus`. Nothing connects until [`Self::spawn`].
    pub fn new(server: ServerConfig, bus: Arc<DeltaBus>) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        Self {
            server,
            bus,
            handle: ClientHandle {
                outbound: outbound_tx,
                registry: Arc::new(Mutex::new(Registry::default())),
            },
            outbound: Mutex::new(Some(outbound_rx)),
            exit: Arc::new(watch::channel(None).0),
        }
    }

    /// Watch for the end of the connection loop. Holds `None` while it runs.
    #[must_use]
    pub fn exit(&self) -> watch::Receiver<Option<ClientExit>> {
        self.exit.subscribe()
    }

    /// A handle for queueing work.
    #[must_use]
    pub fn handle(&self) -> ClientHandle {
        self.handle.clone()
    }

    /// Take the outbound queue without starting the connection loop.
    #[cfg(test)]
    pub(crate) fn take_outbound(&self) -> Option<mpsc::UnboundedReceiver<Outbound>> {
        self.outbound.lock().take()
    }

    /// Start the connection loop. It runs until `shutdown` turns true or
    /// the reconnect attempts run out; the outcome is published on
    /// [`Self::exit`].
    ///
    /// # Errors
    ///
    /// `ClientError::AlreadyStarted` on a second call.
    pub fn spawn(&self, shutdown: watch::Receiver<bool>) -> Result<JoinHandle<ClientExit>, ClientError> {
        let outbound = self.outbound.lock().take().ok_or(ClientError::AlreadyStarted)?;
        let server = self.server.clone();
        let bus = Arc::clone(&self.bus);
        let registry = Arc::clone(&self.handle.registry);
        let exit = Arc::clone(&self.exit);

        Ok(tokio::spawn(async move {
            let outcome = connection_loop(server, bus, registry, outbound, shutdown).await;
            exit.send_replace(Some(outcome));
            outcome
        }))
    }
}

/// How a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disconnect {
    /// Shutdown requested, or every handle dropped.
    Shutdown,
    /// The connection was lost.
    Closed,
}

/// Connection loop with reconnection logic.
///
/// The receiver is dropped on return, so queued and future work fails with
/// `ClientError::Closed`.
async fn connection_loop(
    server: ServerConfig,
    bus: Arc<DeltaBus>,
    registry: Arc<Mutex<Registry>>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    mut shutdown: watch::Receiver<bool>,
) -> ClientExit {
    let mut attempts = 0u32;

    let outcome = loop {
        if *shutdown.borrow() {
            break ClientExit::Shutdown;
        }

        match run_connection(&server, &bus, &registry, &mut outbound, &mut shutdown).await {
            Ok(Disconnect::Shutdown) => break ClientExit::Shutdown,
            Ok(Disconnect::Closed) => {
                attempts = 0;
                warn!(url = %server.url, "Disconnected from Signal K server");
            }
            Err(e) => {
                attempts += 1;
                warn!(error = %e, attempts, "Signal K connection failed");
                if !should_retry(attempts, &server.reconnect) {
                    error!(attempts, "Giving up reconnecting to Signal K server");
                    break ClientExit::GaveUp { attempts };
                }
            }
        }

        let delay = backoff_delay(attempts, &server.reconnect);
        info!(delay_secs = delay.as_secs(), "Reconnecting to Signal K server");
        let stopping = tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            _ = shutdown.changed() => true,
        };
        if stopping {
            break ClientExit::Shutdown;
        }
    };

    info!(outcome = %outcome, "Signal K client stopped");
    outcome
}

/// Whether another attempt is allowed after `attempts` consecutive failures.
#[must_use]
pub fn should_retry(attempts: u32, reconnect: &ReconnectConfig) -> bool {
    reconnect.max_attempts == 0 || attempts < reconnect.max_attempts
}

/// Exponential backoff: the base delay, doubled per further failure, capped.
#[must_use]
pub fn backoff_delay(attempts: u32, reconnect: &ReconnectConfig) -> Duration {
    let exponent = attempts.saturating_sub(1).min(16);
    let secs = reconnect
        .base_delay_secs
        .saturating_mul(1u64 << exponent)
        .min(reconnect.max_delay_secs);
    Duration::from_secs(secs)
}

/// Run a single WebSocket connection.
async fn run_connection(
    server: &ServerConfig,
    bus: &DeltaBus,
    registry: &Mutex<Registry>,
    outbound: &mut mpsc::UnboundedReceiver<Outbound>,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<Disconnect, ClientError> {
    let request = connect_request(server)?;
    let (ws_stream, _) = tokio::select! {
        result = connect_async(request) => result.map_err(|source| ClientError::Connect {
            url: server.url.clone(),
            source,
        })?,
        _ = shutdown.changed() => return Ok(Disconnect::Shutdown),
    };
    info!(url = %server.url, "Connected to Signal K server");

    let (mut write, mut read) = ws_stream.split();

    // Registered subscriptions first, then whatever is queued
    let mut sent = HashSet::new();
    let registered = registry.lock().snapshot();
    for (id, command) in registered {
        send_json(&mut write, &command).await?;
        sent.insert(id);
    }
    if !sent.is_empty() {
        debug!(count = sent.len(), "Subscriptions sent");
    }

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    // Flush what was queued before the shutdown, unsubscribes included
                    while let Ok(item) = outbound.try_recv() {
                        if send_outbound(&mut write, registry, &mut sent, item).await.is_err() {
                            break;
                        }
                    }
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(Disconnect::Shutdown);
                }
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => handle_text(text.as_str(), bus),
                Some(Ok(Message::Ping(data))) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(frame = ?frame, "Server closed the connection");
                    return Ok(Disconnect::Closed);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket read failed");
                    return Ok(Disconnect::Closed);
                }
                None => return Ok(Disconnect::Closed),
            },
            item = outbound.recv() => {
                let Some(item) = item else {
                    return Ok(Disconnect::Shutdown);
                };
                if let Err(e) = send_outbound(&mut write, registry, &mut sent, item).await {
                    warn!(error = %e, "Failed to send to Signal K server");
                    return Ok(Disconnect::Closed);
                }
            }
        }
    }
}

fn connect_request(server: &ServerConfig) -> Result<Request, ClientError> {
    let mut request = server
        .url
        .as_str()
        .into_client_request()
        .map_err(|e| ClientError::Request { reason: e.to_string() })?;

    if let Some(token) = &server.token {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| ClientError::Request { reason: e.to_string() })?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }
    Ok(request)
}

async fn send_outbound<S>(
    write: &mut S,
    registry: &Mutex<Registry>,
    sent: &mut HashSet<CommandId>,
    item: Outbound,
) -> Result<(), ClientError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    match item {
        Outbound::Subscribe(id) => {
            if sent.contains(&id) {
                return Ok(());
            }
            // Released before it went out
            let Some(command) = registry.lock().commands.get(&id).cloned() else {
                return Ok(());
            };
            send_json(write, &command).await?;
            sent.insert(id);
        }
        Outbound::Unsubscribe(id, command) => {
            // The server never saw it on this connection
            if !sent.remove(&id) {
                return Ok(());
            }
            send_json(write, &command).await?;
        }
        Outbound::Delta(delta) => send_json(write, &delta).await?,
    }
    Ok(())
}

async fn send_json<S, T>(write: &mut S, value: &T) -> Result<(), ClientError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
    T: Serialize + ?Sized,
{
    let text = serde_json::to_string(value)?;
    debug!(frame = %text, "Sending frame");
    write.send(Message::Text(text.into())).await?;
    Ok(())
}

/// Handle a text frame from the server.
fn handle_text(text: &str, bus: &DeltaBus) {
    match parse_frame(text) {
        Ok(ServerFrame::Hello(hello)) => {
            info!(server = ?hello.name, version = ?hello.version, "Received hello");
            if let Some(context) = hello.self_context() {
                bus.set_self_context(context);
            }
        }
        Ok(ServerFrame::Delta(delta)) => {
            bus.publish(delta);
        }
        Ok(ServerFrame::Reply(reply)) => {
            if reply.is_error() {
                warn!(
                    request_id = %reply.request_id,
                    status = ?reply.status_code,
                    message = ?reply.message,
                    "Server rejected request"
                );
            } else {
                debug!(request_id = %reply.request_id, state = ?reply.state, "Request reply");
            }
        }
        Ok(ServerFrame::Other(_)) => debug!("Ignoring unrecognised frame"),
        Err(e) => warn!(error = %e, "Malformed frame"),
    }
}
