//! Persistent subscription connection.
//!
//! A [`Connection`] multiplexes any number of subscription channels over one
//! socket. It does no I/O itself: outbound frames are pushed onto an
//! [`OutboundFrames`] queue and inbound frames are fed in through
//! [`Connection::handle_text`]. A [`SocketTransport`](crate::transport::SocketTransport)
//! connects the two ends to a real WebSocket.
//!
//! # Handshake
//!
//! The connection starts in [`HandshakeState::Connecting`]. When the
//! transport reports the socket open, `connection_init` is sent. Channel
//! start messages submitted before the server's `connection_ack` are
//! deferred and flushed, in submission order, when the ack arrives.
//!
//! # Diagnostics
//!
//! Unexpected traffic (unknown channels, unknown message types, server-side
//! failures) never produces an error. It is logged through `tracing` and, if
//! one is set, handed to the [`LogSink`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::config::ChannelFailurePolicy;
use crate::error::{ClientError, Result};
use crate::protocol::{ClientMessage, MessageType, ServerMessage};
use crate::request::GraphQLRequest;

const TARGET: &str = "horizon_graphql::connection";

/// Receiving end of the frames a [`Connection`] wants written to the socket.
pub type OutboundFrames = mpsc::UnboundedReceiver<String>;

/// Sink for human-readable diagnostics.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

type DataHandler = Arc<dyn Fn(&Value) + Send + Sync>;
type FailureHandler = Arc<dyn Fn(&ChannelFailure) + Send + Sync>;

/// Handshake state of a [`Connection`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HandshakeState {
    /// Waiting for `connection_ack`; channel starts are deferred.
    #[default]
    Connecting,
    /// Handshake completed; channel starts are sent immediately.
    Established,
}

/// A server-reported channel failure.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelFailure {
    /// The failed channel.
    pub channel_id: String,
    /// Server-supplied message, if any.
    pub message: Option<String>,
    /// Whether the registration was removed.
    pub closed: bool,
}

/// Settings for a new [`Connection`].
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Socket URL, kept for diagnostics.
    pub url: String,
    /// Payload of the `connection_init` message.
    pub init_payload: Value,
    /// Channel behavior on server-reported failure.
    pub failure_policy: ChannelFailurePolicy,
}

struct ChannelRegistration {
    generation: u64,
    started: bool,
    on_data: Option<DataHandler>,
    on_error: Option<FailureHandler>,
}

struct DeferredStart {
    id: String,
    generation: u64,
    request: GraphQLRequest,
}

#[derive(Default)]
struct ConnectionState {
    handshake: HandshakeState,
    init_sent: bool,
    channels: HashMap<String, ChannelRegistration>,
    deferred: Vec<DeferredStart>,
    next_generation: u64,
}

struct ConnectionInner {
    config: ConnectionConfig,
    state: Mutex<ConnectionState>,
    outbound: mpsc::UnboundedSender<String>,
    logger: Mutex<Option<LogSink>>,
    // Held across data lookup and handler call, and by close, so no data
    // reaches a handler once close has returned. Reentrant so a handler
    // may close its own channel.
    dispatch: ReentrantMutex<()>,
}

/// A multiplexed subscription connection.
///
/// Cheap to clone; clones share the same channels and socket.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

enum Dispatch {
    Failure(Option<FailureHandler>, ChannelFailure),
    Nothing,
}

impl Connection {
    /// Create a connection and the queue its outbound frames are written to.
    pub fn new(config: ConnectionConfig) -> (Self, OutboundFrames) {
        let (outbound, frames) = mpsc::unbounded_channel();
        let connection = Self {
            inner: Arc::new(ConnectionInner {
                config,
                state: Mutex::new(ConnectionState::default()),
                outbound,
                logger: Mutex::new(None),
                dispatch: ReentrantMutex::new(()),
            }),
        };
        (connection, frames)
    }

    /// The socket URL.
    pub fn url(&self) -> &str {
        &self.inner.config.url
    }

    /// Current handshake state.
    pub fn state(&self) -> HandshakeState {
        self.inner.state.lock().handshake
    }

    /// Check if the handshake has completed.
    pub fn is_established(&self) -> bool {
        self.state() == HandshakeState::Established
    }

    /// Ids of the currently open channels, sorted.
    pub fn open_channels(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.state.lock().channels.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Check if a channel with this id is open.
    pub fn has_channel(&self, id: &str) -> bool {
        self.inner.state.lock().channels.contains_key(id)
    }

    pub(crate) fn ptr_eq(&self, other: &Connection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Set or clear the diagnostics sink.
    pub fn set_logger(&self, logger: Option<LogSink>) {
        *self.inner.logger.lock() = logger;
    }

    /// Open a channel.
    ///
    /// Uses `id` when given, otherwise a random id not currently in use.
    /// Fails with [`ClientError::DuplicateChannel`] when a channel with the
    /// same id is still open. The start message is sent immediately once
    /// the handshake is established and deferred until then otherwise.
    pub fn subscribe(&self, request: GraphQLRequest, id: Option<String>) -> Result<Subscription> {
        let mut state = self.inner.state.lock();

        let id = match id {
            Some(id) if state.channels.contains_key(&id) => {
                return Err(ClientError::DuplicateChannel(id));
            }
            Some(id) => id,
            None => loop {
                let candidate = rand::random::<u64>().to_string();
                if !state.channels.contains_key(&candidate) {
                    break candidate;
                }
            },
        };

        state.next_generation += 1;
        let generation = state.next_generation;
        let established = state.handshake == HandshakeState::Established;

        if established {
            let frame = ClientMessage::Start {
                id: id.clone(),
                payload: request,
            }
            .to_text()?;
            self.inner
                .outbound
                .send(frame)
                .map_err(|_| ClientError::Socket("subscription socket is closed".into()))?;
        } else {
            state.deferred.push(DeferredStart {
                id: id.clone(),
                generation,
                request,
            });
        }

        state.channels.insert(
            id.clone(),
            ChannelRegistration {
                generation,
                started: established,
                on_data: None,
                on_error: None,
            },
        );
        drop(state);

        tracing::debug!(target: TARGET, channel = %id, deferred = !established, "channel opened");

        Ok(Subscription {
            id,
            generation,
            connection: self.clone(),
        })
    }

    /// Called by the transport once the socket is open.
    ///
    /// Sends `connection_init`. Calls after the first are ignored.
    pub fn transport_opened(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.init_sent {
                return;
            }
            state.init_sent = true;
        }

        tracing::debug!(target: TARGET, url = %self.url(), "socket open, sending connection_init");
        let init = ClientMessage::ConnectionInit {
            payload: self.inner.config.init_payload.clone(),
        };
        match init.to_text() {
            Ok(frame) => self.send_frame(frame),
            Err(e) => self.diagnostic(format!("failed to encode connection_init: {e}")),
        }
    }

    /// Called by the transport when the socket failed.
    pub fn transport_failed(&self, reason: &str) {
        self.warn(format!("subscription socket {} failed: {reason}", self.url()));
    }

    /// Called by the transport when the socket closed.
    pub fn transport_closed(&self) {
        self.warn(format!("subscription socket {} closed", self.url()));
    }

    /// Process one inbound text frame.
    ///
    /// Never fails: malformed or unexpected frames are reported as
    /// diagnostics and dropped.
    pub fn handle_text(&self, text: &str) {
        match ServerMessage::from_text(text) {
            Ok(message) => self.handle_message(message),
            Err(e) => self.diagnostic(format!("dropping malformed frame ({e}): {text}")),
        }
    }

    /// Process one decoded server message.
    pub fn handle_message(&self, message: ServerMessage) {
        let dispatch = match message.kind {
            MessageType::ConnectionAck => {
                self.acknowledge();
                Dispatch::Nothing
            }
            MessageType::KeepAlive => Dispatch::Nothing,
            MessageType::Data => {
                let _dispatch = self.inner.dispatch.lock();
                if let Some((handler, data)) = self.route_data(&message) {
                    handler(&data);
                }
                Dispatch::Nothing
            }
            MessageType::Error | MessageType::SubscriptionFail => self.route_failure(&message),
            MessageType::InitFail => {
                let detail = message.error_text().unwrap_or_default();
                self.warn(format!("connection init failed: {detail}"));
                Dispatch::Nothing
            }
            MessageType::SubscriptionSuccess => {
                self.diagnostic(format!(
                    "subscription started for channel {}",
                    message.id.as_deref().unwrap_or("<none>")
                ));
                Dispatch::Nothing
            }
            MessageType::Complete => {
                if let Some(id) = message.id.as_deref() {
                    self.inner.state.lock().channels.remove(id);
                    self.diagnostic(format!("server completed channel {id}"));
                }
                Dispatch::Nothing
            }
            MessageType::Other(ref kind) => {
                self.diagnostic(format!("unexpected message type: {kind}"));
                Dispatch::Nothing
            }
        };

        // Handlers run without the state lock so they may close or open channels.
        match dispatch {
            Dispatch::Failure(handler, failure) => {
                if let Some(handler) = handler {
                    handler(&failure);
                }
            }
            Dispatch::Nothing => {}
        }
    }

    fn acknowledge(&self) {
        let mut state = self.inner.state.lock();
        if state.handshake == HandshakeState::Established {
            drop(state);
            self.diagnostic("ignoring repeated connection_ack".to_string());
            return;
        }
        state.handshake = HandshakeState::Established;

        let deferred = std::mem::take(&mut state.deferred);
        let mut flushed = 0usize;
        for start in deferred {
            let live = state
                .channels
                .get(&start.id)
                .is_some_and(|reg| reg.generation == start.generation);
            if !live {
                continue;
            }
            let frame = match (ClientMessage::Start {
                id: start.id.clone(),
                payload: start.request,
            })
            .to_text()
            {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(target: TARGET, channel = %start.id, "failed to encode start: {e}");
                    continue;
                }
            };
            if self.inner.outbound.send(frame).is_err() {
                drop(state);
                self.diagnostic(format!(
                    "subscription socket is closed; dropping deferred start for channel {}",
                    start.id
                ));
                return;
            }
            if let Some(reg) = state.channels.get_mut(&start.id) {
                reg.started = true;
            }
            flushed += 1;
        }
        drop(state);

        tracing::debug!(target: TARGET, flushed, "connection acknowledged");
    }

    fn route_data(&self, message: &ServerMessage) -> Option<(DataHandler, Value)> {
        let Some(id) = message.id.as_deref() else {
            self.diagnostic("data received without channel id".to_string());
            return None;
        };
        let handler = self
            .inner
            .state
            .lock()
            .channels
            .get(id)
            .and_then(|reg| reg.on_data.clone());

        match handler {
            Some(handler) => Some((handler, message.data())),
            None => {
                self.diagnostic(format!("data received for channel with no handler: {id}"));
                None
            }
        }
    }

    fn route_failure(&self, message: &ServerMessage) -> Dispatch {
        let Some(id) = message.id.clone() else {
            self.warn(format!(
                "{} without channel id: {}",
                message.kind.as_str(),
                message.error_text().unwrap_or_default()
            ));
            return Dispatch::Nothing;
        };
        let text = message.error_text();

        let (known, closed, handler) = {
            let mut state = self.inner.state.lock();
            match self.inner.config.failure_policy {
                ChannelFailurePolicy::Close => match state.channels.remove(&id) {
                    Some(reg) => (true, true, reg.on_error),
                    None => (false, false, None),
                },
                ChannelFailurePolicy::KeepOpen => match state.channels.get(&id) {
                    Some(reg) => (true, false, reg.on_error.clone()),
                    None => (false, false, None),
                },
            }
        };

        self.warn(format!(
            "{} for channel {id}{}: {}",
            message.kind.as_str(),
            if known { "" } else { " (unknown channel)" },
            text.as_deref().unwrap_or("no message")
        ));

        if !known {
            return Dispatch::Nothing;
        }
        Dispatch::Failure(
            handler,
            ChannelFailure {
                channel_id: id,
                message: text,
                closed,
            },
        )
    }

    fn set_data_handler(&self, id: &str, generation: u64, handler: DataHandler) {
        let mut state = self.inner.state.lock();
        match state.channels.get_mut(id) {
            Some(reg) if reg.generation == generation => reg.on_data = Some(handler),
            _ => {
                drop(state);
                self.diagnostic(format!("handler attached to closed channel {id}"));
            }
        }
    }

    fn set_error_handler(&self, id: &str, generation: u64, handler: FailureHandler) {
        let mut state = self.inner.state.lock();
        if let Some(reg) = state.channels.get_mut(id)
            && reg.generation == generation
        {
            reg.on_error = Some(handler);
        }
    }

    fn is_live(&self, id: &str, generation: u64) -> bool {
        self.inner
            .state
            .lock()
            .channels
            .get(id)
            .is_some_and(|reg| reg.generation == generation)
    }

    fn close_channel(&self, id: &str, generation: u64) {
        let _dispatch = self.inner.dispatch.lock();
        let mut state = self.inner.state.lock();
        let started = match state.channels.get(id) {
            Some(reg) if reg.generation == generation => reg.started,
            _ => return,
        };
        state.channels.remove(id);
        if started
            && let Ok(frame) = (ClientMessage::Stop { id: id.to_string() }).to_text()
        {
            let _ = self.inner.outbound.send(frame);
        }
        drop(state);

        tracing::debug!(target: TARGET, channel = %id, "channel closed");
    }

    fn send_frame(&self, frame: String) {
        if self.inner.outbound.send(frame).is_err() {
            self.diagnostic("subscription socket is closed; dropping frame".to_string());
        }
    }

    fn diagnostic(&self, message: String) {
        tracing::debug!(target: TARGET, "{message}");
        self.emit(&message);
    }

    fn warn(&self, message: String) {
        tracing::warn!(target: TARGET, "{message}");
        self.emit(&message);
    }

    fn emit(&self, message: &str) {
        let logger = self.inner.logger.lock().clone();
        if let Some(logger) = logger {
            logger(message);
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.inner.config.url)
            .field("state", &self.state())
            .field("channels", &self.open_channels())
            .finish()
    }
}

/// Handle to an open subscription channel.
///
/// Dropping the handle does not close the channel; call
/// [`close`](Self::close).
#[derive(Clone)]
pub struct Subscription {
    id: String,
    generation: u64,
    connection: Connection,
}

impl Subscription {
    /// The channel id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Attach or replace the data handler.
    ///
    /// The handler receives the `payload.data` of every `data` message for
    /// this channel.
    pub fn on_data<F>(&self, handler: F) -> &Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.connection
            .set_data_handler(&self.id, self.generation, Arc::new(handler));
        self
    }

    /// Attach or replace the handler for server-reported channel failures.
    pub fn on_error<F>(&self, handler: F) -> &Self
    where
        F: Fn(&ChannelFailure) + Send + Sync + 'static,
    {
        self.connection
            .set_error_handler(&self.id, self.generation, Arc::new(handler));
        self
    }

    /// Check if the channel is still registered.
    pub fn is_open(&self) -> bool {
        self.connection.is_live(&self.id, self.generation)
    }

    /// Close the channel.
    ///
    /// Removes the registration and, if the start message already went out,
    /// sends `stop`. Closing twice is a no-op.
    pub fn close(&self) {
        self.connection.close_channel(&self.id, self.generation);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn connection(policy: ChannelFailurePolicy) -> (Connection, OutboundFrames) {
        Connection::new(ConnectionConfig {
            url: "ws://localhost/graphql".into(),
            init_payload: json!({"Authorization": "Bearer abc"}),
            failure_policy: policy,
        })
    }

    fn drain(frames: &mut OutboundFrames) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(frame) = frames.try_recv() {
            out.push(serde_json::from_str(&frame).unwrap());
        }
        out
    }

    fn request() -> GraphQLRequest {
        GraphQLRequest::new("subscription { posts { id } }")
    }

    #[test]
    fn test_init_sent_once_on_open() {
        let (conn, mut frames) = connection(ChannelFailurePolicy::Close);
        assert_eq!(conn.state(), HandshakeState::Connecting);

        conn.transport_opened();
        conn.transport_opened();

        assert_eq!(
            drain(&mut frames),
            vec![json!({"type": "connection_init", "payload": {"Authorization": "Bearer abc"}})]
        );
    }

    #[test]
    fn test_starts_deferred_until_ack() {
        let (conn, mut frames) = connection(ChannelFailurePolicy::Close);
        conn.transport_opened();
        conn.subscribe(request(), Some("a".into())).unwrap();
        conn.subscribe(request(), Some("b".into())).unwrap();

        let before = drain(&mut frames);
        assert_eq!(before.len(), 1);
        assert_eq!(before[0]["type"], "connection_init");

        conn.handle_text(r#"{"type":"connection_ack"}"#);
        assert!(conn.is_established());

        let ids: Vec<_> = drain(&mut frames)
            .into_iter()
            .map(|f| (f["type"].clone(), f["id"].clone()))
            .collect();
        assert_eq!(
            ids,
            vec![(json!("start"), json!("a")), (json!("start"), json!("b"))]
        );
    }

    #[test]
    fn test_repeated_ack_does_not_resend() {
        let (conn, mut frames) = connection(ChannelFailurePolicy::Close);
        conn.subscribe(request(), Some("a".into())).unwrap();
        conn.handle_text(r#"{"type":"connection_ack"}"#);
        assert_eq!(drain(&mut frames).len(), 1);

        conn.handle_text(r#"{"type":"connection_ack"}"#);
        assert!(drain(&mut frames).is_empty());
    }

    #[test]
    fn test_closed_before_ack_is_not_started() {
        let (conn, mut frames) = connection(ChannelFailurePolicy::Close);
        let first = conn.subscribe(request(), Some("a".into())).unwrap();
        first.close();
        conn.subscribe(request(), Some("a".into())).unwrap();

        conn.handle_text(r#"{"type":"connection_ack"}"#);
        let sent = drain(&mut frames);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["id"], "a");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let (conn, _frames) = connection(ChannelFailurePolicy::Close);
        let a = conn.subscribe(request(), None).unwrap();
        let b = conn.subscribe(request(), None).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(conn.open_channels().len(), 2);
    }

    #[test]
    fn test_failure_closes_by_default() {
        let (conn, _frames) = connection(ChannelFailurePolicy::Close);
        let sub = conn.subscribe(request(), Some("a".into())).unwrap();
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        sub.on_error(move |failure| *sink.lock() = Some(failure.clone()));

        conn.handle_text(r#"{"type":"subscription_fail","id":"a","payload":{"message":"denied"}}"#);

        assert!(!sub.is_open());
        let failure = seen.lock().clone().unwrap();
        assert_eq!(failure.channel_id, "a");
        assert_eq!(failure.message.as_deref(), Some("denied"));
        assert!(failure.closed);
    }

    #[test]
    fn test_failure_keep_open_policy() {
        let (conn, _frames) = connection(ChannelFailurePolicy::KeepOpen);
        let sub = conn.subscribe(request(), Some("a".into())).unwrap();
        conn.handle_text(r#"{"type":"error","id":"a","payload":{"message":"oops"}}"#);
        assert!(sub.is_open());
    }

    #[test]
    fn test_close_after_start_sends_stop() {
        let (conn, mut frames) = connection(ChannelFailurePolicy::Close);
        conn.handle_text(r#"{"type":"connection_ack"}"#);
        let sub = conn.subscribe(request(), Some("a".into())).unwrap();
        sub.close();
        sub.close();

        let sent = drain(&mut frames);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1], json!({"type": "stop", "id": "a"}));
        assert!(!conn.has_channel("a"));
    }

    #[test]
    fn test_handler_may_close_its_channel() {
        let (conn, _frames) = connection(ChannelFailurePolicy::Close);
        let sub = conn.subscribe(request(), Some("a".into())).unwrap();
        let handle = sub.clone();
        sub.on_data(move |_| handle.close());

        conn.handle_text(r#"{"type":"data","id":"a","payload":{"data":{}}}"#);
        assert!(!conn.has_channel("a"));
    }

    #[test]
    fn test_complete_removes_registration() {
        let (conn, _frames) = connection(ChannelFailurePolicy::Close);
        conn.subscribe(request(), Some("a".into())).unwrap();
        conn.handle_text(r#"{"type":"complete","id":"a"}"#);
        assert!(conn.open_channels().is_empty());
    }

    #[test]
    fn test_diagnostics_reach_logger() {
        let (conn, _frames) = connection(ChannelFailurePolicy::Close);
        let lines = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = lines.clone();
        conn.set_logger(Some(Arc::new(move |line: &str| sink.lock().push(line.to_string()))));

        conn.handle_text(r#"{"type":"ka"}"#);
        assert!(lines.lock().is_empty());

        conn.handle_text(r#"{"type":"what_is_this"}"#);
        conn.handle_text("{not json");
        conn.handle_text(r#"{"type":"init_fail","payload":{"message":"bad token"}}"#);

        let lines = lines.lock();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("what_is_this"));
        assert!(lines[1].contains("malformed"));
        assert!(lines[2].contains("bad token"));
    }

    #[test]
    fn test_no_data_after_close_returns_across_threads() {
        use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

        let late = Arc::new(AtomicUsize::new(0));
        for _ in 0..200 {
            let (conn, _frames) = connection(ChannelFailurePolicy::Close);
            let sub = conn.subscribe(request(), Some("a".into())).unwrap();
            let closed = Arc::new(AtomicBool::new(false));

            let flag = closed.clone();
            let counter = late.clone();
            sub.on_data(move |_| {
                if flag.load(Ordering::SeqCst) {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            });

            let reader = conn.clone();
            let feeder = std::thread::spawn(move || {
                for _ in 0..50 {
                    reader.handle_text(r#"{"type":"data","id":"a","payload":{"data":{}}}"#);
                }
            });

            sub.close();
            closed.store(true, Ordering::SeqCst);
            feeder.join().unwrap();
        }

        assert_eq!(late.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_data_without_id_is_not_routed() {
        let (conn, _frames) = connection(ChannelFailurePolicy::Close);
        let sub = conn.subscribe(request(), Some(String::new())).unwrap();
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        sub.on_data(move |_| *counter.lock() += 1);

        let lines = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = lines.clone();
        conn.set_logger(Some(Arc::new(move |line: &str| sink.lock().push(line.to_string()))));

        conn.handle_text(r#"{"type":"data","payload":{"data":{}}}"#);

        assert_eq!(*calls.lock(), 0);
        assert!(lines.lock()[0].contains("without channel id"));
    }

    #[test]
    fn test_flush_into_closed_socket_is_reported() {
        let (conn, frames) = connection(ChannelFailurePolicy::Close);
        conn.subscribe(request(), Some("a".into())).unwrap();
        conn.subscribe(request(), Some("b".into())).unwrap();
        drop(frames);

        let lines = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = lines.clone();
        conn.set_logger(Some(Arc::new(move |line: &str| sink.lock().push(line.to_string()))));

        conn.handle_text(r#"{"type":"connection_ack"}"#);

        let lines = lines.lock();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("dropping deferred start for channel a"));
    }
}
