//! The Feedme session state machine.
//!
//! Owns all per-connection state: the handshake-assigned client id, the
//! pending-action table, and the feed registry. Application calls become
//! outbound frames; transport events become registry transitions, completion
//! invocations and [`SessionEvent`] emissions. Any server frame that violates
//! the protocol-compliant sequence is surfaced as `bad_server_message` and
//! otherwise ignored.
//!
//! The session is single-threaded and runs each dispatch to completion;
//! every state transition is finished before the event for it fires. Events
//! are emitted synchronously; deferral to a scheduler tick is the concern of
//! the layer above.

use std::collections::BTreeMap;
use std::sync::Arc;

use feedme_protocol::FeedArgs;
use feedme_protocol::JsonObject;
use feedme_protocol::codec;
use feedme_protocol::delta;
use feedme_protocol::hash;
use feedme_protocol::message::ActionResponse;
use feedme_protocol::message::ActionRevelation;
use feedme_protocol::message::ClientMessage;
use feedme_protocol::message::FeedCloseResponse;
use feedme_protocol::message::FeedOpenResponse;
use feedme_protocol::message::FeedTermination;
use feedme_protocol::message::HandshakeResponse;
use feedme_protocol::message::ServerMessage;
use feedme_protocol::message::ViolationResponse;
use serde_json::Value;
use strum_macros::Display;
use tracing::debug;
use tracing::warn;

use crate::config::SessionConfig;
use crate::error::RevelationFailure;
use crate::error::SessionError;
use crate::registry::CloseRequester;
use crate::registry::FeedEntry;
use crate::registry::FeedKey;
use crate::registry::FeedRegistry;
use crate::registry::FeedState;
use crate::transport::Transport;
use crate::transport::TransportEvent;
use crate::transport::TransportState;

/// Session lifecycle as visible to the application. `Connecting` covers both
/// the transport-level connect and the handshake that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Completion for a one-shot action. Receives the frozen action data, or the
/// error that resolved the request.
pub type ActionCallback = Box<dyn FnOnce(Result<JsonObject, SessionError>)>;

/// Completion for a feed-open request. Receives the feed's reference data.
pub type FeedOpenCallback = Box<dyn FnOnce(Result<Arc<Value>, SessionError>)>;

/// Completion for a feed-close request.
pub type FeedCloseCallback = Box<dyn FnOnce(Result<(), SessionError>)>;

/// Emissions from the session toward the application-facing layer.
#[derive(Debug, Clone, PartialEq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SessionEvent {
    /// The transport started connecting.
    Connecting,
    /// Handshake complete; the session is usable.
    Connect,
    /// The connection ended. Carries the transport-supplied error verbatim,
    /// if there was one.
    Disconnect { error: Option<SessionError> },
    /// An action occurred on an open feed; `new_data` has already passed
    /// integrity verification.
    ActionRevelation {
        feed_name: String,
        feed_args: FeedArgs,
        action_name: String,
        action_data: JsonObject,
        new_data: Arc<Value>,
        old_data: Arc<Value>,
    },
    /// A feed the application did not ask to close has started closing.
    UnexpectedFeedClosing {
        feed_name: String,
        feed_args: FeedArgs,
        error: SessionError,
    },
    /// A feed the application did not ask to close is now closed.
    UnexpectedFeedClosed {
        feed_name: String,
        feed_args: FeedArgs,
        error: SessionError,
    },
    /// The server sent something protocol-violating; state was not disturbed.
    BadServerMessage { error: SessionError },
    /// The server flagged one of our frames as protocol-violating.
    BadClientMessage { diagnostics: JsonObject },
    /// Passthrough of a transport-reported error.
    TransportError {
        error: crate::transport::TransportError,
    },
}

/// The client half of a Feedme conversation over `T`.
pub struct Session<T: Transport> {
    transport: T,
    config: SessionConfig,
    client_id: Option<String>,
    next_action_callback_id: u64,
    action_callbacks: BTreeMap<u64, ActionCallback>,
    feeds: FeedRegistry,
    on_event: Box<dyn FnMut(SessionEvent)>,
}

impl<T: Transport> Session<T> {
    /// Creates a session in the disconnected state. `on_event` receives every
    /// [`SessionEvent`], synchronously.
    pub fn new(
        transport: T,
        config: SessionConfig,
        on_event: impl FnMut(SessionEvent) + 'static,
    ) -> Self {
        Self {
            transport,
            config,
            client_id: None,
            next_action_callback_id: 1,
            action_callbacks: BTreeMap::new(),
            feeds: FeedRegistry::default(),
            on_event: Box::new(on_event),
        }
    }

    pub fn state(&self) -> SessionState {
        match self.transport.state() {
            TransportState::Disconnected => SessionState::Disconnected,
            TransportState::Connecting => SessionState::Connecting,
            TransportState::Connected if self.client_id.is_some() => SessionState::Connected,
            // Transport up, handshake outstanding.
            TransportState::Connected => SessionState::Connecting,
        }
    }

    /// The server-assigned client id. Fails unless the session is connected.
    pub fn client_id(&self) -> Result<&str, SessionError> {
        match &self.client_id {
            Some(client_id) => Ok(client_id),
            None => Err(SessionError::InvalidState {
                state: self.state(),
            }),
        }
    }

    /// Asks the transport to connect. No observable effect until the
    /// transport emits events.
    pub fn connect(&mut self) -> Result<(), SessionError> {
        if self.transport.state() != TransportState::Disconnected {
            return Err(SessionError::InvalidState {
                state: self.state(),
            });
        }
        self.transport.connect()?;
        Ok(())
    }

    /// Asks the transport to disconnect. `error`, if supplied, is propagated
    /// verbatim and will come back on the disconnect event.
    pub fn disconnect(&mut self, error: Option<SessionError>) -> Result<(), SessionError> {
        if self.transport.state() == TransportState::Disconnected {
            return Err(SessionError::InvalidState {
                state: self.state(),
            });
        }
        self.transport.disconnect(error)?;
        Ok(())
    }

    /// Invokes a one-shot server action. `callback` fires exactly once: on
    /// the matching `ActionResponse`, or on transport disconnect.
    pub fn action(
        &mut self,
        name: &str,
        args: JsonObject,
        callback: ActionCallback,
    ) -> Result<(), SessionError> {
        non_empty("name", name)?;
        self.require_connected()?;
        let callback_id = self.next_action_callback_id;
        self.next_action_callback_id += 1;
        let frame = ClientMessage::Action {
            action_name: name.to_string(),
            action_args: args,
            callback_id: callback_id.to_string(),
        };
        self.action_callbacks.insert(callback_id, callback);
        if let Err(error) = self.send(&frame) {
            // The request never reached the wire; resolve synchronously via
            // the returned error instead of the completion.
            self.action_callbacks.remove(&callback_id);
            return Err(error);
        }
        Ok(())
    }

    /// Opens a feed. The feed must currently be closed.
    pub fn feed_open(
        &mut self,
        name: &str,
        args: FeedArgs,
        callback: FeedOpenCallback,
    ) -> Result<(), SessionError> {
        non_empty("name", name)?;
        self.require_connected()?;
        let key = FeedKey {
            name: name.to_string(),
            args,
        };
        let current = self.feeds.state(&key);
        if current != FeedState::Closed {
            return Err(SessionError::InvalidFeedState { state: current });
        }
        let frame = ClientMessage::FeedOpen {
            feed_name: key.name.clone(),
            feed_args: key.args.clone(),
        };
        self.feeds.put(
            key.clone(),
            FeedEntry::Opening {
                open_callback: callback,
            },
        );
        if let Err(error) = self.send(&frame) {
            self.feeds.remove(&key);
            return Err(error);
        }
        Ok(())
    }

    /// Closes an open feed. Reference data is discarded immediately;
    /// revelations arriving while the close is in flight have nothing
    /// reliable to apply against and are dropped.
    pub fn feed_close(
        &mut self,
        name: &str,
        args: FeedArgs,
        callback: FeedCloseCallback,
    ) -> Result<(), SessionError> {
        non_empty("name", name)?;
        self.require_connected()?;
        let key = FeedKey {
            name: name.to_string(),
            args,
        };
        let data = match self.feeds.remove(&key) {
            Some(FeedEntry::Open { data }) => data,
            Some(entry) => {
                let state = entry.state();
                self.feeds.put(key, entry);
                return Err(SessionError::InvalidFeedState { state });
            }
            None => {
                return Err(SessionError::InvalidFeedState {
                    state: FeedState::Closed,
                });
            }
        };
        let frame = ClientMessage::FeedClose {
            feed_name: key.name.clone(),
            feed_args: key.args.clone(),
        };
        self.feeds.put(
            key.clone(),
            FeedEntry::Closing {
                requester: CloseRequester::App {
                    close_callback: callback,
                },
            },
        );
        if let Err(error) = self.send(&frame) {
            // The close never reached the wire; restore the open feed and
            // resolve synchronously via the returned error instead of the
            // completion.
            self.feeds.put(key, FeedEntry::Open { data });
            return Err(error);
        }
        Ok(())
    }

    /// Current state of a feed. Feeds without a registry entry are closed.
    pub fn feed_state(&self, name: &str, args: &FeedArgs) -> FeedState {
        self.feeds.state(&FeedKey {
            name: name.to_string(),
            args: args.clone(),
        })
    }

    /// Current reference data of an open feed.
    pub fn feed_data(&self, name: &str, args: &FeedArgs) -> Result<Arc<Value>, SessionError> {
        let key = FeedKey {
            name: name.to_string(),
            args: args.clone(),
        };
        match self.feeds.get(&key) {
            Some(FeedEntry::Open { data }) => Ok(Arc::clone(data)),
            entry => Err(SessionError::InvalidFeedState {
                state: entry.map_or(FeedState::Closed, FeedEntry::state),
            }),
        }
    }

    /// Feeds one transport event into the state machine. Events must be
    /// forwarded in the order the transport emitted them.
    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connecting => self.emit(SessionEvent::Connecting),
            TransportEvent::Connect => self.handle_transport_connect(),
            TransportEvent::Message(raw) => self.handle_message(&raw),
            TransportEvent::Disconnect { error } => self.handle_transport_disconnect(error),
            TransportEvent::TransportError { error } => {
                self.emit(SessionEvent::TransportError { error });
            }
        }
    }

    fn emit(&mut self, event: SessionEvent) {
        (self.on_event)(event);
    }

    fn send(&mut self, message: &ClientMessage) -> Result<(), SessionError> {
        let frame = codec::encode(message);
        self.transport.send(&frame)?;
        Ok(())
    }

    fn require_connected(&self) -> Result<(), SessionError> {
        if self.state() != SessionState::Connected {
            return Err(SessionError::InvalidState {
                state: self.state(),
            });
        }
        Ok(())
    }

    fn handle_transport_connect(&mut self) {
        let frame = ClientMessage::Handshake {
            versions: self.config.versions.clone(),
        };
        if let Err(error) = self.send(&frame) {
            warn!(%error, "failed to send handshake");
        }
    }

    fn handle_message(&mut self, raw: &str) {
        let message = match codec::decode(raw) {
            Ok(message) => message,
            Err(cause) => {
                warn!(%cause, "discarding unparseable server frame");
                self.emit(SessionEvent::BadServerMessage {
                    error: SessionError::InvalidMessage {
                        raw: raw.to_string(),
                        cause: cause.to_string(),
                    },
                });
                return;
            }
        };
        match message {
            ServerMessage::ViolationResponse(message) => self.handle_violation_response(message),
            ServerMessage::HandshakeResponse(message) => {
                self.handle_handshake_response(message, raw);
            }
            ServerMessage::ActionResponse(message) => self.handle_action_response(message, raw),
            ServerMessage::FeedOpenResponse(message) => {
                self.handle_feed_open_response(message, raw);
            }
            ServerMessage::FeedCloseResponse(message) => {
                self.handle_feed_close_response(message, raw);
            }
            ServerMessage::ActionRevelation(message) => {
                self.handle_action_revelation(message, raw);
            }
            ServerMessage::FeedTermination(message) => self.handle_feed_termination(message, raw),
        }
    }

    fn unexpected(&mut self, message_type: &'static str, raw: &str) {
        warn!(message_type, "server frame is not valid in the current state");
        self.emit(SessionEvent::BadServerMessage {
            error: SessionError::UnexpectedMessage {
                raw: raw.to_string(),
                message_type,
            },
        });
    }

    fn handle_violation_response(&mut self, message: ViolationResponse) {
        warn!("server flagged a client frame as protocol-violating");
        self.emit(SessionEvent::BadClientMessage {
            diagnostics: message.diagnostics,
        });
    }

    fn handle_handshake_response(&mut self, message: HandshakeResponse, raw: &str) {
        if self.transport.state() != TransportState::Connected || self.client_id.is_some() {
            self.unexpected("HandshakeResponse", raw);
            return;
        }
        match message {
            HandshakeResponse::Accepted { version, client_id } => {
                debug!(%version, %client_id, "handshake complete");
                self.client_id = Some(client_id);
                self.emit(SessionEvent::Connect);
            }
            HandshakeResponse::Rejected => {
                // The transport echoes this error back on its disconnect
                // event, which is how the application learns of it.
                if let Err(error) = self
                    .transport
                    .disconnect(Some(SessionError::HandshakeRejected))
                {
                    warn!(%error, "failed to disconnect after handshake rejection");
                }
            }
        }
    }

    fn handle_action_response(&mut self, message: ActionResponse, raw: &str) {
        let callback = message
            .callback_id
            .parse::<u64>()
            .ok()
            .and_then(|callback_id| self.action_callbacks.remove(&callback_id));
        let Some(callback) = callback else {
            self.unexpected("ActionResponse", raw);
            return;
        };
        let result = message.result.map_err(|rejection| SessionError::Rejected {
            server_error_code: rejection.error_code,
            server_error_data: rejection.error_data,
        });
        callback(result);
    }

    fn handle_feed_open_response(&mut self, message: FeedOpenResponse, raw: &str) {
        let key = FeedKey {
            name: message.feed_name,
            args: message.feed_args,
        };
        match self.feeds.remove(&key) {
            Some(FeedEntry::Opening { open_callback }) => match message.result {
                Ok(feed_data) => {
                    let data = Arc::new(Value::Object(feed_data));
                    self.feeds.put(
                        key,
                        FeedEntry::Open {
                            data: Arc::clone(&data),
                        },
                    );
                    open_callback(Ok(data));
                }
                Err(rejection) => {
                    // Entry already removed: the feed is closed again.
                    open_callback(Err(SessionError::Rejected {
                        server_error_code: rejection.error_code,
                        server_error_data: rejection.error_data,
                    }));
                }
            },
            Some(entry) => {
                self.feeds.put(key, entry);
                self.unexpected("FeedOpenResponse", raw);
            }
            None => self.unexpected("FeedOpenResponse", raw),
        }
    }

    fn handle_feed_close_response(&mut self, message: FeedCloseResponse, raw: &str) {
        let key = FeedKey {
            name: message.feed_name,
            args: message.feed_args,
        };
        match self.feeds.remove(&key) {
            Some(FeedEntry::Closing { requester } | FeedEntry::Terminated { requester }) => {
                self.finish_close(key, requester);
            }
            Some(entry) => {
                self.feeds.put(key, entry);
                self.unexpected("FeedCloseResponse", raw);
            }
            None => self.unexpected("FeedCloseResponse", raw),
        }
    }

    /// Resolves a completed close: the application's completion succeeds, or
    /// the deferred half of a session-initiated close is reported.
    fn finish_close(&mut self, key: FeedKey, requester: CloseRequester) {
        match requester {
            CloseRequester::App { close_callback } => close_callback(Ok(())),
            CloseRequester::Session { error } => {
                self.emit(SessionEvent::UnexpectedFeedClosed {
                    feed_name: key.name,
                    feed_args: key.args,
                    error,
                });
            }
        }
    }

    fn handle_action_revelation(&mut self, message: ActionRevelation, raw: &str) {
        let key = FeedKey {
            name: message.feed_name.clone(),
            args: message.feed_args.clone(),
        };
        match self.feeds.remove(&key) {
            // A close is in flight; there is no reliable reference data to
            // apply deltas against. Not a violation.
            Some(entry @ (FeedEntry::Closing { .. } | FeedEntry::Terminated { .. })) => {
                self.feeds.put(key, entry);
            }
            Some(FeedEntry::Open { data }) => self.apply_revelation(key, data, message, raw),
            Some(entry) => {
                self.feeds.put(key, entry);
                self.unexpected("ActionRevelation", raw);
            }
            None => self.unexpected("ActionRevelation", raw),
        }
    }

    fn apply_revelation(
        &mut self,
        key: FeedKey,
        old_data: Arc<Value>,
        message: ActionRevelation,
        raw: &str,
    ) {
        // Copy-on-write: deltas land on a scratch clone, so a failure part
        // way through leaves the reference data untouched.
        let mut new_data = (*old_data).clone();
        for feed_delta in &message.feed_deltas {
            if let Err(cause) = delta::apply(&mut new_data, feed_delta) {
                self.close_after_bad_revelation(
                    key,
                    SessionError::InvalidDelta {
                        raw: raw.to_string(),
                        cause: cause.clone(),
                    },
                    RevelationFailure::Delta(cause),
                );
                return;
            }
        }
        if let Some(feed_md5) = &message.feed_md5
            && !hash::verify_feed_data(&new_data, feed_md5)
        {
            self.close_after_bad_revelation(
                key,
                SessionError::InvalidHash {
                    raw: raw.to_string(),
                },
                RevelationFailure::HashMismatch,
            );
            return;
        }
        let new_data = Arc::new(new_data);
        self.feeds.put(
            key.clone(),
            FeedEntry::Open {
                data: Arc::clone(&new_data),
            },
        );
        self.emit(SessionEvent::ActionRevelation {
            feed_name: key.name,
            feed_args: key.args,
            action_name: message.action_name,
            action_data: message.action_data,
            new_data,
            old_data,
        });
    }

    /// Emits `bad_server_message`, parks the feed in the closing state, sends
    /// the `FeedClose`, and emits `unexpected_feed_closing`. The matching
    /// `unexpected_feed_closed` fires when the server confirms the close.
    fn close_after_bad_revelation(
        &mut self,
        key: FeedKey,
        violation: SessionError,
        cause: RevelationFailure,
    ) {
        warn!(feed_name = %key.name, %violation, "closing feed after a bad revelation");
        self.emit(SessionEvent::BadServerMessage { error: violation });
        let error = SessionError::BadActionRevelation { cause };
        self.feeds.put(
            key.clone(),
            FeedEntry::Closing {
                requester: CloseRequester::Session {
                    error: error.clone(),
                },
            },
        );
        let frame = ClientMessage::FeedClose {
            feed_name: key.name.clone(),
            feed_args: key.args.clone(),
        };
        if let Err(send_error) = self.send(&frame) {
            warn!(%send_error, "failed to send FeedClose");
        }
        self.emit(SessionEvent::UnexpectedFeedClosing {
            feed_name: key.name,
            feed_args: key.args,
            error,
        });
    }

    fn handle_feed_termination(&mut self, message: FeedTermination, raw: &str) {
        let key = FeedKey {
            name: message.feed_name,
            args: message.feed_args,
        };
        match self.feeds.remove(&key) {
            Some(FeedEntry::Open { .. }) => {
                let error = SessionError::Terminated {
                    server_error_code: message.error_code,
                    server_error_data: message.error_data,
                };
                self.emit(SessionEvent::UnexpectedFeedClosing {
                    feed_name: key.name.clone(),
                    feed_args: key.args.clone(),
                    error: error.clone(),
                });
                self.emit(SessionEvent::UnexpectedFeedClosed {
                    feed_name: key.name,
                    feed_args: key.args,
                    error,
                });
            }
            Some(FeedEntry::Closing { requester }) => {
                // The close response is still owed; the application never
                // learns the feed was terminated underneath it.
                self.feeds.put(key, FeedEntry::Terminated { requester });
            }
            Some(entry) => {
                self.feeds.put(key, entry);
                self.unexpected("FeedTermination", raw);
            }
            None => self.unexpected("FeedTermination", raw),
        }
    }

    /// Wipes all per-connection state, then resolves every pending completion
    /// deterministically before reporting the disconnect itself.
    fn handle_transport_disconnect(&mut self, error: Option<SessionError>) {
        debug!("transport disconnected; flushing session state");
        self.client_id = None;
        self.next_action_callback_id = 1;
        let action_callbacks = std::mem::take(&mut self.action_callbacks);
        let feeds = self.feeds.drain();

        for (_, callback) in action_callbacks {
            callback(Err(SessionError::Disconnected));
        }
        for (key, entry) in feeds {
            match entry {
                FeedEntry::Opening { open_callback } => {
                    open_callback(Err(SessionError::Disconnected));
                }
                FeedEntry::Open { .. } => {
                    self.emit(SessionEvent::UnexpectedFeedClosing {
                        feed_name: key.name.clone(),
                        feed_args: key.args.clone(),
                        error: SessionError::Disconnected,
                    });
                    self.emit(SessionEvent::UnexpectedFeedClosed {
                        feed_name: key.name,
                        feed_args: key.args,
                        error: SessionError::Disconnected,
                    });
                }
                // However the close started, the feed is, in the end, closed.
                FeedEntry::Closing { requester } | FeedEntry::Terminated { requester } => {
                    self.finish_close(key, requester);
                }
            }
        }
        self.emit(SessionEvent::Disconnect { error });
    }
}

fn non_empty(argument: &'static str, value: &str) -> Result<(), SessionError> {
    if value.is_empty() {
        return Err(SessionError::InvalidArgument {
            argument,
            reason: "must be a non-empty string",
        });
    }
    Ok(())
}
