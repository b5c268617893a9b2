// ABOUTME: Typed event surface for the topic write session.
// ABOUTME: One broadcast channel per event kind; observers subscribe read-only.

use tokio::sync::broadcast;

use cairn_proto::{InitResponse, UpdateTokenResponse, WriteResponse};

use crate::error::TopicClientError;

/// Capacity of each event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Terminal notification that a session was torn down via dispose.
#[derive(Debug, Clone)]
pub struct StreamDestroyed {
    /// Topic path the destroyed session was attached to.
    pub path: String,
}

/// Why the inbound frame stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndCause {
    /// We half-closed first; the server finished and closed its side.
    Closed,
    /// The server ended the stream while the session was still open.
    ServerClosed,
}

/// Event channels published by a write session.
///
/// The session owns this surface and exposes it by reference; subscribers are
/// external observers. Publishing ignores the send result since having no
/// subscribers is not an error.
#[derive(Debug)]
pub struct WriteSessionEvents {
    init_tx: broadcast::Sender<InitResponse>,
    write_tx: broadcast::Sender<WriteResponse>,
    update_token_tx: broadcast::Sender<UpdateTokenResponse>,
    error_tx: broadcast::Sender<TopicClientError>,
    destroyed_tx: broadcast::Sender<StreamDestroyed>,
    end_tx: broadcast::Sender<EndCause>,
}

impl WriteSessionEvents {
    pub(crate) fn new() -> Self {
        let (init_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (write_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (update_token_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (error_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (destroyed_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (end_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            init_tx,
            write_tx,
            update_token_tx,
            error_tx,
            destroyed_tx,
            end_tx,
        }
    }

    /// Subscribe to handshake acknowledgements.
    pub fn subscribe_init_responses(&self) -> broadcast::Receiver<InitResponse> {
        self.init_tx.subscribe()
    }

    /// Subscribe to write acknowledgements.
    pub fn subscribe_write_responses(&self) -> broadcast::Receiver<WriteResponse> {
        self.write_tx.subscribe()
    }

    /// Subscribe to token refresh acknowledgements.
    pub fn subscribe_update_token_responses(&self) -> broadcast::Receiver<UpdateTokenResponse> {
        self.update_token_tx.subscribe()
    }

    /// Subscribe to transport, status, and protocol errors.
    pub fn subscribe_errors(&self) -> broadcast::Receiver<TopicClientError> {
        self.error_tx.subscribe()
    }

    /// Subscribe to the terminal stream-destroyed notification.
    pub fn subscribe_destroyed(&self) -> broadcast::Receiver<StreamDestroyed> {
        self.destroyed_tx.subscribe()
    }

    /// Subscribe to end-of-stream notifications.
    pub fn subscribe_end(&self) -> broadcast::Receiver<EndCause> {
        self.end_tx.subscribe()
    }

    pub(crate) fn publish_init_response(&self, resp: InitResponse) {
        let _ = self.init_tx.send(resp);
    }

    pub(crate) fn publish_write_response(&self, resp: WriteResponse) {
        let _ = self.write_tx.send(resp);
    }

    pub(crate) fn publish_update_token_response(&self, resp: UpdateTokenResponse) {
        let _ = self.update_token_tx.send(resp);
    }

    pub(crate) fn publish_error(&self, err: TopicClientError) {
        let _ = self.error_tx.send(err);
    }

    pub(crate) fn publish_destroyed(&self, event: StreamDestroyed) {
        let _ = self.destroyed_tx.send(event);
    }

    pub(crate) fn publish_end(&self, cause: EndCause) {
        let _ = self.end_tx.send(cause);
    }
}
