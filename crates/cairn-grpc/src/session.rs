// ABOUTME: Write session state machine for one topic producer attach.
// ABOUTME: Sends typed request frames and demultiplexes server frames to events.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use cairn_proto::from_server::ServerMessage;
use cairn_proto::{
    Codec, FromClient, FromServer, InitRequest, MessageData, StatusCode, UpdateTokenRequest,
    WriteRequest,
};

use crate::error::TopicClientError;
use crate::events::{EndCause, StreamDestroyed, WriteSessionEvents};
use crate::stream::{DuplexChannel, InboundFrames, StreamSender};

/// Lifecycle state of a write session. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum SessionState {
    /// Init frame sent, waiting for the handshake acknowledgement.
    Init = 0,
    /// InitResponse routed; the server accepts writes.
    Active = 1,
    /// close() called; the channel handle has been released.
    Closing = 2,
    /// dispose() called; terminal.
    Closed = 3,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SessionState::Init,
            1 => SessionState::Active,
            2 => SessionState::Closing,
            _ => SessionState::Closed,
        }
    }
}

/// Forward-only state cell shared between the session and its dispatch task.
#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Self {
        Self(AtomicU8::new(SessionState::Init as u8))
    }

    fn get(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Advance to `next` if it is strictly ahead of the current state.
    /// Returns false when the transition would move backward or repeat.
    fn advance(&self, next: SessionState) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < next as u8).then_some(next as u8)
            })
            .is_ok()
    }
}

/// Arguments for attaching a write session to a topic.
#[derive(Debug, Clone)]
pub struct WriteSessionArgs {
    /// Topic path to attach to. Required non-empty.
    pub path: String,
    /// Producer identifier reported to the server.
    pub producer_id: Option<String>,
    /// Pin the session to a specific partition.
    pub partition_id: Option<i64>,
    /// Ask the server for the producer's last committed sequence number.
    pub get_last_seq_no: bool,
}

impl WriteSessionArgs {
    /// Create args for the given topic path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            producer_id: None,
            partition_id: None,
            get_last_seq_no: false,
        }
    }

    /// Set the producer identifier.
    pub fn with_producer_id(mut self, producer_id: impl Into<String>) -> Self {
        self.producer_id = Some(producer_id.into());
        self
    }

    /// Pin writes to a specific partition.
    pub fn with_partition_id(mut self, partition_id: i64) -> Self {
        self.partition_id = Some(partition_id);
        self
    }

    /// Request the last committed sequence number in the handshake reply.
    pub fn with_get_last_seq_no(mut self, get: bool) -> Self {
        self.get_last_seq_no = get;
        self
    }

    fn into_init_request(self) -> InitRequest {
        InitRequest {
            path: self.path,
            producer_id: self.producer_id.unwrap_or_default(),
            partition_id: self.partition_id,
            get_last_seq_no: self.get_last_seq_no,
        }
    }
}

/// Client-side state machine for one topic write stream.
///
/// Owns the outbound half of the duplex channel exclusively; the inbound half
/// is consumed by a dispatch task spawned at attach time. Requests are
/// fire-and-forget: acknowledgements and post-attach failures surface on the
/// [`WriteSessionEvents`] channels, never as return values. Only precondition
/// violations (no channel held, empty batch, empty token) are returned
/// synchronously.
#[derive(Debug)]
pub struct WriteSession {
    path: String,
    state: Arc<StateCell>,
    sender: Option<StreamSender<FromClient>>,
    events: Arc<WriteSessionEvents>,
}

impl WriteSession {
    /// Attach a session to an opened duplex channel.
    ///
    /// Validates the topic path, transmits the init frame immediately, and
    /// spawns the frame dispatch task. Returns without waiting for the
    /// handshake acknowledgement; subscribe to init responses to observe it.
    /// Events are broadcast without replay, so subscriptions opened after a
    /// frame was dispatched miss it. Subscribe right after this returns,
    /// before the first server frame can arrive.
    /// Must be called from within a Tokio runtime.
    pub fn attach(
        args: WriteSessionArgs,
        channel: DuplexChannel<FromClient, FromServer>,
    ) -> Result<Self, TopicClientError> {
        if args.path.is_empty() {
            return Err(TopicClientError::EmptyPath);
        }

        let path = args.path.clone();
        let (sender, inbound) = channel.split();

        // Fail fast if the transport is already gone; the handshake reply
        // arrives asynchronously through the dispatch task.
        sender.try_send(FromClient::init(args.into_init_request()))?;
        debug!(path = %path, "write session attached, init request sent");

        let state = Arc::new(StateCell::new());
        let events = Arc::new(WriteSessionEvents::new());
        tokio::spawn(dispatch_frames(
            inbound,
            Arc::clone(&events),
            Arc::clone(&state),
            path.clone(),
        ));

        Ok(Self {
            path,
            state,
            sender: Some(sender),
            events,
        })
    }

    /// Open the `StreamWrite` call on a connected channel and attach to it.
    pub async fn connect(
        args: WriteSessionArgs,
        channel: tonic::transport::Channel,
    ) -> Result<Self, TopicClientError> {
        let duplex = DuplexChannel::open(channel).await?;
        Self::attach(args, duplex)
    }

    /// Send a batch of messages to the topic.
    ///
    /// Returns once the frame is handed to the transport, not when the server
    /// acknowledges it; acks arrive on the write response event channel. The
    /// handshake is deliberately not awaited: a write issued while the session
    /// is still in `Init` is transmitted as-is.
    pub async fn write(&self, messages: Vec<MessageData>) -> Result<(), TopicClientError> {
        let sender = self
            .sender
            .as_ref()
            .ok_or(TopicClientError::StreamNotOpen)?;
        if messages.is_empty() {
            return Err(TopicClientError::EmptyWrite);
        }
        let request = WriteRequest {
            messages,
            codec: Codec::Raw as i32,
        };
        sender.send(FromClient::write(request)).await
    }

    /// Refresh the session's auth token in-band, without stream teardown.
    pub async fn update_token(
        &self,
        token: impl Into<String>,
    ) -> Result<(), TopicClientError> {
        let sender = self
            .sender
            .as_ref()
            .ok_or(TopicClientError::StreamNotOpen)?;
        let token = token.into();
        if token.is_empty() {
            return Err(TopicClientError::EmptyToken);
        }
        sender
            .send(FromClient::update_token(UpdateTokenRequest { token }))
            .await
    }

    /// Half-close the stream and release the channel handle.
    ///
    /// Dropping the session's only outbound handle ends the request stream;
    /// any later send fails with `StreamNotOpen` instead of racing a
    /// half-closed pipe. Inbound frames may still arrive and are dispatched.
    pub fn close(&mut self) -> Result<(), TopicClientError> {
        let sender = self.sender.take().ok_or(TopicClientError::StreamNotOpen)?;
        // The dispatch task derives the end cause from the state cell, so it
        // must read `Closing` before the half-close becomes visible.
        self.state.advance(SessionState::Closing);
        drop(sender);
        debug!(path = %self.path, "write session closing");
        Ok(())
    }

    /// Tear the session down: close, publish stream-destroyed, enter `Closed`.
    ///
    /// Propagates close()'s precondition failure when the channel handle was
    /// already released, in which case nothing is published.
    pub fn dispose(&mut self) -> Result<(), TopicClientError> {
        self.close()?;
        self.events.publish_destroyed(StreamDestroyed {
            path: self.path.clone(),
        });
        self.state.advance(SessionState::Closed);
        debug!(path = %self.path, "write session destroyed");
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Whether the channel handle is still held.
    pub fn is_open(&self) -> bool {
        self.sender.is_some()
    }

    /// Topic path this session is attached to.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Event surface for this session.
    pub fn events(&self) -> &WriteSessionEvents {
        &self.events
    }
}

/// Routing decision for one inbound unit: exactly one event gets published.
enum Routed {
    Error(TopicClientError),
    Init(cairn_proto::InitResponse),
    Write(cairn_proto::WriteResponse),
    UpdateToken(cairn_proto::UpdateTokenResponse),
}

/// Classify one delivered unit. A transport failure wins over everything; a
/// non-success status wins over the response variant; a frame without a
/// populated variant is a protocol error. Total, so no dispatcher fault can
/// escape the task.
fn classify(unit: Result<FromServer, tonic::Status>) -> Routed {
    let frame = match unit {
        Err(status) => return Routed::Error(status.into()),
        Ok(frame) => frame,
    };

    let code = frame.status();
    if code != StatusCode::Success {
        return Routed::Error(TopicClientError::from_frame_status(code, &frame.issues));
    }

    match frame.server_message {
        Some(ServerMessage::InitResponse(resp)) => Routed::Init(resp),
        Some(ServerMessage::WriteResponse(resp)) => Routed::Write(resp),
        Some(ServerMessage::UpdateTokenResponse(resp)) => Routed::UpdateToken(resp),
        None => Routed::Error(TopicClientError::Protocol(
            "server frame carried no response variant".to_string(),
        )),
    }
}

/// Consume the inbound stream sequentially, publishing exactly one event per
/// delivered unit, then report why the stream ended.
async fn dispatch_frames(
    mut inbound: InboundFrames<FromServer>,
    events: Arc<WriteSessionEvents>,
    state: Arc<StateCell>,
    path: String,
) {
    while let Some(unit) = inbound.recv().await {
        match classify(unit) {
            Routed::Error(err) => {
                warn!(path = %path, error = %err, "write session error");
                events.publish_error(err);
            }
            Routed::Init(resp) => {
                // A late InitResponse after close() still publishes, but the
                // state cell refuses the backward transition.
                state.advance(SessionState::Active);
                debug!(path = %path, session_id = %resp.session_id, "init acknowledged");
                events.publish_init_response(resp);
            }
            Routed::Write(resp) => events.publish_write_response(resp),
            Routed::UpdateToken(resp) => events.publish_update_token_response(resp),
        }
    }

    let cause = if state.get() >= SessionState::Closing {
        EndCause::Closed
    } else {
        EndCause::ServerClosed
    };
    debug!(path = %path, cause = ?cause, "write stream ended");
    events.publish_end(cause);
}
