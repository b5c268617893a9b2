// ABOUTME: Duplex stream plumbing for the topic write path.
// ABOUTME: Typed sender/inbound wrappers and the opened channel pair.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Channel;
use tonic::Status;

use cairn_proto::client::TopicServiceClient;
use cairn_proto::{FromClient, FromServer};

use crate::error::TopicClientError;

/// Default buffer size for outbound frame channels.
pub const DEFAULT_CHANNEL_BUFFER: usize = 100;

/// Sender half of a duplex stream.
///
/// Wraps an mpsc sender for outgoing frames with convenience methods.
#[derive(Debug, Clone)]
pub struct StreamSender<T> {
    inner: mpsc::Sender<T>,
}

impl<T> StreamSender<T> {
    /// Create a stream sender from an mpsc sender.
    pub fn new(sender: mpsc::Sender<T>) -> Self {
        Self { inner: sender }
    }

    /// Send a frame on the stream.
    pub async fn send(&self, frame: T) -> Result<(), TopicClientError> {
        self.inner
            .send(frame)
            .await
            .map_err(|_| TopicClientError::StreamClosed)
    }

    /// Try to send a frame without waiting.
    pub fn try_send(&self, frame: T) -> Result<(), TopicClientError> {
        self.inner
            .try_send(frame)
            .map_err(|_| TopicClientError::StreamClosed)
    }

    /// Check if the stream is closed.
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Get the capacity of the underlying channel.
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Get the raw mpsc sender (for advanced use cases).
    pub fn into_inner(self) -> mpsc::Sender<T> {
        self.inner
    }
}

/// Inbound half of a duplex stream: server frames or transport failures.
///
/// Production sessions wrap the live `tonic::Streaming`; tests can feed any
/// in-memory stream with the same item type.
pub struct InboundFrames<T> {
    inner: Pin<Box<dyn Stream<Item = Result<T, Status>> + Send>>,
}

impl<T> InboundFrames<T> {
    /// Wrap a stream of decoded frames and transport failures.
    pub fn new(stream: impl Stream<Item = Result<T, Status>> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// Receive the next inbound unit, or `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<Result<T, Status>> {
        self.inner.next().await
    }
}

impl<T> Stream for InboundFrames<T> {
    type Item = Result<T, Status>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// A pair of sender and outbound stream for initiating a duplex call.
///
/// The outbound stream is passed to the gRPC client method, while the sender
/// is used to push frames into it.
pub struct OutboundStream<T> {
    /// Sender for pushing frames to the stream.
    pub sender: StreamSender<T>,
    /// The stream to pass to the gRPC method.
    pub stream: ReceiverStream<T>,
}

impl<T> OutboundStream<T> {
    /// Create an outbound stream pair with the specified buffer size.
    pub fn new(buffer_size: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer_size);
        Self {
            sender: StreamSender::new(tx),
            stream: ReceiverStream::new(rx),
        }
    }

    /// Create an outbound stream pair with the default buffer size.
    pub fn with_default_buffer() -> Self {
        Self::new(DEFAULT_CHANNEL_BUFFER)
    }
}

/// An opened duplex channel: one exclusive sender plus the inbound frames.
pub struct DuplexChannel<Req, Resp> {
    sender: StreamSender<Req>,
    inbound: InboundFrames<Resp>,
}

impl<Req, Resp> DuplexChannel<Req, Resp> {
    /// Assemble a duplex channel from its halves.
    pub fn from_parts(sender: StreamSender<Req>, inbound: InboundFrames<Resp>) -> Self {
        Self { sender, inbound }
    }

    /// Split into sender and inbound halves.
    pub fn split(self) -> (StreamSender<Req>, InboundFrames<Resp>) {
        (self.sender, self.inbound)
    }
}

impl DuplexChannel<FromClient, FromServer> {
    /// Open the `StreamWrite` call on a connected channel.
    pub async fn open(channel: Channel) -> Result<Self, TopicClientError> {
        let outbound = OutboundStream::with_default_buffer();
        let mut client = TopicServiceClient::new(channel);
        let response = client.stream_write(outbound.stream).await?;
        Ok(Self::from_parts(
            outbound.sender,
            InboundFrames::new(response.into_inner()),
        ))
    }
}
