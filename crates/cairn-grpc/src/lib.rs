// ABOUTME: Topic write client for cairn, from channel setup to the session state machine.
// ABOUTME: Provides channel creation, duplex stream plumbing, typed events, and the write session.

pub mod channel;
pub mod error;
pub mod events;
pub mod session;
pub mod stream;

// Channel creation
pub use channel::{create_channel, create_simple_channel, ChannelConfig, KeepAliveConfig};

// Error types
pub use error::TopicClientError;

// Typed session events
pub use events::{EndCause, StreamDestroyed, WriteSessionEvents, EVENT_CHANNEL_CAPACITY};

// Write session state machine
pub use session::{SessionState, WriteSession, WriteSessionArgs};

// Stream plumbing
pub use stream::{
    DuplexChannel, InboundFrames, OutboundStream, StreamSender, DEFAULT_CHANNEL_BUFFER,
};

// Re-export proto types for convenience
pub use cairn_proto;
