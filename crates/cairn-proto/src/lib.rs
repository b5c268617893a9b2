// ABOUTME: Hand-maintained protobuf types for the cairn topic write protocol.
// ABOUTME: Mirrors proto/topic.proto; single source of truth for wire messages.

#![allow(clippy::derive_partial_eq_without_eq)]

pub mod client;

/// Full method path of the `StreamWrite` bidirectional RPC.
pub const STREAM_WRITE_PATH: &str = "/cairn.TopicService/StreamWrite";

/// Result status attached to every server frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum StatusCode {
    Unspecified = 0,
    Success = 1,
    BadRequest = 2,
    Unauthorized = 3,
    NotFound = 4,
    Overloaded = 5,
    Unavailable = 6,
    InternalError = 7,
    SessionExpired = 8,
}

/// Payload encoding for written messages. Only `Raw` is produced today;
/// `Gzip` is reserved in the wire contract for future compression support.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Codec {
    Unspecified = 0,
    Raw = 1,
    Gzip = 2,
}

/// Diagnostic detail attached to a non-success status.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Issue {
    #[prost(uint32, tag = "1")]
    pub code: u32,
    #[prost(string, tag = "2")]
    pub message: String,
}

/// Client-to-server frame. Exactly one variant is populated per frame.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FromClient {
    #[prost(oneof = "from_client::ClientMessage", tags = "1, 2, 3")]
    pub client_message: Option<from_client::ClientMessage>,
}

pub mod from_client {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum ClientMessage {
        #[prost(message, tag = "1")]
        InitRequest(super::InitRequest),
        #[prost(message, tag = "2")]
        WriteRequest(super::WriteRequest),
        #[prost(message, tag = "3")]
        UpdateTokenRequest(super::UpdateTokenRequest),
    }
}

impl FromClient {
    /// Frame wrapping an init request.
    pub fn init(request: InitRequest) -> Self {
        Self {
            client_message: Some(from_client::ClientMessage::InitRequest(request)),
        }
    }

    /// Frame wrapping a write request.
    pub fn write(request: WriteRequest) -> Self {
        Self {
            client_message: Some(from_client::ClientMessage::WriteRequest(request)),
        }
    }

    /// Frame wrapping a token update request.
    pub fn update_token(request: UpdateTokenRequest) -> Self {
        Self {
            client_message: Some(from_client::ClientMessage::UpdateTokenRequest(request)),
        }
    }
}

/// Server-to-client frame. Carries a status plus at most one response variant.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FromServer {
    #[prost(enumeration = "StatusCode", tag = "1")]
    pub status: i32,
    #[prost(message, repeated, tag = "2")]
    pub issues: Vec<Issue>,
    #[prost(oneof = "from_server::ServerMessage", tags = "3, 4, 5")]
    pub server_message: Option<from_server::ServerMessage>,
}

pub mod from_server {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum ServerMessage {
        #[prost(message, tag = "3")]
        InitResponse(super::InitResponse),
        #[prost(message, tag = "4")]
        WriteResponse(super::WriteResponse),
        #[prost(message, tag = "5")]
        UpdateTokenResponse(super::UpdateTokenResponse),
    }
}

impl FromServer {
    /// Successful frame carrying the given response variant.
    pub fn success(message: from_server::ServerMessage) -> Self {
        Self {
            status: StatusCode::Success as i32,
            issues: Vec::new(),
            server_message: Some(message),
        }
    }

    /// Failed frame carrying a non-success status and its issues.
    pub fn failure(status: StatusCode, issues: Vec<Issue>) -> Self {
        Self {
            status: status as i32,
            issues,
            server_message: None,
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InitRequest {
    /// Topic path to attach to, e.g. "/topics/orders".
    #[prost(string, tag = "1")]
    pub path: String,
    #[prost(string, tag = "2")]
    pub producer_id: String,
    /// Pin the session to a specific partition instead of server-side placement.
    #[prost(int64, optional, tag = "3")]
    pub partition_id: Option<i64>,
    /// Ask the server to report the producer's last committed sequence number.
    #[prost(bool, tag = "4")]
    pub get_last_seq_no: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InitResponse {
    #[prost(string, tag = "1")]
    pub session_id: String,
    #[prost(uint64, tag = "2")]
    pub last_seq_no: u64,
    #[prost(int64, tag = "3")]
    pub partition_id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MessageData {
    #[prost(uint64, tag = "1")]
    pub seq_no: u64,
    #[prost(int64, tag = "2")]
    pub created_at_ms: i64,
    #[prost(bytes = "vec", tag = "3")]
    pub data: Vec<u8>,
    #[prost(int64, tag = "4")]
    pub uncompressed_size: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WriteRequest {
    #[prost(message, repeated, tag = "1")]
    pub messages: Vec<MessageData>,
    #[prost(enumeration = "Codec", tag = "2")]
    pub codec: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WriteAck {
    #[prost(uint64, tag = "1")]
    pub seq_no: u64,
    #[prost(int64, tag = "2")]
    pub offset: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WriteResponse {
    #[prost(message, repeated, tag = "1")]
    pub acks: Vec<WriteAck>,
    #[prost(int64, tag = "2")]
    pub partition_id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateTokenRequest {
    #[prost(string, tag = "1")]
    pub token: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateTokenResponse {}
