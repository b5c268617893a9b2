// ABOUTME: Hand-written client stub for the TopicService StreamWrite call.
// ABOUTME: Follows the call sequence tonic-generated clients use, without codegen.

use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;
use tonic::{Response, Status, Streaming};

use crate::{FromClient, FromServer, STREAM_WRITE_PATH};

/// Client for the `cairn.TopicService` write path.
#[derive(Debug, Clone)]
pub struct TopicServiceClient {
    inner: tonic::client::Grpc<Channel>,
}

impl TopicServiceClient {
    /// Wrap an already-connected channel.
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    /// Open the `StreamWrite` bidirectional stream.
    ///
    /// The request side is any stream of `FromClient` frames; the returned
    /// response wraps the server's `FromServer` frame stream.
    pub async fn stream_write(
        &mut self,
        request: impl tonic::IntoStreamingRequest<Message = FromClient>,
    ) -> Result<Response<Streaming<FromServer>>, Status> {
        self.inner
            .ready()
            .await
            .map_err(|e| Status::unknown(format!("service was not ready: {e}")))?;
        let codec: ProstCodec<FromClient, FromServer> = ProstCodec::default();
        self.inner
            .streaming(
                request.into_streaming_request(),
                PathAndQuery::from_static(STREAM_WRITE_PATH),
                codec,
            )
            .await
    }
}
