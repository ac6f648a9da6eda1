use crate::{connection_manager::ConnectionManager, errors::Result};

use async_trait::async_trait;
use morava_core::message::Endpoints;
use morava_core::proto::{
    messaging_service_client::MessagingServiceClient, AckMessageRequest, AckMessageResponse,
    ForwardMessageToDeadLetterQueueRequest, ForwardMessageToDeadLetterQueueResponse,
    NackMessageRequest, NackMessageResponse, PullMessageRequest, PullMessageResponse,
    QueryOffsetRequest, QueryOffsetResponse, ReceiveMessageRequest, ReceiveMessageResponse,
};
use std::sync::Arc;
use std::time::Duration;
use tonic::metadata::MetadataMap;

/// The RPC surface the consumption engine drives.
///
/// Every call targets explicit broker endpoints, carries the signed metadata
/// produced for this request, and is bounded by the supplied deadline. The
/// engine owns retries and status translation; implementations only move bytes.
#[async_trait]
pub(crate) trait MessagingService: Send + Sync + std::fmt::Debug {
    async fn query_offset(
        &self,
        endpoints: &Endpoints,
        metadata: MetadataMap,
        request: QueryOffsetRequest,
        timeout: Duration,
    ) -> Result<QueryOffsetResponse>;

    async fn receive_message(
        &self,
        endpoints: &Endpoints,
        metadata: MetadataMap,
        request: ReceiveMessageRequest,
        timeout: Duration,
    ) -> Result<ReceiveMessageResponse>;

    async fn pull_message(
        &self,
        endpoints: &Endpoints,
        metadata: MetadataMap,
        request: PullMessageRequest,
        timeout: Duration,
    ) -> Result<PullMessageResponse>;

    async fn ack_message(
        &self,
        endpoints: &Endpoints,
        metadata: MetadataMap,
        request: AckMessageRequest,
        timeout: Duration,
    ) -> Result<AckMessageResponse>;

    async fn nack_message(
        &self,
        endpoints: &Endpoints,
        metadata: MetadataMap,
        request: NackMessageRequest,
        timeout: Duration,
    ) -> Result<NackMessageResponse>;

    async fn forward_message_to_dead_letter_queue(
        &self,
        endpoints: &Endpoints,
        metadata: MetadataMap,
        request: ForwardMessageToDeadLetterQueueRequest,
        timeout: Duration,
    ) -> Result<ForwardMessageToDeadLetterQueueResponse>;
}

/// Production [`MessagingService`] backed by cached tonic channels.
#[derive(Debug)]
pub(crate) struct ClientManager {
    cnx_manager: Arc<ConnectionManager>,
}

impl ClientManager {
    pub(crate) fn new(cnx_manager: Arc<ConnectionManager>) -> Self {
        ClientManager { cnx_manager }
    }

    async fn client(
        &self,
        endpoints: &Endpoints,
    ) -> Result<MessagingServiceClient<tonic::transport::Channel>> {
        let channel = self.cnx_manager.get_connection(endpoints).await?;
        Ok(MessagingServiceClient::new(channel))
    }

    fn prepare<T>(metadata: MetadataMap, request: T, timeout: Duration) -> tonic::Request<T> {
        let mut request = tonic::Request::new(request);
        *request.metadata_mut() = metadata;
        request.set_timeout(timeout);
        request
    }

    /// Unwrap an RPC outcome. A connection-level failure forgets the cached
    /// channel so the next call to these endpoints redials.
    async fn finish<T>(
        &self,
        endpoints: &Endpoints,
        outcome: std::result::Result<tonic::Response<T>, tonic::Status>,
    ) -> Result<T> {
        match outcome {
            Ok(response) => Ok(response.into_inner()),
            Err(status) => {
                if matches!(status.code(), tonic::Code::Unavailable | tonic::Code::Unknown) {
                    self.cnx_manager.mark_disconnected(endpoints).await;
                }
                Err(status.into())
            }
        }
    }
}

#[async_trait]
impl MessagingService for ClientManager {
    async fn query_offset(
        &self,
        endpoints: &Endpoints,
        metadata: MetadataMap,
        request: QueryOffsetRequest,
        timeout: Duration,
    ) -> Result<QueryOffsetResponse> {
        let mut client = self.client(endpoints).await?;
        let outcome = client
            .query_offset(Self::prepare(metadata, request, timeout))
            .await;
        self.finish(endpoints, outcome).await
    }

    async fn receive_message(
        &self,
        endpoints: &Endpoints,
        metadata: MetadataMap,
        request: ReceiveMessageRequest,
        timeout: Duration,
    ) -> Result<ReceiveMessageResponse> {
        let mut client = self.client(endpoints).await?;
        let outcome = client
            .receive_message(Self::prepare(metadata, request, timeout))
            .await;
        self.finish(endpoints, outcome).await
    }

    async fn pull_message(
        &self,
        endpoints: &Endpoints,
        metadata: MetadataMap,
        request: PullMessageRequest,
        timeout: Duration,
    ) -> Result<PullMessageResponse> {
        let mut client = self.client(endpoints).await?;
        let outcome = client
            .pull_message(Self::prepare(metadata, request, timeout))
            .await;
        self.finish(endpoints, outcome).await
    }

    async fn ack_message(
        &self,
        endpoints: &Endpoints,
        metadata: MetadataMap,
        request: AckMessageRequest,
        timeout: Duration,
    ) -> Result<AckMessageResponse> {
        let mut client = self.client(endpoints).await?;
        let outcome = client
            .ack_message(Self::prepare(metadata, request, timeout))
            .await;
        self.finish(endpoints, outcome).await
    }

    async fn nack_message(
        &self,
        endpoints: &Endpoints,
        metadata: MetadataMap,
        request: NackMessageRequest,
        timeout: Duration,
    ) -> Result<NackMessageResponse> {
        let mut client = self.client(endpoints).await?;
        let outcome = client
            .nack_message(Self::prepare(metadata, request, timeout))
            .await;
        self.finish(endpoints, outcome).await
    }

    async fn forward_message_to_dead_letter_queue(
        &self,
        endpoints: &Endpoints,
        metadata: MetadataMap,
        request: ForwardMessageToDeadLetterQueueRequest,
        timeout: Duration,
    ) -> Result<ForwardMessageToDeadLetterQueueResponse> {
        let mut client = self.client(endpoints).await?;
        let outcome = client
            .forward_message_to_dead_letter_queue(Self::prepare(metadata, request, timeout))
            .await;
        self.finish(endpoints, outcome).await
    }
}

/// Protobuf duration from whole milliseconds.
pub(crate) fn duration_from_millis(millis: u64) -> prost_types::Duration {
    prost_types::Duration {
        seconds: (millis / 1_000) as i64,
        nanos: ((millis % 1_000) * 1_000_000) as i32,
    }
}

/// Protobuf timestamp from milliseconds since the Unix epoch.
pub(crate) fn timestamp_from_millis(millis: u64) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: (millis / 1_000) as i64,
        nanos: ((millis % 1_000) * 1_000_000) as i32,
    }
}
