use crate::{
    auth_service::AuthService,
    client_manager::{ClientManager, MessagingService},
    connection_manager::{ConnectionManager, ConnectionOptions},
    errors::{ClientError, Result},
    process_queue::ProcessQueue,
    rate_limiter::RateLimiter,
};

use async_trait::async_trait;
use dashmap::DashMap;
use morava_core::message::{Endpoints, MessageExt, MessageQueue};
use std::path::Path;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;
use tonic::metadata::MetadataMap;
use tonic::transport::{Certificate, ClientTlsConfig};
use tracing::info;

/// Outcome of one user-listener invocation over a batch or a FIFO message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeStatus {
    Ok,
    Error,
}

/// How messages of a group are spread over its consumers.
///
/// Variants:
/// - `Clustering`: each message goes to one consumer of the group; offsets are
///   managed by the broker and progress is reported through ack/nack.
/// - `Broadcasting`: every consumer receives every message; progress is a
///   locally tracked offset watermark and no ack is ever sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageModel {
    Clustering,
    Broadcasting,
}

/// Shape of the user listener: concurrent batches or one-at-a-time FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerType {
    Concurrent,
    Orderly,
}

/// Starting position for a partition that has no committed offset yet.
/// `None` in the options means resume from the last committed offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeFromWhere {
    Beginning,
    End,
    Timestamp,
}

/// Server-side message filter attached to every fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionType {
    Tag,
    Sql92,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExpression {
    pub expression: String,
    pub expression_type: ExpressionType,
}

impl FilterExpression {
    pub fn tag(expression: impl Into<String>) -> Self {
        FilterExpression {
            expression: expression.into(),
            expression_type: ExpressionType::Tag,
        }
    }

    pub fn sql(expression: impl Into<String>) -> Self {
        FilterExpression {
            expression: expression.into(),
            expression_type: ExpressionType::Sql92,
        }
    }
}

impl Default for FilterExpression {
    fn default() -> Self {
        FilterExpression::tag("*")
    }
}

/// Schedules user-provided consume functions over message batches and FIFO
/// singletons. The engine only signals it and asks for redeliveries; taking
/// messages back out of the process queues is the service's own loop.
#[async_trait]
pub trait ConsumeService: Send + Sync + std::fmt::Debug {
    /// Wake the dispatcher: newly cached messages are ready to be taken.
    fn dispatch(&self);

    /// Deliver `message` to the user listener once more after `delay` and
    /// resolve with the listener's verdict.
    async fn consume(&self, message: MessageExt, delay: Duration) -> Result<ConsumeStatus>;
}

/// Custom offset persistence, consulted once per assigned partition to find
/// the position pull-mode fetching resumes from.
#[async_trait]
pub trait OffsetStore: Send + Sync + std::fmt::Debug {
    async fn read_offset(&self, message_queue: &MessageQueue) -> Result<i64>;
}

/// Configuration surface of a push consumer, read by every process queue.
#[derive(Debug, Clone)]
pub struct ConsumerOptions {
    /// Delivery attempts granted to a FIFO message before it goes to the DLQ.
    pub max_delivery_attempts: i32,
    pub max_await_batch_size_per_queue: i32,
    /// How long the broker may hold a long poll open waiting for messages.
    pub max_await_time_millis_per_queue: u64,
    /// Broker-side invisibility window for delivered messages.
    pub consumption_timeout_millis: u64,
    /// Default RPC deadline for one-shot operations.
    pub io_timeout_millis: u64,
    /// Pause before redelivering a failed FIFO message.
    pub fifo_consumption_suspend_time_millis: u64,
    pub consume_from_where: Option<ConsumeFromWhere>,
    pub consume_from_time_millis: u64,
    pub message_model: MessageModel,
    pub listener_type: ListenerType,
    pub cached_messages_quantity_threshold_per_queue: usize,
    pub cached_messages_bytes_threshold_per_queue: usize,
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        ConsumerOptions {
            max_delivery_attempts: 16,
            max_await_batch_size_per_queue: 32,
            max_await_time_millis_per_queue: 10_000,
            consumption_timeout_millis: 900_000,
            io_timeout_millis: 3_000,
            fifo_consumption_suspend_time_millis: 1_000,
            consume_from_where: None,
            consume_from_time_millis: 0,
            message_model: MessageModel::Clustering,
            listener_type: ListenerType::Concurrent,
            cached_messages_quantity_threshold_per_queue: 1024,
            cached_messages_bytes_threshold_per_queue: 4 * 1024 * 1024,
        }
    }
}

static CLIENT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Shared state of one push consumer: identity, configuration, collaborators
/// and the client-wide counters the process queues report into.
#[derive(Debug)]
pub(crate) struct ConsumerInner {
    client_id: String,
    arn: String,
    group: String,
    options: ConsumerOptions,
    client_manager: Arc<dyn MessagingService>,
    auth_service: AuthService,
    consume_service: Arc<dyn ConsumeService>,
    offset_store: Option<Arc<dyn OffsetStore>>,
    rate_limiters: DashMap<String, Arc<RateLimiter>>,
    process_queues: DashMap<MessageQueue, Arc<ProcessQueue>>,
    received_messages_quantity: AtomicU64,
    pulled_messages_quantity: AtomicU64,
    reception_times: AtomicU64,
    pull_times: AtomicU64,
    consumption_ok_quantity: AtomicU64,
    consumption_error_quantity: AtomicU64,
}

impl ConsumerInner {
    pub(crate) fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(crate) fn arn(&self) -> &str {
        &self.arn
    }

    pub(crate) fn group(&self) -> &str {
        &self.group
    }

    pub(crate) fn options(&self) -> &ConsumerOptions {
        &self.options
    }

    pub(crate) fn message_model(&self) -> MessageModel {
        self.options.message_model
    }

    pub(crate) fn listener_type(&self) -> ListenerType {
        self.options.listener_type
    }

    pub(crate) fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.options.io_timeout_millis)
    }

    pub(crate) fn client_manager(&self) -> &Arc<dyn MessagingService> {
        &self.client_manager
    }

    pub(crate) fn consume_service(&self) -> &Arc<dyn ConsumeService> {
        &self.consume_service
    }

    pub(crate) fn offset_store(&self) -> Option<&Arc<dyn OffsetStore>> {
        self.offset_store.as_ref()
    }

    pub(crate) fn rate_limiter(&self, topic: &str) -> Option<Arc<RateLimiter>> {
        self.rate_limiters
            .get(topic)
            .map(|limiter| Arc::clone(limiter.value()))
    }

    /// Signed metadata for one outgoing request.
    pub(crate) async fn sign(&self) -> Result<MetadataMap> {
        self.auth_service.sign(&self.client_id).await
    }

    /// Drop the queue and forget it; the next assignment scan may recreate it.
    pub(crate) fn drop_process_queue(&self, message_queue: &MessageQueue) {
        if let Some((_, process_queue)) = self.process_queues.remove(message_queue) {
            ProcessQueue::drop(&process_queue);
            info!(mq = %message_queue, "Dropped process queue");
        }
    }

    pub(crate) fn add_received_messages_quantity(&self, count: u64) {
        self.received_messages_quantity
            .fetch_add(count, Ordering::SeqCst);
    }

    pub(crate) fn add_pulled_messages_quantity(&self, count: u64) {
        self.pulled_messages_quantity
            .fetch_add(count, Ordering::SeqCst);
    }

    pub(crate) fn increment_reception_times(&self) {
        self.reception_times.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_pull_times(&self) {
        self.pull_times.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn stats_consumption(&self, count: u64, status: ConsumeStatus) {
        match status {
            ConsumeStatus::Ok => self.consumption_ok_quantity.fetch_add(count, Ordering::SeqCst),
            ConsumeStatus::Error => self
                .consumption_error_quantity
                .fetch_add(count, Ordering::SeqCst),
        };
    }
}

/// A push consumer: owns one process queue per assigned partition and the
/// plumbing they fetch and acknowledge through.
///
/// Partition assignment itself happens upstream; the assignment layer calls
/// [`PushConsumer::assign`] and [`PushConsumer::drop_process_queue`] as its
/// view of the group changes, and periodically sweeps stalled queues with
/// [`PushConsumer::drop_expired_queues`].
#[derive(Debug, Clone)]
pub struct PushConsumer {
    inner: Arc<ConsumerInner>,
}

impl PushConsumer {
    pub fn builder() -> PushConsumerBuilder {
        PushConsumerBuilder::default()
    }

    /// Create and start the process queue for a newly assigned partition.
    pub fn assign(
        &self,
        message_queue: MessageQueue,
        filter_expression: FilterExpression,
    ) -> Arc<ProcessQueue> {
        let process_queue = ProcessQueue::new(
            Arc::clone(&self.inner),
            message_queue.clone(),
            filter_expression,
        );
        // register before starting: a pull-mode queue may drop itself while
        // resolving its initial offset
        self.inner
            .process_queues
            .insert(message_queue, Arc::clone(&process_queue));
        Arc::clone(&process_queue).start();
        process_queue
    }

    pub fn process_queue(&self, message_queue: &MessageQueue) -> Option<Arc<ProcessQueue>> {
        self.inner
            .process_queues
            .get(message_queue)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Mark the partition's queue dropped and forget it.
    pub fn drop_process_queue(&self, message_queue: &MessageQueue) {
        self.inner.drop_process_queue(message_queue);
    }

    /// Sweep queues that stalled: idle on both fetch and throttle for longer
    /// than the expiry window.
    pub fn drop_expired_queues(&self) {
        let expired: Vec<MessageQueue> = self
            .inner
            .process_queues
            .iter()
            .filter(|entry| entry.value().expired())
            .map(|entry| entry.key().clone())
            .collect();
        for message_queue in expired {
            self.inner.drop_process_queue(&message_queue);
        }
    }

    /// Drop every process queue; in-flight RPC callbacks drain on their own.
    pub fn close(&self) {
        let assigned: Vec<MessageQueue> = self
            .inner
            .process_queues
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        for message_queue in assigned {
            self.inner.drop_process_queue(&message_queue);
        }
    }

    /// Install a messages/sec limit for takes of one topic.
    pub fn set_rate_limiter(&self, topic: impl Into<String>, max_per_sec: u32) {
        self.inner
            .rate_limiters
            .insert(topic.into(), Arc::new(RateLimiter::new(max_per_sec)));
    }

    pub fn received_messages_quantity(&self) -> u64 {
        self.inner.received_messages_quantity.load(Ordering::SeqCst)
    }

    pub fn pulled_messages_quantity(&self) -> u64 {
        self.inner.pulled_messages_quantity.load(Ordering::SeqCst)
    }

    pub fn consumption_ok_quantity(&self) -> u64 {
        self.inner.consumption_ok_quantity.load(Ordering::SeqCst)
    }

    pub fn consumption_error_quantity(&self) -> u64 {
        self.inner.consumption_error_quantity.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub(crate) fn inner(&self) -> &Arc<ConsumerInner> {
        &self.inner
    }
}

/// Builder for a [`PushConsumer`].
#[derive(Debug, Default)]
pub struct PushConsumerBuilder {
    access_endpoints: Option<Endpoints>,
    group: Option<String>,
    arn: String,
    client_id: Option<String>,
    api_key: Option<String>,
    tls_config: Option<ClientTlsConfig>,
    options: ConsumerOptions,
    consume_service: Option<Arc<dyn ConsumeService>>,
    offset_store: Option<Arc<dyn OffsetStore>>,
    client_manager: Option<Arc<dyn MessagingService>>,
}

impl PushConsumerBuilder {
    /// Access point the client authenticates against.
    pub fn with_access_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.access_endpoints = Some(endpoints);
        self
    }

    /// Consumer group this client joins. Required.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Resource namespace stamped on group and topic resources.
    pub fn with_arn(mut self, arn: impl Into<String>) -> Self {
        self.arn = arn.into();
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the API key; requests are then signed with a bearer token.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the TLS configuration for broker connections.
    pub fn with_tls(mut self, ca_cert: impl AsRef<Path>) -> Result<Self> {
        let tls_config = ClientTlsConfig::new()
            .ca_certificate(Certificate::from_pem(std::fs::read(ca_cert).map_err(
                |e| ClientError::Unrecoverable(format!("unable to load the certificate: {}", e)),
            )?));
        self.tls_config = Some(tls_config);
        Ok(self)
    }

    pub fn with_options(mut self, options: ConsumerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_message_model(mut self, message_model: MessageModel) -> Self {
        self.options.message_model = message_model;
        self
    }

    pub fn with_listener_type(mut self, listener_type: ListenerType) -> Self {
        self.options.listener_type = listener_type;
        self
    }

    /// The service executing user listeners. Required.
    pub fn with_consume_service(mut self, consume_service: Arc<dyn ConsumeService>) -> Self {
        self.consume_service = Some(consume_service);
        self
    }

    /// Custom offset persistence for pull-mode partitions.
    pub fn with_offset_store(mut self, offset_store: Arc<dyn OffsetStore>) -> Self {
        self.offset_store = Some(offset_store);
        self
    }

    /// Swap the RPC layer; tests drive the engine against a recording double.
    pub(crate) fn with_client_manager(mut self, client_manager: Arc<dyn MessagingService>) -> Self {
        self.client_manager = Some(client_manager);
        self
    }

    pub fn build(self) -> Result<PushConsumer> {
        let group = self.group.ok_or_else(|| {
            ClientError::Unrecoverable("group is required to build a PushConsumer".into())
        })?;
        let consume_service = self.consume_service.ok_or_else(|| {
            ClientError::Unrecoverable("consume service is required to build a PushConsumer".into())
        })?;
        let access_endpoints = self
            .access_endpoints
            .unwrap_or_else(|| Endpoints::new("localhost", 8081));

        let connection_options = ConnectionOptions {
            use_tls: self.tls_config.is_some(),
            tls_config: self.tls_config,
            api_key: self.api_key,
        };
        let cnx_manager = Arc::new(ConnectionManager::new(connection_options));
        let auth_service = AuthService::new(Arc::clone(&cnx_manager), access_endpoints);
        let client_manager = self
            .client_manager
            .unwrap_or_else(|| Arc::new(ClientManager::new(Arc::clone(&cnx_manager))));

        let client_id = self.client_id.unwrap_or_else(|| {
            format!(
                "{}@{}@{}",
                group,
                std::process::id(),
                CLIENT_SEQUENCE.fetch_add(1, Ordering::SeqCst)
            )
        });

        Ok(PushConsumer {
            inner: Arc::new(ConsumerInner {
                client_id,
                arn: self.arn,
                group,
                options: self.options,
                client_manager,
                auth_service,
                consume_service,
                offset_store: self.offset_store,
                rate_limiters: DashMap::new(),
                process_queues: DashMap::new(),
                received_messages_quantity: AtomicU64::new(0),
                pulled_messages_quantity: AtomicU64::new(0),
                reception_times: AtomicU64::new(0),
                pull_times: AtomicU64::new(0),
                consumption_ok_quantity: AtomicU64::new(0),
                consumption_error_quantity: AtomicU64::new(0),
            }),
        })
    }
}
