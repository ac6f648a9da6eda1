use crate::{
    consumer::{ConsumeStatus, ConsumerInner, FilterExpression, MessageModel},
    errors::{ClientError, Result},
    message_store::MessageStore,
    offset_ledger::OffsetLedger,
};

use morava_core::message::{MessageExt, MessageQueue};
use morava_core::proto::{
    AckMessageRequest, AckMessageResponse, Code, ForwardMessageToDeadLetterQueueRequest,
    NackMessageRequest, Resource, ResponseCommon,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

pub(crate) const RECEIVE_LONG_POLLING_TIMEOUT: Duration = Duration::from_secs(15);
pub(crate) const RECEIVE_LATER_DELAY: Duration = Duration::from_secs(3);

pub(crate) const PULL_LONG_POLLING_TIMEOUT: Duration = Duration::from_secs(15);
pub(crate) const PULL_LATER_DELAY: Duration = Duration::from_secs(3);

pub(crate) const MAX_IDLE: Duration = Duration::from_secs(30);
pub(crate) const ACK_FIFO_MESSAGE_DELAY: Duration = Duration::from_millis(100);
pub(crate) const REDIRECT_FIFO_MESSAGE_TO_DLQ_DELAY: Duration = Duration::from_millis(100);

/// Per-partition consumption pipeline.
///
/// One process queue is created per assigned partition. It fetches from the
/// owning broker, buffers messages under quantity/byte backpressure, hands
/// them to the consume service via the `try_take*` operations, and settles
/// them via the `erase*` operations. `drop` is the sole cancellation
/// primitive: every fetch iteration and retry chain observes it and stops
/// initiating new work; in-flight RPCs simply run out.
#[derive(Debug)]
pub struct ProcessQueue {
    pub(crate) consumer: Arc<ConsumerInner>,
    pub(crate) message_queue: MessageQueue,
    pub(crate) filter_expression: FilterExpression,

    dropped: AtomicBool,
    pub(crate) store: MessageStore,
    // broadcasting-mode offset watermark; untouched in clustering mode
    offsets: OffsetLedger,

    // last initiated fetch
    activity_time: Mutex<Instant>,
    // last backpressure deferral
    throttle_time: Mutex<Instant>,
}

fn read_instant(slot: &Mutex<Instant>) -> Instant {
    match slot.lock() {
        Ok(guard) => *guard,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

fn write_instant(slot: &Mutex<Instant>, value: Instant) {
    match slot.lock() {
        Ok(mut guard) => *guard = value,
        Err(poisoned) => *poisoned.into_inner() = value,
    }
}

impl ProcessQueue {
    pub(crate) fn new(
        consumer: Arc<ConsumerInner>,
        message_queue: MessageQueue,
        filter_expression: FilterExpression,
    ) -> Arc<Self> {
        let now = Instant::now();
        Arc::new(ProcessQueue {
            consumer,
            message_queue,
            filter_expression,
            dropped: AtomicBool::new(false),
            store: MessageStore::new(),
            offsets: OffsetLedger::new(),
            activity_time: Mutex::new(now),
            throttle_time: Mutex::new(now),
        })
    }

    /// Begin fetching. Clustering consumes through server-managed offsets
    /// (receive mode); broadcasting tracks offsets locally (pull mode).
    pub fn start(self: Arc<Self>) {
        let process_queue = Arc::clone(&self);
        match self.consumer.message_model() {
            MessageModel::Clustering => {
                tokio::spawn(async move { process_queue.receive_loop().await });
            }
            MessageModel::Broadcasting => {
                tokio::spawn(async move { process_queue.pull_loop().await });
            }
        }
    }

    /// Stop initiating new work. Monotonic; there is no undrop.
    pub fn drop(&self) {
        self.dropped.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }

    pub fn message_queue(&self) -> &MessageQueue {
        &self.message_queue
    }

    pub(crate) fn stamp_activity_time(&self) {
        write_instant(&self.activity_time, Instant::now());
    }

    pub(crate) fn stamp_throttle_time(&self) {
        write_instant(&self.throttle_time, Instant::now());
    }

    /// Backpressure probe: true when either the cached quantity or the cached
    /// bytes reached its threshold. Callers deferring on it must stamp the
    /// throttle time before scheduling the retry.
    pub(crate) fn throttled(&self) -> bool {
        let actual_quantity = self.store.cached_messages_quantity();
        let quantity_threshold = self
            .consumer
            .options()
            .cached_messages_quantity_threshold_per_queue;
        if quantity_threshold <= actual_quantity {
            warn!(
                threshold = quantity_threshold,
                actual = actual_quantity,
                mq = %self.message_queue,
                "Process queue total messages quantity exceeds the threshold"
            );
            return true;
        }
        let bytes_threshold = self
            .consumer
            .options()
            .cached_messages_bytes_threshold_per_queue;
        let actual_bytes = self.store.cached_message_bytes();
        if bytes_threshold <= actual_bytes {
            warn!(
                threshold = bytes_threshold,
                actual = actual_bytes,
                mq = %self.message_queue,
                "Process queue total messages memory exceeds the threshold"
            );
            return true;
        }
        false
    }

    /// Idle probe for the assignment scan. A queue only expires when both the
    /// fetch activity and the throttle stamps are stale, so a backpressured
    /// queue never expires by itself.
    pub fn expired(&self) -> bool {
        let now = Instant::now();
        let idle = now.duration_since(read_instant(&self.activity_time));
        if idle < MAX_IDLE {
            return false;
        }
        let throttle_idle = now.duration_since(read_instant(&self.throttle_time));
        if throttle_idle < MAX_IDLE {
            return false;
        }
        warn!(
            reception_idle_ms = idle.as_millis() as u64,
            throttle_idle_ms = throttle_idle.as_millis() as u64,
            mq = %self.message_queue,
            "Process queue is idle"
        );
        true
    }

    /// Buffer fetched messages. In broadcasting mode every message also gets
    /// an unreleased ledger record at its queue offset.
    pub(crate) fn cache_messages(&self, messages: Vec<MessageExt>) {
        if MessageModel::Broadcasting == self.consumer.message_model() {
            for message in &messages {
                self.offsets.insert(message.queue_offset);
            }
        }
        self.store.cache(messages);
    }

    /// Claim up to `batch_max_size` head messages for concurrent delivery.
    pub fn try_take_messages(&self, batch_max_size: usize) -> Vec<MessageExt> {
        let rate_limiter = self.consumer.rate_limiter(&self.message_queue.topic);
        self.store.try_take(batch_max_size, rate_limiter.as_deref())
    }

    /// Claim the head message for FIFO delivery. Each taken message MUST be
    /// settled through [`ProcessQueue::erase_fifo_message`], which releases
    /// the FIFO slot again.
    pub fn try_take_fifo_message(&self) -> Option<MessageExt> {
        let rate_limiter = self.consumer.rate_limiter(&self.message_queue.topic);
        self.store.try_take_fifo(rate_limiter.as_deref())
    }

    /// Settle a delivered batch: reclaim the cache budget and, in clustering
    /// mode, report the verdict to the broker (fire-and-forget).
    pub fn erase_messages(&self, messages: Vec<MessageExt>, status: ConsumeStatus) {
        self.consumer
            .stats_consumption(messages.len() as u64, status);
        self.erase(&messages);
        // for broadcasting mode, no need to ack message or forward it to DLQ
        if MessageModel::Broadcasting == self.consumer.message_model() {
            return;
        }
        // for clustering mode
        match status {
            ConsumeStatus::Ok => {
                for message in messages {
                    self.ack_message(message);
                }
            }
            ConsumeStatus::Error => {
                for message in messages {
                    self.nack_message(message);
                }
            }
        }
    }

    /// Settle a FIFO message. Failed messages are redelivered until the
    /// attempt budget runs out, then acknowledged or forwarded to the dead
    /// letter queue; the FIFO slot is released once settlement concludes.
    pub fn erase_fifo_message(self: Arc<Self>, message: MessageExt, status: ConsumeStatus) {
        tokio::spawn(async move { self.erase_fifo(message, status).await });
    }

    /// FIFO settlement state machine, one iteration per delivery verdict.
    pub(crate) async fn erase_fifo(self: Arc<Self>, mut message: MessageExt, mut status: ConsumeStatus) {
        loop {
            self.consumer.stats_consumption(1, status);

            // for broadcasting mode, no need to ack message or forward it to DLQ
            if MessageModel::Broadcasting == self.consumer.message_model() {
                self.erase(std::slice::from_ref(&message));
                self.store.release_fifo_slot();
                return;
            }

            let max_attempts = self.consumer.options().max_delivery_attempts;
            let attempt = message.delivery_attempt;
            // failed to consume message but delivery attempts are not exhausted
            if ConsumeStatus::Error == status && attempt < max_attempts {
                message.delivery_attempt = attempt + 1;
                let suspend = Duration::from_millis(
                    self.consumer.options().fifo_consumption_suspend_time_millis,
                );
                match self
                    .consumer
                    .consume_service()
                    .consume(message.clone(), suspend)
                    .await
                {
                    Ok(next_status) => {
                        status = next_status;
                        continue;
                    }
                    Err(error) => {
                        // the FIFO slot stays busy; only drop recovers the queue
                        error!(
                            mq = %self.message_queue,
                            message_id = %message.message_id,
                            attempt = message.delivery_attempt,
                            max_attempts,
                            %error,
                            "[Bug] Exception raised while message redelivery"
                        );
                        return;
                    }
                }
            }

            // ack message or forward it to DLQ depending on consumption status
            let settled = match status {
                ConsumeStatus::Ok => self.ack_fifo_message(&message).await,
                ConsumeStatus::Error => self.forward_to_dead_letter_queue(&message).await,
            };
            if settled.is_ok() {
                self.erase(std::slice::from_ref(&message));
                self.store.release_fifo_slot();
            }
            return;
        }
    }

    /// Remove messages from the in-flight sequence; in broadcasting mode the
    /// removed offsets are released in the ledger.
    fn erase(&self, messages: &[MessageExt]) {
        let removed = self.store.erase(messages);
        if MessageModel::Broadcasting == self.consumer.message_model() {
            for offset in removed {
                self.offsets.release(offset);
            }
        }
    }

    /// One ack attempt. Non-OK responses are logged; the caller owns retries.
    async fn ack_rpc(&self, message: &MessageExt, attempt: i32) -> Result<AckMessageResponse> {
        let request = self.wrap_ack_message_request(message);
        let metadata = self.consumer.sign().await?;
        let response = self
            .consumer
            .client_manager()
            .ack_message(
                &message.ack_endpoints,
                metadata,
                request,
                self.consumer.io_timeout(),
            )
            .await?;
        let (code, status_message) = status_of(&response.common);
        if Code::Ok != code {
            error!(
                attempt,
                message_id = %message.message_id,
                endpoints = %message.ack_endpoints,
                code = code.as_str_name(),
                %status_message,
                "Failed to ACK"
            );
        }
        Ok(response)
    }

    /// Fire-and-forget positive acknowledgement for batch consumption.
    fn ack_message(&self, message: MessageExt) {
        let consumer = Arc::clone(&self.consumer);
        let request = self.wrap_ack_message_request(&message);
        tokio::spawn(async move {
            let metadata = match consumer.sign().await {
                Ok(metadata) => metadata,
                Err(error) => {
                    error!(
                        message_id = %message.message_id,
                        endpoints = %message.ack_endpoints,
                        %error,
                        "Failed to ACK"
                    );
                    return;
                }
            };
            match consumer
                .client_manager()
                .ack_message(
                    &message.ack_endpoints,
                    metadata,
                    request,
                    consumer.io_timeout(),
                )
                .await
            {
                Ok(response) => {
                    let (code, status_message) = status_of(&response.common);
                    if Code::Ok != code {
                        error!(
                            message_id = %message.message_id,
                            endpoints = %message.ack_endpoints,
                            code = code.as_str_name(),
                            %status_message,
                            "Failed to ACK"
                        );
                    }
                }
                Err(error) => {
                    error!(
                        message_id = %message.message_id,
                        endpoints = %message.ack_endpoints,
                        %error,
                        "Exception raised while ACK"
                    );
                }
            }
        });
    }

    /// Fire-and-forget negative acknowledgement for batch consumption.
    fn nack_message(&self, message: MessageExt) {
        let consumer = Arc::clone(&self.consumer);
        let request = self.wrap_nack_message_request(&message);
        tokio::spawn(async move {
            let metadata = match consumer.sign().await {
                Ok(metadata) => metadata,
                Err(error) => {
                    error!(
                        message_id = %message.message_id,
                        endpoints = %message.ack_endpoints,
                        %error,
                        "Failed to NACK"
                    );
                    return;
                }
            };
            match consumer
                .client_manager()
                .nack_message(
                    &message.ack_endpoints,
                    metadata,
                    request,
                    consumer.io_timeout(),
                )
                .await
            {
                Ok(response) => {
                    let (code, status_message) = status_of(&response.common);
                    if Code::Ok != code {
                        error!(
                            message_id = %message.message_id,
                            endpoints = %message.ack_endpoints,
                            code = code.as_str_name(),
                            %status_message,
                            "Failed to NACK"
                        );
                    }
                }
                Err(error) => {
                    error!(
                        message_id = %message.message_id,
                        endpoints = %message.ack_endpoints,
                        %error,
                        "Exception raised while NACK"
                    );
                }
            }
        });
    }

    /// Acknowledge a FIFO message, retrying at a fixed delay until the broker
    /// answers OK or the queue is dropped.
    pub(crate) async fn ack_fifo_message(&self, message: &MessageExt) -> Result<()> {
        let mut attempt = 1;
        loop {
            match self.ack_rpc(message, attempt).await {
                Ok(response) => {
                    let (code, _) = status_of(&response.common);
                    if Code::Ok == code {
                        return Ok(());
                    }
                }
                Err(error) => {
                    error!(
                        attempt,
                        message_id = %message.message_id,
                        endpoints = %message.ack_endpoints,
                        %error,
                        "Exception raised while ACK"
                    );
                }
            }
            attempt += 1;
            if self.is_dropped() {
                info!(
                    mq = %self.message_queue,
                    message_id = %message.message_id,
                    "Process queue was dropped, give up to ack message"
                );
                return Err(ClientError::Dropped);
            }
            sleep(ACK_FIFO_MESSAGE_DELAY).await;
            if self.is_dropped() {
                info!(
                    mq = %self.message_queue,
                    message_id = %message.message_id,
                    "Process queue was dropped, give up to ack message"
                );
                return Err(ClientError::Dropped);
            }
        }
    }

    /// Forward an exhausted FIFO message to the dead letter queue, retrying at
    /// a fixed delay until the broker answers OK or the queue is dropped.
    pub(crate) async fn forward_to_dead_letter_queue(&self, message: &MessageExt) -> Result<()> {
        let mut attempt = 1;
        loop {
            match self.forward_rpc(message, attempt).await {
                Ok(code) => {
                    if Code::Ok == code {
                        return Ok(());
                    }
                }
                Err(error) => {
                    error!(
                        attempt,
                        message_id = %message.message_id,
                        endpoints = %message.ack_endpoints,
                        %error,
                        "Exception raised while forward message to DLQ"
                    );
                }
            }
            attempt += 1;
            if self.is_dropped() {
                info!(
                    mq = %self.message_queue,
                    message_id = %message.message_id,
                    "Process queue was dropped, give up to redirect message to DLQ"
                );
                return Err(ClientError::Dropped);
            }
            sleep(REDIRECT_FIFO_MESSAGE_TO_DLQ_DELAY).await;
            if self.is_dropped() {
                info!(
                    mq = %self.message_queue,
                    message_id = %message.message_id,
                    "Process queue was dropped, give up to redirect message to DLQ"
                );
                return Err(ClientError::Dropped);
            }
        }
    }

    async fn forward_rpc(&self, message: &MessageExt, attempt: i32) -> Result<Code> {
        let request = self.wrap_forward_message_to_dead_letter_queue_request(message);
        let metadata = self.consumer.sign().await?;
        let response = self
            .consumer
            .client_manager()
            .forward_message_to_dead_letter_queue(
                &message.ack_endpoints,
                metadata,
                request,
                self.consumer.io_timeout(),
            )
            .await?;
        let (code, status_message) = status_of(&response.common);
        if Code::Ok != code {
            error!(
                attempt,
                message_id = %message.message_id,
                endpoints = %message.ack_endpoints,
                code = code.as_str_name(),
                %status_message,
                "Failed to forward message to DLQ"
            );
        }
        Ok(code)
    }

    pub(crate) fn group_resource(&self) -> Resource {
        Resource {
            arn: self.consumer.arn().to_string(),
            name: self.consumer.group().to_string(),
        }
    }

    pub(crate) fn topic_resource(&self) -> Resource {
        Resource {
            arn: self.consumer.arn().to_string(),
            name: self.message_queue.topic.clone(),
        }
    }

    fn wrap_ack_message_request(&self, message: &MessageExt) -> AckMessageRequest {
        AckMessageRequest {
            group: Some(self.group_resource()),
            topic: Some(self.topic_resource()),
            client_id: self.consumer.client_id().to_string(),
            receipt_handle: message.receipt_handle.clone(),
            message_id: message.message_id.clone(),
        }
    }

    fn wrap_nack_message_request(&self, message: &MessageExt) -> NackMessageRequest {
        NackMessageRequest {
            group: Some(self.group_resource()),
            topic: Some(self.topic_resource()),
            client_id: self.consumer.client_id().to_string(),
            receipt_handle: message.receipt_handle.clone(),
            message_id: message.message_id.clone(),
            delivery_attempt: message.delivery_attempt,
            max_delivery_attempts: self.consumer.options().max_delivery_attempts,
        }
    }

    fn wrap_forward_message_to_dead_letter_queue_request(
        &self,
        message: &MessageExt,
    ) -> ForwardMessageToDeadLetterQueueRequest {
        ForwardMessageToDeadLetterQueueRequest {
            group: Some(self.group_resource()),
            topic: Some(self.topic_resource()),
            client_id: self.consumer.client_id().to_string(),
            receipt_handle: message.receipt_handle.clone(),
            message_id: message.message_id.clone(),
            delivery_attempt: message.delivery_attempt,
            max_delivery_attempts: self.consumer.options().max_delivery_attempts,
        }
    }

    pub fn cached_messages_quantity(&self) -> usize {
        self.store.cached_messages_quantity()
    }

    pub fn inflight_messages_quantity(&self) -> usize {
        self.store.inflight_messages_quantity()
    }

    pub fn cached_message_bytes(&self) -> usize {
        self.store.cached_message_bytes()
    }

    /// Broadcasting-mode commit watermark, `None` before any message arrived
    /// or in clustering mode.
    pub fn committed_offset(&self) -> Option<i64> {
        self.offsets.committed_offset()
    }

    #[cfg(test)]
    pub(crate) fn set_activity_time(&self, value: Instant) {
        write_instant(&self.activity_time, value);
    }

    #[cfg(test)]
    pub(crate) fn set_throttle_time(&self, value: Instant) {
        write_instant(&self.throttle_time, value);
    }

    #[cfg(test)]
    pub(crate) fn throttle_idle(&self) -> Duration {
        Instant::now().duration_since(read_instant(&self.throttle_time))
    }

    #[cfg(test)]
    pub(crate) fn ledger(&self) -> &OffsetLedger {
        &self.offsets
    }
}

/// Business status of a response, defaulting to UNKNOWN when absent.
pub(crate) fn status_of(common: &Option<ResponseCommon>) -> (Code, String) {
    match common.as_ref().and_then(|common| common.status.as_ref()) {
        Some(status) => (
            Code::try_from(status.code).unwrap_or(Code::Unknown),
            status.message.clone(),
        ),
        None => (Code::Unknown, String::new()),
    }
}
