//! Long-poll fetch driver of a process queue.
//!
//! One loop per partition, started by [`ProcessQueue::start`]: receive mode
//! for clustering consumers, pull mode for broadcasting consumers. Every
//! fault defers the next cycle instead of terminating the loop; only a
//! dropped queue stops it.

use crate::{
    client_manager::{duration_from_millis, timestamp_from_millis},
    consumer::{ConsumeFromWhere, ExpressionType, ListenerType},
    errors::{ClientError, Result},
    process_queue::{
        status_of, ProcessQueue, PULL_LATER_DELAY, PULL_LONG_POLLING_TIMEOUT, RECEIVE_LATER_DELAY,
        RECEIVE_LONG_POLLING_TIMEOUT,
    },
};

use morava_core::message::{Endpoints, MessageExt};
use morava_core::proto::{
    Broker, Code, ConsumePolicy, FilterType, Partition, PullMessageRequest, PullMessageResponse,
    QueryOffsetPolicy, QueryOffsetRequest, ReceiveMessageRequest, ReceiveMessageResponse,
};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Server verdict of one receive call, after status-code translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReceiveStatus {
    Ok,
    ResourceExhausted,
    DeadlineExceeded,
    Internal,
}

/// Server verdict of one pull call, after status-code translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PullStatus {
    Ok,
    ResourceExhausted,
    DeadlineExceeded,
    Internal,
}

#[derive(Debug)]
pub(crate) struct ReceiveMessageResult {
    pub(crate) receive_status: ReceiveStatus,
    pub(crate) messages_found: Vec<MessageExt>,
}

#[derive(Debug)]
pub(crate) struct PullMessageResult {
    pub(crate) pull_status: PullStatus,
    pub(crate) next_begin_offset: i64,
    pub(crate) messages_found: Vec<MessageExt>,
}

/// What the receive loop does after one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FetchOutcome {
    /// The queue is dropped; the loop ends.
    Stopped,
    /// Messages may be waiting; poll again immediately.
    Continue,
    /// Backpressured or faulted; poll again after the later-delay.
    Later,
}

/// What the pull loop does after one cycle, carrying the next offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PullOutcome {
    Stopped,
    Continue(i64),
    Later(i64),
}

impl ProcessQueue {
    pub(crate) async fn receive_loop(self: Arc<Self>) {
        loop {
            match self.receive_message().await {
                FetchOutcome::Stopped => return,
                FetchOutcome::Continue => {}
                FetchOutcome::Later => sleep(RECEIVE_LATER_DELAY).await,
            }
        }
    }

    /// One receive cycle: drop check, backpressure check, then the long poll.
    pub(crate) async fn receive_message(&self) -> FetchOutcome {
        if self.is_dropped() {
            debug!(mq = %self.message_queue, "Process queue has been dropped, no longer receive message");
            return FetchOutcome::Stopped;
        }
        if self.throttled() {
            warn!(mq = %self.message_queue, "Process queue is throttled, would receive message later");
            self.stamp_throttle_time();
            return FetchOutcome::Later;
        }
        self.receive_message_immediately().await
    }

    async fn receive_message_immediately(&self) -> FetchOutcome {
        let endpoints = self.message_queue.broker_endpoints.clone();
        let request = self.wrap_receive_message_request();

        self.stamp_activity_time();
        let metadata = match self.consumer.sign().await {
            Ok(metadata) => metadata,
            Err(error) => {
                error!(mq = %self.message_queue, %error, "Exception raised while message reception, would receive later");
                return FetchOutcome::Later;
            }
        };
        self.consumer.increment_reception_times();

        match self
            .consumer
            .client_manager()
            .receive_message(&endpoints, metadata, request, RECEIVE_LONG_POLLING_TIMEOUT)
            .await
        {
            Ok(response) => {
                let result = self.process_receive_message_response(&endpoints, response);
                self.on_receive_message_result(&endpoints, result)
            }
            Err(error) => {
                error!(
                    mq = %self.message_queue,
                    endpoints = %endpoints,
                    %error,
                    "Exception raised while message reception, would receive later"
                );
                FetchOutcome::Later
            }
        }
    }

    fn on_receive_message_result(
        &self,
        endpoints: &Endpoints,
        result: ReceiveMessageResult,
    ) -> FetchOutcome {
        let messages_found_count = result.messages_found.len();
        match result.receive_status {
            ReceiveStatus::Ok => {
                if !result.messages_found.is_empty() {
                    self.cache_messages(result.messages_found);
                    self.consumer
                        .add_received_messages_quantity(messages_found_count as u64);
                    self.consumer.consume_service().dispatch();
                }
                debug!(
                    mq = %self.message_queue,
                    endpoints = %endpoints,
                    messages_found_count,
                    "Receive message with OK"
                );
                FetchOutcome::Continue
            }
            status => {
                error!(
                    status = ?status,
                    mq = %self.message_queue,
                    endpoints = %endpoints,
                    messages_found_count,
                    "Receive message with error status"
                );
                FetchOutcome::Later
            }
        }
    }

    /// Translate the response status and wrap the found messages, stamping
    /// the endpoints their acknowledgements must target.
    pub(crate) fn process_receive_message_response(
        &self,
        endpoints: &Endpoints,
        response: ReceiveMessageResponse,
    ) -> ReceiveMessageResult {
        let (code, status_message) = status_of(&response.common);
        let receive_status = match code {
            Code::Ok => ReceiveStatus::Ok,
            Code::ResourceExhausted => {
                warn!(endpoints = %endpoints, %status_message, "Too many requests in server");
                ReceiveStatus::ResourceExhausted
            }
            Code::DeadlineExceeded => {
                warn!(endpoints = %endpoints, %status_message, "Gateway timeout");
                ReceiveStatus::DeadlineExceeded
            }
            code => {
                warn!(
                    endpoints = %endpoints,
                    code = code.as_str_name(),
                    %status_message,
                    "Receive response indicated server-side error"
                );
                ReceiveStatus::Internal
            }
        };

        let mut messages_found = Vec::new();
        if ReceiveStatus::Ok == receive_status {
            for message in response.messages {
                match MessageExt::wrap(message, endpoints.clone()) {
                    Ok(message) => messages_found.push(message),
                    // TODO: nack malformed messages instead of skipping them
                    Err(error) => {
                        warn!(endpoints = %endpoints, %error, "Skipped a message that cannot be wrapped");
                    }
                }
            }
        }

        ReceiveMessageResult {
            receive_status,
            messages_found,
        }
    }

    fn wrap_receive_message_request(&self) -> ReceiveMessageRequest {
        let options = self.consumer.options();
        let consume_policy = match options.consume_from_where {
            Some(ConsumeFromWhere::Beginning) => ConsumePolicy::Playback,
            Some(ConsumeFromWhere::Timestamp) => ConsumePolicy::TargetTimestamp,
            Some(ConsumeFromWhere::End) => ConsumePolicy::Discard,
            None => ConsumePolicy::Resume,
        };

        ReceiveMessageRequest {
            group: Some(self.group_resource()),
            client_id: self.consumer.client_id().to_string(),
            partition: Some(self.partition()),
            filter_expression: Some(self.wrap_filter_expression()),
            consume_policy: consume_policy as i32,
            batch_size: options.max_await_batch_size_per_queue,
            invisible_duration: Some(duration_from_millis(options.consumption_timeout_millis)),
            await_time: Some(duration_from_millis(options.max_await_time_millis_per_queue)),
            fifo_flag: ListenerType::Orderly == self.consumer.listener_type(),
        }
    }

    pub(crate) async fn pull_loop(self: Arc<Self>) {
        let mut offset = match self.initial_pull_offset().await {
            Some(offset) => offset,
            None => {
                // drop this queue; the next assignments scan may recreate it
                self.consumer.drop_process_queue(&self.message_queue);
                return;
            }
        };
        loop {
            match self.pull_message(offset).await {
                PullOutcome::Stopped => return,
                PullOutcome::Continue(next_offset) => offset = next_offset,
                PullOutcome::Later(next_offset) => {
                    sleep(PULL_LATER_DELAY).await;
                    offset = next_offset;
                }
            }
        }
    }

    /// The offset the pull loop starts from: the custom offset store when one
    /// is configured, the broker's answer per consume-from-where otherwise.
    async fn initial_pull_offset(&self) -> Option<i64> {
        if let Some(offset_store) = self.consumer.offset_store() {
            return match offset_store.read_offset(&self.message_queue).await {
                Ok(offset) => Some(offset),
                Err(error) => {
                    error!(
                        mq = %self.message_queue,
                        %error,
                        "Exception raised while reading offset from offset store"
                    );
                    None
                }
            };
        }
        match self.query_offset().await {
            Ok(offset) => {
                info!(mq = %self.message_queue, offset, "Query offset successfully from remote");
                Some(offset)
            }
            Err(error) => {
                error!(mq = %self.message_queue, %error, "Exception raised while query offset to pull");
                None
            }
        }
    }

    pub(crate) async fn query_offset(&self) -> Result<i64> {
        let options = self.consumer.options();
        let (policy, time_point) = match options.consume_from_where {
            Some(ConsumeFromWhere::Beginning) => (QueryOffsetPolicy::Beginning, None),
            Some(ConsumeFromWhere::End) => (QueryOffsetPolicy::End, None),
            Some(ConsumeFromWhere::Timestamp) | None => (
                QueryOffsetPolicy::TimePoint,
                Some(timestamp_from_millis(options.consume_from_time_millis)),
            ),
        };
        let request = QueryOffsetRequest {
            partition: Some(self.partition()),
            policy: policy as i32,
            time_point,
        };

        let endpoints = self.message_queue.broker_endpoints.clone();
        let metadata = self.consumer.sign().await?;
        let response = self
            .consumer
            .client_manager()
            .query_offset(&endpoints, metadata, request, self.consumer.io_timeout())
            .await?;
        let (code, message) = status_of(&response.common);
        if Code::Ok != code {
            return Err(ClientError::ServerStatus { code, message });
        }
        Ok(response.offset)
    }

    /// One pull cycle: drop check, backpressure check, then the long poll.
    /// The offset advances only on an OK response.
    pub(crate) async fn pull_message(&self, offset: i64) -> PullOutcome {
        if self.is_dropped() {
            info!(mq = %self.message_queue, "Process queue has been dropped, no longer pull message");
            return PullOutcome::Stopped;
        }
        if self.throttled() {
            warn!(mq = %self.message_queue, "Process queue is throttled, would pull message later");
            self.stamp_throttle_time();
            return PullOutcome::Later(offset);
        }
        self.pull_message_immediately(offset).await
    }

    async fn pull_message_immediately(&self, offset: i64) -> PullOutcome {
        let endpoints = self.message_queue.broker_endpoints.clone();
        let request = self.wrap_pull_message_request(offset);

        self.stamp_activity_time();
        let metadata = match self.consumer.sign().await {
            Ok(metadata) => metadata,
            Err(error) => {
                error!(mq = %self.message_queue, %error, "Exception raised while pull message, would pull later");
                return PullOutcome::Later(offset);
            }
        };
        self.consumer.increment_pull_times();

        match self
            .consumer
            .client_manager()
            .pull_message(&endpoints, metadata, request, PULL_LONG_POLLING_TIMEOUT)
            .await
        {
            Ok(response) => {
                let result = self.process_pull_message_response(&endpoints, response, offset);
                self.on_pull_message_result(result)
            }
            Err(error) => {
                error!(
                    mq = %self.message_queue,
                    endpoints = %endpoints,
                    %error,
                    "Exception raised while pull message, would pull later"
                );
                PullOutcome::Later(offset)
            }
        }
    }

    fn on_pull_message_result(&self, result: PullMessageResult) -> PullOutcome {
        let messages_found_count = result.messages_found.len();
        match result.pull_status {
            PullStatus::Ok => {
                if !result.messages_found.is_empty() {
                    self.cache_messages(result.messages_found);
                    self.consumer
                        .add_pulled_messages_quantity(messages_found_count as u64);
                    self.consumer.consume_service().dispatch();
                }
                debug!(
                    mq = %self.message_queue,
                    messages_found_count,
                    "Pull message with OK"
                );
                PullOutcome::Continue(result.next_begin_offset)
            }
            status => {
                error!(
                    status = ?status,
                    mq = %self.message_queue,
                    messages_found_count,
                    "Pull message with error status"
                );
                PullOutcome::Later(result.next_begin_offset)
            }
        }
    }

    pub(crate) fn process_pull_message_response(
        &self,
        endpoints: &Endpoints,
        response: PullMessageResponse,
        current_offset: i64,
    ) -> PullMessageResult {
        let (code, status_message) = status_of(&response.common);
        let pull_status = match code {
            Code::Ok => PullStatus::Ok,
            Code::ResourceExhausted => {
                warn!(endpoints = %endpoints, %status_message, "Too many requests in server");
                PullStatus::ResourceExhausted
            }
            Code::DeadlineExceeded => {
                warn!(endpoints = %endpoints, %status_message, "Gateway timeout");
                PullStatus::DeadlineExceeded
            }
            code => {
                warn!(
                    endpoints = %endpoints,
                    code = code.as_str_name(),
                    %status_message,
                    "Pull response indicated server-side error"
                );
                PullStatus::Internal
            }
        };

        let mut messages_found = Vec::new();
        let next_begin_offset = if PullStatus::Ok == pull_status {
            response.next_offset
        } else {
            current_offset
        };
        if PullStatus::Ok == pull_status {
            for message in response.messages {
                match MessageExt::wrap(message, endpoints.clone()) {
                    Ok(message) => messages_found.push(message),
                    Err(error) => {
                        warn!(endpoints = %endpoints, %error, "Skipped a message that cannot be wrapped");
                    }
                }
            }
        }

        PullMessageResult {
            pull_status,
            next_begin_offset,
            messages_found,
        }
    }

    fn wrap_pull_message_request(&self, offset: i64) -> PullMessageRequest {
        let options = self.consumer.options();
        PullMessageRequest {
            group: Some(self.group_resource()),
            partition: Some(self.partition()),
            offset,
            batch_size: options.max_await_batch_size_per_queue,
            await_time: Some(duration_from_millis(options.max_await_time_millis_per_queue)),
            filter_expression: Some(self.wrap_filter_expression()),
            client_id: self.consumer.client_id().to_string(),
        }
    }

    fn partition(&self) -> Partition {
        Partition {
            topic: Some(self.topic_resource()),
            id: self.message_queue.queue_id,
            broker: Some(Broker {
                name: self.message_queue.broker_name.clone(),
            }),
        }
    }

    fn wrap_filter_expression(&self) -> morava_core::proto::FilterExpression {
        let filter_type = match self.filter_expression.expression_type {
            ExpressionType::Tag => FilterType::Tag,
            ExpressionType::Sql92 => FilterType::Sql,
        };
        morava_core::proto::FilterExpression {
            r#type: filter_type as i32,
            expression: self.filter_expression.expression.clone(),
        }
    }
}
