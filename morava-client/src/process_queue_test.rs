use crate::{
    client_manager::MessagingService,
    consumer::{
        ConsumeFromWhere, ConsumeService, ConsumeStatus, ConsumerOptions, FilterExpression,
        ListenerType, MessageModel, OffsetStore, PushConsumer,
    },
    errors::{ClientError, Result},
    fetch::{FetchOutcome, PullOutcome},
    process_queue::ProcessQueue,
};

use async_trait::async_trait;
use morava_core::message::{Endpoints, MessageExt, MessageQueue};
use morava_core::proto::{
    AckMessageRequest, AckMessageResponse, Code, ForwardMessageToDeadLetterQueueRequest,
    ForwardMessageToDeadLetterQueueResponse, Message, NackMessageRequest, NackMessageResponse,
    PullMessageRequest, PullMessageResponse, QueryOffsetRequest, QueryOffsetResponse,
    ReceiveMessageRequest, ReceiveMessageResponse, Resource, ResponseCommon, Status,
    SystemAttribute,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tonic::metadata::MetadataMap;

fn common_with(code: Code) -> Option<ResponseCommon> {
    Some(ResponseCommon {
        status: Some(Status {
            code: code as i32,
            message: String::new(),
        }),
    })
}

fn ok_common() -> Option<ResponseCommon> {
    common_with(Code::Ok)
}

fn proto_message(id: &str, offset: i64, body: Vec<u8>) -> Message {
    Message {
        topic: Some(Resource {
            arn: "test-arn".to_string(),
            name: "test-topic".to_string(),
        }),
        system_attribute: Some(SystemAttribute {
            message_id: id.to_string(),
            receipt_handle: format!("rh-{}", id),
            partition_id: 0,
            partition_offset: offset,
            delivery_attempt: 1,
            born_timestamp: None,
        }),
        user_attribute: HashMap::new(),
        body,
    }
}

fn test_message(id: &str, offset: i64, body_len: usize) -> MessageExt {
    MessageExt {
        message_id: id.to_string(),
        topic: "test-topic".to_string(),
        body: vec![0u8; body_len],
        queue_offset: offset,
        receipt_handle: format!("rh-{}", id),
        delivery_attempt: 1,
        ack_endpoints: Endpoints::new("localhost", 8081),
        user_attributes: HashMap::new(),
    }
}

fn test_message_queue() -> MessageQueue {
    MessageQueue {
        topic: "test-topic".to_string(),
        broker_name: "broker-a".to_string(),
        queue_id: 0,
        broker_endpoints: Endpoints::new("localhost", 8081),
    }
}

/// Recording RPC double: every call is captured; responses come from the
/// per-operation scripts, defaulting to OK where that makes sense.
#[derive(Debug, Default)]
struct TestClientManager {
    receive_responses: Mutex<VecDeque<ReceiveMessageResponse>>,
    pull_responses: Mutex<VecDeque<PullMessageResponse>>,
    query_responses: Mutex<VecDeque<QueryOffsetResponse>>,
    // respond INTERNAL to this many ack/forward calls before answering OK
    ack_failures: AtomicUsize,
    forward_failures: AtomicUsize,

    receive_requests: Mutex<Vec<(Endpoints, ReceiveMessageRequest)>>,
    pull_requests: Mutex<Vec<(Endpoints, PullMessageRequest)>>,
    query_requests: Mutex<Vec<(Endpoints, QueryOffsetRequest)>>,
    ack_requests: Mutex<Vec<(Endpoints, AckMessageRequest)>>,
    nack_requests: Mutex<Vec<(Endpoints, NackMessageRequest)>>,
    forward_requests: Mutex<Vec<(Endpoints, ForwardMessageToDeadLetterQueueRequest)>>,
}

impl TestClientManager {
    fn script_receive(&self, response: ReceiveMessageResponse) {
        self.receive_responses.lock().unwrap().push_back(response);
    }

    fn script_pull(&self, response: PullMessageResponse) {
        self.pull_responses.lock().unwrap().push_back(response);
    }

    fn script_query(&self, response: QueryOffsetResponse) {
        self.query_responses.lock().unwrap().push_back(response);
    }

    fn fail_acks(&self, count: usize) {
        self.ack_failures.store(count, Ordering::SeqCst);
    }

    fn fail_forwards(&self, count: usize) {
        self.forward_failures.store(count, Ordering::SeqCst);
    }

    fn ack_request_count(&self) -> usize {
        self.ack_requests.lock().unwrap().len()
    }

    fn nack_request_count(&self) -> usize {
        self.nack_requests.lock().unwrap().len()
    }

    fn forward_request_count(&self) -> usize {
        self.forward_requests.lock().unwrap().len()
    }

    fn receive_request_count(&self) -> usize {
        self.receive_requests.lock().unwrap().len()
    }

    fn consume_failure_budget(budget: &AtomicUsize) -> bool {
        budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok()
    }
}

#[async_trait]
impl MessagingService for TestClientManager {
    async fn query_offset(
        &self,
        endpoints: &Endpoints,
        _metadata: MetadataMap,
        request: QueryOffsetRequest,
        _timeout: Duration,
    ) -> Result<QueryOffsetResponse> {
        self.query_requests
            .lock()
            .unwrap()
            .push((endpoints.clone(), request));
        self.query_responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ClientError::Unrecoverable("no scripted query response".to_string()))
    }

    async fn receive_message(
        &self,
        endpoints: &Endpoints,
        _metadata: MetadataMap,
        request: ReceiveMessageRequest,
        _timeout: Duration,
    ) -> Result<ReceiveMessageResponse> {
        self.receive_requests
            .lock()
            .unwrap()
            .push((endpoints.clone(), request));
        self.receive_responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ClientError::Unrecoverable("no scripted receive response".to_string()))
    }

    async fn pull_message(
        &self,
        endpoints: &Endpoints,
        _metadata: MetadataMap,
        request: PullMessageRequest,
        _timeout: Duration,
    ) -> Result<PullMessageResponse> {
        self.pull_requests
            .lock()
            .unwrap()
            .push((endpoints.clone(), request));
        self.pull_responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ClientError::Unrecoverable("no scripted pull response".to_string()))
    }

    async fn ack_message(
        &self,
        endpoints: &Endpoints,
        _metadata: MetadataMap,
        request: AckMessageRequest,
        _timeout: Duration,
    ) -> Result<AckMessageResponse> {
        self.ack_requests
            .lock()
            .unwrap()
            .push((endpoints.clone(), request));
        let code = if Self::consume_failure_budget(&self.ack_failures) {
            Code::Internal
        } else {
            Code::Ok
        };
        Ok(AckMessageResponse {
            common: common_with(code),
        })
    }

    async fn nack_message(
        &self,
        endpoints: &Endpoints,
        _metadata: MetadataMap,
        request: NackMessageRequest,
        _timeout: Duration,
    ) -> Result<NackMessageResponse> {
        self.nack_requests
            .lock()
            .unwrap()
            .push((endpoints.clone(), request));
        Ok(NackMessageResponse {
            common: ok_common(),
        })
    }

    async fn forward_message_to_dead_letter_queue(
        &self,
        endpoints: &Endpoints,
        _metadata: MetadataMap,
        request: ForwardMessageToDeadLetterQueueRequest,
        _timeout: Duration,
    ) -> Result<ForwardMessageToDeadLetterQueueResponse> {
        self.forward_requests
            .lock()
            .unwrap()
            .push((endpoints.clone(), request));
        let code = if Self::consume_failure_budget(&self.forward_failures) {
            Code::Internal
        } else {
            Code::Ok
        };
        Ok(ForwardMessageToDeadLetterQueueResponse {
            common: common_with(code),
        })
    }
}

/// Scripted consume service: records dispatch signals and redeliveries, and
/// answers each redelivery with the next scripted verdict (OK by default).
#[derive(Debug, Default)]
struct TestConsumeService {
    dispatched: AtomicUsize,
    redelivery_verdicts: Mutex<VecDeque<ConsumeStatus>>,
    redeliveries: Mutex<Vec<MessageExt>>,
    fail_redeliveries: std::sync::atomic::AtomicBool,
}

impl TestConsumeService {
    fn script_redelivery(&self, verdict: ConsumeStatus) {
        self.redelivery_verdicts.lock().unwrap().push_back(verdict);
    }

    fn redelivered_attempts(&self) -> Vec<i32> {
        self.redeliveries
            .lock()
            .unwrap()
            .iter()
            .map(|message| message.delivery_attempt)
            .collect()
    }

    fn dispatch_count(&self) -> usize {
        self.dispatched.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConsumeService for TestConsumeService {
    fn dispatch(&self) {
        self.dispatched.fetch_add(1, Ordering::SeqCst);
    }

    async fn consume(&self, message: MessageExt, _delay: Duration) -> Result<ConsumeStatus> {
        self.redeliveries.lock().unwrap().push(message);
        if self.fail_redeliveries.load(Ordering::SeqCst) {
            return Err(ClientError::Unrecoverable(
                "redelivery rejected".to_string(),
            ));
        }
        Ok(self
            .redelivery_verdicts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ConsumeStatus::Ok))
    }
}

#[derive(Debug)]
struct TestOffsetStore {
    offset: Result<i64>,
}

impl TestOffsetStore {
    fn failing() -> Self {
        TestOffsetStore {
            offset: Err(ClientError::Unrecoverable("offset store down".to_string())),
        }
    }

    fn with_offset(offset: i64) -> Self {
        TestOffsetStore { offset: Ok(offset) }
    }
}

#[async_trait]
impl OffsetStore for TestOffsetStore {
    async fn read_offset(&self, _message_queue: &MessageQueue) -> Result<i64> {
        match &self.offset {
            Ok(offset) => Ok(*offset),
            Err(_) => Err(ClientError::Unrecoverable("offset store down".to_string())),
        }
    }
}

struct TestSetup {
    consumer: PushConsumer,
    client: Arc<TestClientManager>,
    consume_service: Arc<TestConsumeService>,
}

fn create_test_setup(options: ConsumerOptions) -> TestSetup {
    create_test_setup_with(options, None)
}

fn create_test_setup_with(
    options: ConsumerOptions,
    offset_store: Option<Arc<TestOffsetStore>>,
) -> TestSetup {
    let client = Arc::new(TestClientManager::default());
    let consume_service = Arc::new(TestConsumeService::default());
    let mut builder = PushConsumer::builder()
        .with_group("test-group")
        .with_arn("test-arn")
        .with_client_id("test-client")
        .with_options(options)
        .with_consume_service(Arc::clone(&consume_service) as Arc<dyn ConsumeService>)
        .with_client_manager(Arc::clone(&client) as Arc<dyn MessagingService>);
    if let Some(offset_store) = offset_store {
        builder = builder.with_offset_store(offset_store as Arc<dyn OffsetStore>);
    }
    let consumer = builder.build().expect("build test consumer");
    TestSetup {
        consumer,
        client,
        consume_service,
    }
}

fn create_test_process_queue(setup: &TestSetup) -> Arc<ProcessQueue> {
    ProcessQueue::new(
        Arc::clone(setup.consumer.inner()),
        test_message_queue(),
        FilterExpression::default(),
    )
}

/// Poll until `condition` holds; background settlement work (spawned ack
/// tasks) has no completion handle to await.
async fn wait_until<F: Fn() -> bool>(condition: F) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within timeout");
}

/// A taken batch erased with OK acknowledges every message to the endpoints
/// it was received from and returns the cache budget.
#[tokio::test]
async fn erase_with_ok_acks_and_reclaims_budget() {
    let setup = create_test_setup(ConsumerOptions::default());
    let process_queue = create_test_process_queue(&setup);

    process_queue.cache_messages(vec![test_message("a", 100, 10)]);
    let taken = process_queue.try_take_messages(1);
    assert_eq!(taken.len(), 1);
    assert_eq!(taken[0].message_id, "a");

    process_queue.erase_messages(taken, ConsumeStatus::Ok);
    wait_until(|| setup.client.ack_request_count() == 1).await;

    assert_eq!(process_queue.cached_message_bytes(), 0);
    assert_eq!(process_queue.cached_messages_quantity(), 0);
    assert_eq!(setup.consumer.consumption_ok_quantity(), 1);

    let ack_requests = setup.client.ack_requests.lock().unwrap();
    let (endpoints, request) = &ack_requests[0];
    assert_eq!(*endpoints, Endpoints::new("localhost", 8081));
    assert_eq!(request.message_id, "a");
    assert_eq!(request.receipt_handle, "rh-a");
    assert_eq!(request.client_id, "test-client");
    assert_eq!(request.group.as_ref().unwrap().name, "test-group");
    assert_eq!(request.topic.as_ref().unwrap().name, "test-topic");
}

/// A failed batch is negatively acknowledged message by message.
#[tokio::test]
async fn erase_with_error_nacks_every_message() {
    let setup = create_test_setup(ConsumerOptions::default());
    let process_queue = create_test_process_queue(&setup);

    process_queue.cache_messages(vec![test_message("a", 100, 10), test_message("b", 101, 10)]);
    let taken = process_queue.try_take_messages(10);
    assert_eq!(taken.len(), 2);

    process_queue.erase_messages(taken, ConsumeStatus::Error);
    wait_until(|| setup.client.nack_request_count() == 2).await;

    assert_eq!(process_queue.cached_message_bytes(), 0);
    assert_eq!(setup.client.ack_request_count(), 0);
    assert_eq!(setup.consumer.consumption_error_quantity(), 2);

    let nack_requests = setup.client.nack_requests.lock().unwrap();
    assert_eq!(nack_requests[0].1.delivery_attempt, 1);
    assert_eq!(nack_requests[0].1.max_delivery_attempts, 16);
}

/// A throttled queue stamps the throttle time and defers the cycle without
/// issuing any RPC.
#[tokio::test]
async fn throttled_receive_defers_without_rpc() {
    let mut options = ConsumerOptions::default();
    options.cached_messages_quantity_threshold_per_queue = 1;
    let setup = create_test_setup(options);
    let process_queue = create_test_process_queue(&setup);

    process_queue.cache_messages(vec![test_message("a", 100, 10)]);
    process_queue.set_throttle_time(Instant::now() - Duration::from_secs(10));

    let outcome = process_queue.receive_message().await;
    assert_eq!(outcome, FetchOutcome::Later);
    assert_eq!(setup.client.receive_request_count(), 0);
    // the deferral stamped a fresh throttle time
    assert!(process_queue.throttle_idle() < Duration::from_secs(1));
}

/// Bytes backpressure throttles on its own, regardless of quantity.
#[tokio::test]
async fn bytes_threshold_throttles_receive() {
    let mut options = ConsumerOptions::default();
    options.cached_messages_bytes_threshold_per_queue = 10;
    let setup = create_test_setup(options);
    let process_queue = create_test_process_queue(&setup);

    process_queue.cache_messages(vec![test_message("a", 100, 10)]);
    let outcome = process_queue.receive_message().await;
    assert_eq!(outcome, FetchOutcome::Later);
    assert_eq!(setup.client.receive_request_count(), 0);
}

/// FIFO error verdicts escalate the delivery attempt through redeliveries and
/// forward to the DLQ when the budget is exhausted, releasing the slot.
#[tokio::test]
async fn fifo_redelivery_exhaustion_forwards_to_dlq() {
    let mut options = ConsumerOptions::default();
    options.max_delivery_attempts = 3;
    options.listener_type = ListenerType::Orderly;
    let setup = create_test_setup(options);
    let process_queue = create_test_process_queue(&setup);

    setup.consume_service.script_redelivery(ConsumeStatus::Error);
    setup.consume_service.script_redelivery(ConsumeStatus::Error);

    process_queue.cache_messages(vec![test_message("a", 100, 10)]);
    let message = process_queue.try_take_fifo_message().expect("head message");

    Arc::clone(&process_queue)
        .erase_fifo(message, ConsumeStatus::Error)
        .await;

    // attempts 2 and 3 were redelivered, then the message went to the DLQ
    assert_eq!(setup.consume_service.redelivered_attempts(), vec![2, 3]);
    assert_eq!(setup.client.forward_request_count(), 1);
    assert_eq!(setup.client.ack_request_count(), 0);
    {
        let forward_requests = setup.client.forward_requests.lock().unwrap();
        assert_eq!(forward_requests[0].1.delivery_attempt, 3);
        assert_eq!(forward_requests[0].1.max_delivery_attempts, 3);
    }
    assert_eq!(process_queue.cached_messages_quantity(), 0);
    assert_eq!(process_queue.cached_message_bytes(), 0);
    assert!(!process_queue.store.fifo_slot_busy());
    assert_eq!(setup.consumer.consumption_error_quantity(), 3);
}

/// A FIFO message consumed OK on a later attempt is acknowledged, not
/// forwarded.
#[tokio::test]
async fn fifo_redelivery_recovers_with_ack() {
    let mut options = ConsumerOptions::default();
    options.max_delivery_attempts = 3;
    options.listener_type = ListenerType::Orderly;
    let setup = create_test_setup(options);
    let process_queue = create_test_process_queue(&setup);

    setup.consume_service.script_redelivery(ConsumeStatus::Ok);

    process_queue.cache_messages(vec![test_message("a", 100, 10)]);
    let message = process_queue.try_take_fifo_message().expect("head message");

    Arc::clone(&process_queue)
        .erase_fifo(message, ConsumeStatus::Error)
        .await;

    assert_eq!(setup.consume_service.redelivered_attempts(), vec![2]);
    assert_eq!(setup.client.ack_request_count(), 1);
    assert_eq!(setup.client.forward_request_count(), 0);
    assert!(!process_queue.store.fifo_slot_busy());
    assert_eq!(setup.consumer.consumption_error_quantity(), 1);
    assert_eq!(setup.consumer.consumption_ok_quantity(), 1);
}

/// The terminal FIFO ack retries through transient server errors and settles
/// the message exactly once.
#[tokio::test]
async fn fifo_ack_retries_until_ok() {
    let mut options = ConsumerOptions::default();
    options.listener_type = ListenerType::Orderly;
    let setup = create_test_setup(options);
    let process_queue = create_test_process_queue(&setup);

    setup.client.fail_acks(2);
    process_queue.cache_messages(vec![test_message("a", 100, 10)]);
    let message = process_queue.try_take_fifo_message().expect("head message");

    Arc::clone(&process_queue)
        .erase_fifo(message, ConsumeStatus::Ok)
        .await;

    assert_eq!(setup.client.ack_request_count(), 3);
    assert_eq!(process_queue.cached_messages_quantity(), 0);
    assert_eq!(process_queue.cached_message_bytes(), 0);
    assert!(!process_queue.store.fifo_slot_busy());
}

/// The DLQ forward retries through transient server errors before settling.
#[tokio::test]
async fn fifo_dlq_forward_retries_until_ok() {
    let mut options = ConsumerOptions::default();
    options.max_delivery_attempts = 1;
    options.listener_type = ListenerType::Orderly;
    let setup = create_test_setup(options);
    let process_queue = create_test_process_queue(&setup);

    setup.client.fail_forwards(1);
    process_queue.cache_messages(vec![test_message("a", 100, 10)]);
    let message = process_queue.try_take_fifo_message().expect("head message");

    Arc::clone(&process_queue)
        .erase_fifo(message, ConsumeStatus::Error)
        .await;

    // a single delivery attempt goes straight to the DLQ, no redelivery
    assert!(setup.consume_service.redelivered_attempts().is_empty());
    assert_eq!(setup.client.forward_request_count(), 2);
    assert!(!process_queue.store.fifo_slot_busy());
    assert_eq!(process_queue.cached_messages_quantity(), 0);
}

/// Dropping the queue while the FIFO ack chain is backing off abandons the
/// retry: the message stays in flight and the slot stays pinned.
#[tokio::test]
async fn drop_during_fifo_ack_retry_gives_up() {
    let mut options = ConsumerOptions::default();
    options.listener_type = ListenerType::Orderly;
    let setup = create_test_setup(options);
    let process_queue = create_test_process_queue(&setup);

    setup.client.fail_acks(usize::MAX);
    process_queue.cache_messages(vec![test_message("a", 100, 10)]);
    let message = process_queue.try_take_fifo_message().expect("head message");

    let settlement = tokio::spawn(
        Arc::clone(&process_queue).erase_fifo(message, ConsumeStatus::Ok),
    );
    wait_until(|| setup.client.ack_request_count() >= 1).await;
    ProcessQueue::drop(&process_queue);
    settlement.await.expect("settlement task");

    let attempts_after_drop = setup.client.ack_request_count();
    sleep(Duration::from_millis(300)).await;
    assert_eq!(setup.client.ack_request_count(), attempts_after_drop);
    // the message was never settled
    assert_eq!(process_queue.inflight_messages_quantity(), 1);
    assert_eq!(process_queue.cached_message_bytes(), 10);
    assert!(process_queue.store.fifo_slot_busy());
}

/// A failing redelivery submission logs and leaves the slot busy; only drop
/// recovers the queue.
#[tokio::test]
async fn failed_redelivery_submission_pins_the_slot() {
    let mut options = ConsumerOptions::default();
    options.max_delivery_attempts = 3;
    options.listener_type = ListenerType::Orderly;
    let setup = create_test_setup(options);
    let process_queue = create_test_process_queue(&setup);

    setup
        .consume_service
        .fail_redeliveries
        .store(true, Ordering::SeqCst);
    process_queue.cache_messages(vec![test_message("a", 100, 10)]);
    let message = process_queue.try_take_fifo_message().expect("head message");

    Arc::clone(&process_queue)
        .erase_fifo(message, ConsumeStatus::Error)
        .await;

    assert!(process_queue.store.fifo_slot_busy());
    assert_eq!(process_queue.inflight_messages_quantity(), 1);
    assert_eq!(setup.client.forward_request_count(), 0);
}

/// Broadcasting mode books offsets in the ledger and never issues ack RPCs.
#[tokio::test]
async fn broadcasting_erase_commits_through_the_ledger() {
    let mut options = ConsumerOptions::default();
    options.message_model = MessageModel::Broadcasting;
    let setup = create_test_setup(options);
    let process_queue = create_test_process_queue(&setup);

    process_queue.cache_messages(vec![test_message("a", 100, 10)]);
    process_queue.cache_messages(vec![test_message("b", 101, 10)]);
    assert_eq!(
        process_queue.ledger().snapshot(),
        vec![(100, false), (101, false)]
    );

    let taken = process_queue.try_take_messages(10);
    process_queue.erase_messages(taken, ConsumeStatus::Ok);

    sleep(Duration::from_millis(50)).await;
    assert_eq!(setup.client.ack_request_count(), 0);
    assert_eq!(setup.client.nack_request_count(), 0);
    assert_eq!(process_queue.committed_offset(), Some(102));
    assert_eq!(process_queue.cached_message_bytes(), 0);
}

/// Broadcasting FIFO settlement releases the ledger record and the slot
/// without talking to the broker.
#[tokio::test]
async fn broadcasting_fifo_erase_skips_the_broker() {
    let mut options = ConsumerOptions::default();
    options.message_model = MessageModel::Broadcasting;
    options.listener_type = ListenerType::Orderly;
    let setup = create_test_setup(options);
    let process_queue = create_test_process_queue(&setup);

    process_queue.cache_messages(vec![test_message("a", 100, 10)]);
    let message = process_queue.try_take_fifo_message().expect("head message");

    Arc::clone(&process_queue)
        .erase_fifo(message, ConsumeStatus::Error)
        .await;

    assert_eq!(setup.client.forward_request_count(), 0);
    assert_eq!(setup.client.ack_request_count(), 0);
    assert!(!process_queue.store.fifo_slot_busy());
    assert_eq!(process_queue.committed_offset(), Some(101));
}

/// An OK receive response caches the found messages, bumps the counters and
/// signals the consume service.
#[tokio::test]
async fn receive_ok_caches_and_signals() {
    let setup = create_test_setup(ConsumerOptions::default());
    let process_queue = create_test_process_queue(&setup);

    setup.client.script_receive(ReceiveMessageResponse {
        common: ok_common(),
        messages: vec![
            proto_message("a", 100, vec![1; 10]),
            proto_message("b", 101, vec![2; 20]),
        ],
        delivery_timestamp: None,
        invisible_duration: None,
    });

    let outcome = process_queue.receive_message().await;
    assert_eq!(outcome, FetchOutcome::Continue);
    assert_eq!(process_queue.cached_messages_quantity(), 2);
    assert_eq!(process_queue.cached_message_bytes(), 30);
    assert_eq!(setup.consumer.received_messages_quantity(), 2);
    assert_eq!(setup.consume_service.dispatch_count(), 1);

    // wrapped messages carry the ack target of the fetch endpoints
    let taken = process_queue.try_take_messages(2);
    assert_eq!(taken[0].ack_endpoints, Endpoints::new("localhost", 8081));
    assert_eq!(taken[0].delivery_attempt, 1);
}

/// An empty OK response loops immediately without signalling the dispatcher.
#[tokio::test]
async fn receive_empty_ok_continues() {
    let setup = create_test_setup(ConsumerOptions::default());
    let process_queue = create_test_process_queue(&setup);

    setup.client.script_receive(ReceiveMessageResponse {
        common: ok_common(),
        messages: Vec::new(),
        delivery_timestamp: None,
        invisible_duration: None,
    });

    let outcome = process_queue.receive_message().await;
    assert_eq!(outcome, FetchOutcome::Continue);
    assert_eq!(setup.consume_service.dispatch_count(), 0);
    assert_eq!(process_queue.cached_messages_quantity(), 0);
}

/// Non-OK receive statuses defer the next cycle.
#[tokio::test]
async fn receive_server_error_defers() {
    let setup = create_test_setup(ConsumerOptions::default());
    let process_queue = create_test_process_queue(&setup);

    setup.client.script_receive(ReceiveMessageResponse {
        common: common_with(Code::ResourceExhausted),
        messages: Vec::new(),
        delivery_timestamp: None,
        invisible_duration: None,
    });

    let outcome = process_queue.receive_message().await;
    assert_eq!(outcome, FetchOutcome::Later);
    assert_eq!(process_queue.cached_messages_quantity(), 0);
}

/// Transport faults defer the next cycle instead of ending the loop.
#[tokio::test]
async fn receive_transport_error_defers() {
    let setup = create_test_setup(ConsumerOptions::default());
    let process_queue = create_test_process_queue(&setup);

    // no scripted response: the double fails the call
    let outcome = process_queue.receive_message().await;
    assert_eq!(outcome, FetchOutcome::Later);
    assert_eq!(setup.client.receive_request_count(), 1);
}

/// A dropped queue stops the receive loop and issues nothing.
#[tokio::test]
async fn dropped_queue_stops_receiving() {
    let setup = create_test_setup(ConsumerOptions::default());
    let process_queue = create_test_process_queue(&setup);

    ProcessQueue::drop(&process_queue);
    let outcome = process_queue.receive_message().await;
    assert_eq!(outcome, FetchOutcome::Stopped);
    assert_eq!(setup.client.receive_request_count(), 0);
}

/// A message that cannot be wrapped is skipped; the rest of the batch is
/// cached.
#[tokio::test]
async fn malformed_message_is_skipped() {
    let setup = create_test_setup(ConsumerOptions::default());
    let process_queue = create_test_process_queue(&setup);

    let mut malformed = proto_message("bad", 102, vec![0; 5]);
    malformed.system_attribute = None;
    setup.client.script_receive(ReceiveMessageResponse {
        common: ok_common(),
        messages: vec![proto_message("a", 100, vec![1; 10]), malformed],
        delivery_timestamp: None,
        invisible_duration: None,
    });

    let outcome = process_queue.receive_message().await;
    assert_eq!(outcome, FetchOutcome::Continue);
    assert_eq!(process_queue.cached_messages_quantity(), 1);
    assert_eq!(process_queue.cached_message_bytes(), 10);
}

/// The receive request mirrors the consumer configuration: policy, filter,
/// batching, invisibility and the FIFO flag.
#[tokio::test]
async fn receive_request_reflects_configuration() {
    let mut options = ConsumerOptions::default();
    options.listener_type = ListenerType::Orderly;
    options.consume_from_where = Some(ConsumeFromWhere::Timestamp);
    options.max_await_batch_size_per_queue = 8;
    options.consumption_timeout_millis = 5_000;
    let setup = create_test_setup(options);
    let process_queue = create_test_process_queue(&setup);

    let _ = process_queue.receive_message().await;

    let receive_requests = setup.client.receive_requests.lock().unwrap();
    let (_, request) = &receive_requests[0];
    assert_eq!(
        request.consume_policy,
        morava_core::proto::ConsumePolicy::TargetTimestamp as i32
    );
    assert!(request.fifo_flag);
    assert_eq!(request.batch_size, 8);
    assert_eq!(request.invisible_duration.as_ref().unwrap().seconds, 5);
    let filter = request.filter_expression.as_ref().unwrap();
    assert_eq!(filter.expression, "*");
    assert_eq!(filter.r#type, morava_core::proto::FilterType::Tag as i32);
    assert_eq!(request.group.as_ref().unwrap().arn, "test-arn");
    assert_eq!(request.partition.as_ref().unwrap().id, 0);
}

/// An OK pull advances to the response's next offset and caches the batch.
#[tokio::test]
async fn pull_ok_advances_offset() {
    let mut options = ConsumerOptions::default();
    options.message_model = MessageModel::Broadcasting;
    let setup = create_test_setup(options);
    let process_queue = create_test_process_queue(&setup);

    setup.client.script_pull(PullMessageResponse {
        common: ok_common(),
        min_offset: 0,
        next_offset: 7,
        max_offset: 10,
        messages: vec![proto_message("a", 5, vec![1; 10])],
    });

    let outcome = process_queue.pull_message(5).await;
    assert_eq!(outcome, PullOutcome::Continue(7));
    assert_eq!(process_queue.cached_messages_quantity(), 1);
    assert_eq!(setup.consumer.pulled_messages_quantity(), 1);
    assert_eq!(setup.consume_service.dispatch_count(), 1);

    let pull_requests = setup.client.pull_requests.lock().unwrap();
    assert_eq!(pull_requests[0].1.offset, 5);
}

/// A failed pull retries the same offset; only OK advances it.
#[tokio::test]
async fn pull_failure_keeps_offset() {
    let mut options = ConsumerOptions::default();
    options.message_model = MessageModel::Broadcasting;
    let setup = create_test_setup(options);
    let process_queue = create_test_process_queue(&setup);

    setup.client.script_pull(PullMessageResponse {
        common: common_with(Code::Internal),
        min_offset: 0,
        next_offset: 9,
        max_offset: 10,
        messages: Vec::new(),
    });

    let outcome = process_queue.pull_message(5).await;
    assert_eq!(outcome, PullOutcome::Later(5));
    assert_eq!(process_queue.cached_messages_quantity(), 0);
}

/// Pull initialization asks the broker for an offset when no custom store is
/// configured.
#[tokio::test]
async fn pull_initialization_queries_the_broker() {
    let mut options = ConsumerOptions::default();
    options.message_model = MessageModel::Broadcasting;
    options.consume_from_where = Some(ConsumeFromWhere::Beginning);
    let setup = create_test_setup(options);
    let process_queue = create_test_process_queue(&setup);

    setup.client.script_query(QueryOffsetResponse {
        common: ok_common(),
        offset: 42,
    });

    let offset = process_queue.query_offset().await.expect("offset");
    assert_eq!(offset, 42);

    let query_requests = setup.client.query_requests.lock().unwrap();
    assert_eq!(
        query_requests[0].1.policy,
        morava_core::proto::QueryOffsetPolicy::Beginning as i32
    );
}

/// An unreadable custom offset store drops the queue on pull start; the
/// assignment layer will observe the drop on its next scan.
#[tokio::test]
async fn offset_store_failure_drops_the_queue() {
    let mut options = ConsumerOptions::default();
    options.message_model = MessageModel::Broadcasting;
    let setup =
        create_test_setup_with(options, Some(Arc::new(TestOffsetStore::failing())));

    let message_queue = test_message_queue();
    setup
        .consumer
        .assign(message_queue.clone(), FilterExpression::default());
    wait_until(|| setup.consumer.process_queue(&message_queue).is_none()).await;
}

/// The custom offset store seeds the first pull when it is configured.
#[tokio::test]
async fn offset_store_seeds_the_first_pull() {
    let mut options = ConsumerOptions::default();
    options.message_model = MessageModel::Broadcasting;
    let setup =
        create_test_setup_with(options, Some(Arc::new(TestOffsetStore::with_offset(33))));

    let message_queue = test_message_queue();
    let process_queue = setup
        .consumer
        .assign(message_queue.clone(), FilterExpression::default());
    wait_until(|| !setup.client.pull_requests.lock().unwrap().is_empty()).await;
    ProcessQueue::drop(&process_queue);

    let pull_requests = setup.client.pull_requests.lock().unwrap();
    assert_eq!(pull_requests[0].1.offset, 33);
}

/// The per-topic rate limiter bounds takes through the facade.
#[tokio::test]
async fn topic_rate_limiter_bounds_takes() {
    let setup = create_test_setup(ConsumerOptions::default());
    let process_queue = create_test_process_queue(&setup);
    setup.consumer.set_rate_limiter("test-topic", 1);

    process_queue.cache_messages(vec![test_message("a", 100, 1), test_message("b", 101, 1)]);
    assert_eq!(process_queue.try_take_messages(2).len(), 1);
    assert!(process_queue.try_take_messages(2).is_empty());
    assert_eq!(process_queue.inflight_messages_quantity(), 1);
}

/// Expiry requires both the fetch and the throttle stamps to be stale; a
/// backpressured queue never expires by itself.
#[tokio::test]
async fn expiry_needs_both_stamps_stale() {
    let setup = create_test_setup(ConsumerOptions::default());
    let process_queue = create_test_process_queue(&setup);

    assert!(!process_queue.expired());

    process_queue.set_activity_time(Instant::now() - Duration::from_secs(31));
    assert!(!process_queue.expired());

    process_queue.set_throttle_time(Instant::now() - Duration::from_secs(31));
    assert!(process_queue.expired());
}

/// Erasing nothing changes nothing.
#[tokio::test]
async fn erase_empty_batch_is_a_noop() {
    let setup = create_test_setup(ConsumerOptions::default());
    let process_queue = create_test_process_queue(&setup);

    process_queue.cache_messages(vec![test_message("a", 100, 10)]);
    process_queue.erase_messages(Vec::new(), ConsumeStatus::Ok);

    sleep(Duration::from_millis(20)).await;
    assert_eq!(process_queue.cached_message_bytes(), 10);
    assert_eq!(setup.client.ack_request_count(), 0);
    assert_eq!(setup.consumer.consumption_ok_quantity(), 0);
}

/// The consumer-level sweep drops exactly the stalled queues.
#[tokio::test]
async fn expired_queue_sweep_drops_stalled_queues() {
    let setup = create_test_setup(ConsumerOptions::default());

    let stalled_queue = test_message_queue();
    let fresh_queue = MessageQueue {
        queue_id: 1,
        ..test_message_queue()
    };
    let stalled = setup
        .consumer
        .assign(stalled_queue.clone(), FilterExpression::default());
    setup
        .consumer
        .assign(fresh_queue.clone(), FilterExpression::default());
    // both loops finished their first cycle and are parked on the later-delay
    wait_until(|| setup.client.receive_request_count() >= 2).await;

    stalled.set_activity_time(Instant::now() - Duration::from_secs(31));
    stalled.set_throttle_time(Instant::now() - Duration::from_secs(31));

    setup.consumer.drop_expired_queues();
    assert!(setup.consumer.process_queue(&stalled_queue).is_none());
    assert!(setup.consumer.process_queue(&fresh_queue).is_some());

    setup.consumer.close();
    assert!(setup.consumer.process_queue(&fresh_queue).is_none());
}
