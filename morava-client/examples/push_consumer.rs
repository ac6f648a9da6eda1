//! Minimal push consumer wiring: a consume service that drains one assigned
//! partition with concurrent batches.

use async_trait::async_trait;
use morava_client::errors::Result;
use morava_client::{ConsumeService, ConsumeStatus, FilterExpression, PushConsumer};
use morava_core::message::{Endpoints, MessageExt, MessageQueue};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct PrintingConsumeService {
    wakeup: Notify,
}

#[async_trait]
impl ConsumeService for PrintingConsumeService {
    fn dispatch(&self) {
        self.wakeup.notify_one();
    }

    async fn consume(&self, message: MessageExt, delay: Duration) -> Result<ConsumeStatus> {
        tokio::time::sleep(delay).await;
        println!(
            "redelivered {} (attempt {})",
            message.message_id, message.delivery_attempt
        );
        Ok(ConsumeStatus::Ok)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let consume_service = Arc::new(PrintingConsumeService::default());

    let consumer = PushConsumer::builder()
        .with_access_endpoints(Endpoints::new("localhost", 8081))
        .with_group("example-group")
        .with_arn("example-arn")
        .with_consume_service(Arc::clone(&consume_service) as Arc<dyn ConsumeService>)
        .build()?;

    // One partition, the way the assignment layer would hand it out.
    let message_queue = MessageQueue {
        topic: "example-topic".to_string(),
        broker_name: "broker-a".to_string(),
        queue_id: 0,
        broker_endpoints: Endpoints::new("localhost", 8081),
    };
    let process_queue = consumer.assign(message_queue, FilterExpression::default());

    loop {
        consume_service.wakeup.notified().await;
        loop {
            let batch = process_queue.try_take_messages(32);
            if batch.is_empty() {
                break;
            }
            for message in &batch {
                println!(
                    "consumed {} at offset {}",
                    message.message_id, message.queue_offset
                );
            }
            process_queue.erase_messages(batch, ConsumeStatus::Ok);
        }
    }
}
