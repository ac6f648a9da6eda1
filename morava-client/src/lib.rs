//! Morava-Client
//!
//! Morava-Client -- the Morava message bus consumer client

pub mod errors;

mod auth_service;

mod client_manager;

mod connection_manager;

mod consumer;
pub use consumer::{
    ConsumeFromWhere, ConsumeService, ConsumeStatus, ConsumerOptions, ExpressionType,
    FilterExpression, ListenerType, MessageModel, OffsetStore, PushConsumer, PushConsumerBuilder,
};

mod fetch;

mod message_store;

mod offset_ledger;

mod process_queue;
pub use process_queue::ProcessQueue;

#[cfg(test)]
mod process_queue_test;

mod rate_limiter;
pub use rate_limiter::RateLimiter;
