use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

use crate::proto;
use thiserror::Error;

/// A single broker address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub host: String,
    pub port: u16,
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Resolved broker endpoints. A partition resolves to one or more addresses;
/// acknowledgements are sent back to the endpoints the message was received from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoints {
    pub addresses: Vec<Address>,
}

impl Endpoints {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Endpoints {
            addresses: vec![Address {
                host: host.into(),
                port,
            }],
        }
    }

    /// gRPC target URIs, in preference order.
    pub fn grpc_targets(&self) -> impl Iterator<Item = String> + '_ {
        self.addresses
            .iter()
            .map(|addr| format!("http://{}:{}", addr.host, addr.port))
    }
}

impl Display for Endpoints {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for addr in &self.addresses {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{}", addr)?;
            first = false;
        }
        Ok(())
    }
}

/// Identity of one partition of a topic, owned by a specific broker.
/// Immutable for the lifetime of a process queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageQueue {
    pub topic: String,
    pub broker_name: String,
    pub queue_id: i32,
    // resolved endpoints of the owning broker, used as the fetch target
    pub broker_endpoints: Endpoints,
}

impl Display for MessageQueue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.topic, self.broker_name, self.queue_id)
    }
}

/// A received message as seen by the consumption engine.
///
/// The body is opaque to the engine; everything else is bookkeeping the broker
/// needs back on ack/nack/forward. `ack_endpoints` is stamped on receive so
/// acknowledgements target the broker the message actually came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageExt {
    pub message_id: String,
    pub topic: String,
    pub body: Vec<u8>,
    // offset of the message within its partition, monotonic
    pub queue_offset: i64,
    // broker-issued token identifying this delivered copy
    pub receipt_handle: String,
    pub delivery_attempt: i32,
    pub ack_endpoints: Endpoints,
    pub user_attributes: HashMap<String, String>,
}

impl MessageExt {
    pub fn size(&self) -> usize {
        self.body.len()
    }

    /// Wrap a wire message, stamping the endpoints acknowledgements must go to.
    pub fn wrap(message: proto::Message, ack_endpoints: Endpoints) -> Result<Self, MessageError> {
        let topic = message
            .topic
            .map(|resource| resource.name)
            .unwrap_or_default();
        let attribute = message
            .system_attribute
            .ok_or(MessageError::MissingSystemAttribute)?;
        if attribute.message_id.is_empty() {
            return Err(MessageError::MissingMessageId);
        }
        if attribute.receipt_handle.is_empty() {
            return Err(MessageError::MissingReceiptHandle(attribute.message_id));
        }
        Ok(MessageExt {
            message_id: attribute.message_id,
            topic,
            body: message.body,
            queue_offset: attribute.partition_offset,
            receipt_handle: attribute.receipt_handle,
            delivery_attempt: attribute.delivery_attempt.max(1),
            ack_endpoints,
            user_attributes: message.user_attribute,
        })
    }
}

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("message carries no system attribute")]
    MissingSystemAttribute,

    #[error("message carries no message id")]
    MissingMessageId,

    #[error("message {0} carries no receipt handle")]
    MissingReceiptHandle(String),
}
