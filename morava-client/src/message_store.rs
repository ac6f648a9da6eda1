use crate::rate_limiter::RateLimiter;

use morava_core::message::MessageExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

/// Delivery slot for FIFO consumption. At most one message of a partition may
/// be in flight while the slot is `Busy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FifoSlot {
    Idle,
    Busy,
}

#[derive(Debug)]
struct StoreInner {
    // received but not yet handed to the user, in broker delivery order
    pending: VecDeque<MessageExt>,
    // handed out but not yet erased
    inflight: Vec<MessageExt>,
    fifo_slot: FifoSlot,
}

/// In-memory buffer of one process queue: the pending and in-flight sequences
/// plus the byte accounting across both.
///
/// Both sequences and the FIFO slot live under a single mutex, held only for
/// O(batch) in-memory work. `cached_bytes` always equals the sum of body
/// lengths over pending and in-flight messages.
#[derive(Debug)]
pub(crate) struct MessageStore {
    inner: Mutex<StoreInner>,
    cached_bytes: AtomicUsize,
}

impl MessageStore {
    pub(crate) fn new() -> Self {
        MessageStore {
            inner: Mutex::new(StoreInner {
                pending: VecDeque::new(),
                inflight: Vec::new(),
                fifo_slot: FifoSlot::Idle,
            }),
            cached_bytes: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Append received messages to the pending sequence.
    pub(crate) fn cache(&self, messages: Vec<MessageExt>) {
        if messages.is_empty() {
            return;
        }
        let mut inner = self.lock();
        for message in messages {
            self.cached_bytes.fetch_add(message.size(), Ordering::SeqCst);
            inner.pending.push_back(message);
        }
    }

    /// Atomically move up to `max_count` head messages from pending to
    /// in-flight. With a rate limiter, takes proceed one permit at a time.
    pub(crate) fn try_take(
        &self,
        max_count: usize,
        rate_limiter: Option<&RateLimiter>,
    ) -> Vec<MessageExt> {
        let mut inner = self.lock();
        let mut taken = Vec::new();
        match rate_limiter {
            // no rate limiter for current topic
            None => {
                let actual = inner.pending.len().min(max_count);
                for _ in 0..actual {
                    let message = match inner.pending.pop_front() {
                        Some(message) => message,
                        None => break,
                    };
                    taken.push(message.clone());
                    inner.inflight.push(message);
                }
            }
            // has rate limiter for current topic
            Some(limiter) => {
                while taken.len() < max_count
                    && !inner.pending.is_empty()
                    && limiter.try_acquire()
                {
                    let message = match inner.pending.pop_front() {
                        Some(message) => message,
                        None => break,
                    };
                    taken.push(message.clone());
                    inner.inflight.push(message);
                }
            }
        }
        taken
    }

    /// Claim the head message for FIFO delivery, occupying the FIFO slot.
    /// Returns `None` when nothing is pending, the slot is already busy, or the
    /// rate limiter denies a permit (the slot is left idle in that case).
    pub(crate) fn try_take_fifo(&self, rate_limiter: Option<&RateLimiter>) -> Option<MessageExt> {
        let mut inner = self.lock();
        // no new message arrived
        if inner.pending.is_empty() {
            return None;
        }
        if inner.fifo_slot == FifoSlot::Busy {
            debug!("Fifo consumption is not finished, slot stays busy");
            return None;
        }
        if let Some(limiter) = rate_limiter {
            if !limiter.try_acquire() {
                return None;
            }
        }
        inner.fifo_slot = FifoSlot::Busy;
        let message = inner.pending.pop_front()?;
        inner.inflight.push(message.clone());
        Some(message)
    }

    /// Release the FIFO slot so the next head message can be claimed.
    pub(crate) fn release_fifo_slot(&self) {
        let mut inner = self.lock();
        inner.fifo_slot = FifoSlot::Idle;
    }

    /// Remove messages from the in-flight sequence and reclaim their bytes.
    /// Messages no longer present are skipped. Returns the queue offsets that
    /// were actually removed.
    pub(crate) fn erase(&self, messages: &[MessageExt]) -> Vec<i64> {
        let mut inner = self.lock();
        let mut removed = Vec::new();
        for message in messages {
            if let Some(position) = inner
                .inflight
                .iter()
                .position(|m| m.message_id == message.message_id)
            {
                let message = inner.inflight.remove(position);
                self.cached_bytes.fetch_sub(message.size(), Ordering::SeqCst);
                removed.push(message.queue_offset);
            }
        }
        removed
    }

    pub(crate) fn cached_messages_quantity(&self) -> usize {
        let inner = self.lock();
        inner.pending.len() + inner.inflight.len()
    }

    pub(crate) fn inflight_messages_quantity(&self) -> usize {
        self.lock().inflight.len()
    }

    pub(crate) fn cached_message_bytes(&self) -> usize {
        self.cached_bytes.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub(crate) fn fifo_slot_busy(&self) -> bool {
        self.lock().fifo_slot == FifoSlot::Busy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use morava_core::message::Endpoints;
    use std::collections::HashMap;

    fn test_message(id: &str, offset: i64, body_len: usize) -> MessageExt {
        MessageExt {
            message_id: id.to_string(),
            topic: "test-topic".to_string(),
            body: vec![0u8; body_len],
            queue_offset: offset,
            receipt_handle: format!("handle-{}", id),
            delivery_attempt: 1,
            ack_endpoints: Endpoints::new("localhost", 8081),
            user_attributes: HashMap::new(),
        }
    }

    #[test]
    fn cache_and_erase_keep_byte_accounting() {
        let store = MessageStore::new();
        store.cache(vec![test_message("a", 0, 10), test_message("b", 1, 20)]);
        assert_eq!(store.cached_messages_quantity(), 2);
        assert_eq!(store.cached_message_bytes(), 30);

        let taken = store.try_take(10, None);
        assert_eq!(taken.len(), 2);
        assert_eq!(store.inflight_messages_quantity(), 2);
        // bytes cover pending and in-flight alike
        assert_eq!(store.cached_message_bytes(), 30);

        store.erase(&taken);
        assert_eq!(store.cached_messages_quantity(), 0);
        assert_eq!(store.cached_message_bytes(), 0);
    }

    #[test]
    fn cache_empty_is_a_noop() {
        let store = MessageStore::new();
        store.cache(Vec::new());
        store.erase(&[]);
        assert_eq!(store.cached_messages_quantity(), 0);
        assert_eq!(store.cached_message_bytes(), 0);
    }

    #[test]
    fn take_zero_does_not_advance_state() {
        let store = MessageStore::new();
        store.cache(vec![test_message("a", 0, 10)]);
        assert!(store.try_take(0, None).is_empty());
        assert_eq!(store.cached_messages_quantity(), 1);
        assert_eq!(store.inflight_messages_quantity(), 0);
    }

    #[test]
    fn take_preserves_broker_delivery_order() {
        let store = MessageStore::new();
        store.cache(vec![
            test_message("a", 0, 1),
            test_message("b", 1, 1),
            test_message("c", 2, 1),
        ]);
        let taken = store.try_take(2, None);
        let ids: Vec<_> = taken.iter().map(|m| m.message_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn erase_twice_decrements_bytes_once() {
        let store = MessageStore::new();
        store.cache(vec![test_message("a", 0, 10)]);
        let taken = store.try_take(1, None);
        store.erase(&taken);
        store.erase(&taken);
        assert_eq!(store.cached_message_bytes(), 0);
        assert_eq!(store.cached_messages_quantity(), 0);
    }

    #[test]
    fn exhausted_rate_limiter_denies_takes() {
        let store = MessageStore::new();
        store.cache(vec![test_message("a", 0, 1), test_message("b", 1, 1)]);

        let limiter = RateLimiter::new(1);
        assert!(limiter.try_acquire());
        assert!(store.try_take(2, Some(&limiter)).is_empty());
        assert_eq!(store.cached_messages_quantity(), 2);
    }

    #[test]
    fn rate_limiter_bounds_batch_takes() {
        let store = MessageStore::new();
        store.cache(vec![
            test_message("a", 0, 1),
            test_message("b", 1, 1),
            test_message("c", 2, 1),
        ]);

        let limiter = RateLimiter::new(2);
        let taken = store.try_take(3, Some(&limiter));
        assert_eq!(taken.len(), 2);
        assert_eq!(store.inflight_messages_quantity(), 2);
    }

    #[test]
    fn fifo_take_occupies_the_slot_until_released() {
        let store = MessageStore::new();
        store.cache(vec![test_message("a", 0, 1), test_message("b", 1, 1)]);

        let first = store.try_take_fifo(None).expect("head message");
        assert_eq!(first.message_id, "a");
        assert!(store.fifo_slot_busy());
        // second take denied while the slot is busy
        assert!(store.try_take_fifo(None).is_none());

        store.erase(&[first]);
        store.release_fifo_slot();
        let second = store.try_take_fifo(None).expect("next head message");
        assert_eq!(second.message_id, "b");
    }

    #[test]
    fn fifo_take_without_permit_leaves_slot_idle() {
        let store = MessageStore::new();
        store.cache(vec![test_message("a", 0, 1)]);

        let limiter = RateLimiter::new(1);
        assert!(limiter.try_acquire());
        assert!(store.try_take_fifo(Some(&limiter)).is_none());
        assert!(!store.fifo_slot_busy());
        assert_eq!(store.cached_messages_quantity(), 1);

        // permit available again, the same head is claimed in order
        let limiter = RateLimiter::new(1);
        let message = store.try_take_fifo(Some(&limiter)).expect("head message");
        assert_eq!(message.message_id, "a");
        assert!(store.fifo_slot_busy());
    }

    #[test]
    fn fifo_take_on_empty_pending_returns_none() {
        let store = MessageStore::new();
        assert!(store.try_take_fifo(None).is_none());
        assert!(!store.fifo_slot_busy());
    }
}
