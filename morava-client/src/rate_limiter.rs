use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Messages/sec cap applied when a topic's messages are taken out of a
/// process queue.
///
/// Takes run while the message store lock is held, so acquisition is a
/// non-blocking permit check: no permit means no take, and the dispatcher
/// comes back on its next round.
#[derive(Debug)]
pub struct RateLimiter {
    permits_per_sec: u32,
    bucket: Mutex<Bucket>,
}

#[derive(Debug)]
struct Bucket {
    available: f64,
    refreshed_at: Instant,
}

impl RateLimiter {
    pub fn new(permits_per_sec: u32) -> Self {
        RateLimiter {
            permits_per_sec,
            bucket: Mutex::new(Bucket {
                available: permits_per_sec as f64,
                refreshed_at: Instant::now(),
            }),
        }
    }

    /// Claim one permit without blocking. Returns false when the budget for
    /// the current second is spent.
    pub fn try_acquire(&self) -> bool {
        let mut bucket = match self.bucket.lock() {
            Ok(bucket) => bucket,
            Err(poisoned) => poisoned.into_inner(),
        };
        bucket.refresh(self.permits_per_sec);
        if bucket.available < 1.0 {
            return false;
        }
        bucket.available -= 1.0;
        true
    }
}

impl Bucket {
    // Permits are credited at most once per second and an idle stretch never
    // banks more than one second's worth.
    fn refresh(&mut self, permits_per_sec: u32) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.refreshed_at);
        if elapsed < Duration::from_secs(1) {
            return;
        }
        let cap = permits_per_sec as f64;
        self.available = (self.available + cap * elapsed.as_secs_f64()).min(cap);
        self.refreshed_at = now;
    }
}
