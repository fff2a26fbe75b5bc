//! Client-side request pacing for rate-limited APIs.
//!
//! [`RequestPacer`] keeps a sliding log of recent request instants and makes
//! callers wait until both the per-second and per-minute budgets have room.
//! [`jittered_delay`] spaces out scraper requests with random jitter.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

const SECOND: Duration = Duration::from_secs(1);
const MINUTE: Duration = Duration::from_secs(60);

/// Hunter's documented limits.
pub const DEFAULT_PER_SECOND: usize = 15;
pub const DEFAULT_PER_MINUTE: usize = 500;

/// Sliding-window limiter shared by every caller of one API client.
#[derive(Debug)]
pub struct RequestPacer {
    per_second: usize,
    per_minute: usize,
    sent: Mutex<VecDeque<Instant>>,
}

impl Default for RequestPacer {
    fn default() -> Self {
        Self::new(DEFAULT_PER_SECOND, DEFAULT_PER_MINUTE)
    }
}

impl RequestPacer {
    /// Limits of zero are raised to one.
    #[must_use]
    pub fn new(per_second: usize, per_minute: usize) -> Self {
        Self {
            per_second: per_second.max(1),
            per_minute: per_minute.max(1),
            sent: Mutex::new(VecDeque::new()),
        }
    }

    /// Waits until a request may be sent, then records it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                // A poisoned log only means another caller panicked mid-push;
                // the timestamps are still usable.
                let mut sent = self
                    .sent
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                let now = Instant::now();
                match next_wait(&mut sent, now, self.per_second, self.per_minute) {
                    None => {
                        sent.push_back(now);
                        return;
                    }
                    Some(wait) => wait,
                }
            };
            tracing::debug!(wait_ms = wait.as_millis(), "request budget exhausted, pacing");
            tokio::time::sleep(wait).await;
        }
    }
}

/// Prunes entries older than a minute and returns how long to wait before
/// another request fits both windows, or `None` if one fits now.
fn next_wait(
    sent: &mut VecDeque<Instant>,
    now: Instant,
    per_second: usize,
    per_minute: usize,
) -> Option<Duration> {
    while sent
        .front()
        .is_some_and(|&t| now.saturating_duration_since(t) >= MINUTE)
    {
        sent.pop_front();
    }

    if sent.len() >= per_minute {
        let oldest = sent[sent.len() - per_minute];
        return Some(MINUTE.saturating_sub(now.saturating_duration_since(oldest)));
    }

    let in_last_second = sent
        .iter()
        .rev()
        .take_while(|&&t| now.saturating_duration_since(t) < SECOND)
        .count();
    if in_last_second >= per_second {
        let boundary = sent[sent.len() - per_second];
        return Some(SECOND.saturating_sub(now.saturating_duration_since(boundary)));
    }

    None
}

/// Sleeps between `base` and three times `base`, chosen at random.
///
/// A zero `base` returns immediately.
pub async fn jittered_delay(base: Duration) {
    if base.is_zero() {
        return;
    }
    let factor = 1.0 + rand::random::<f64>() * 2.0;
    tokio::time::sleep(base.mul_f64(factor)).await;
}
