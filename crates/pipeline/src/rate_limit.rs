//! Outbound call budget for the weather provider.
//!
//! Fixed window pegged to the first call after the previous window
//! expired: up to `max_calls` approvals, then denials until the window
//! runs out. Shared by every concurrent run.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use common::config::RateLimitConfig;

#[derive(Debug)]
struct Window {
    opened_at: Instant,
    count: u32,
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_calls: u32,
    window: Duration,
    state: Arc<Mutex<Option<Window>>>,
}

impl RateLimiter {
    pub fn new(max_calls: u32, window: Duration) -> Self {
        Self {
            max_calls,
            window,
            state: Arc::new(Mutex::new(None)),
        }
    }

    pub fn from_config(cfg: &RateLimitConfig) -> Self {
        Self::new(cfg.max_calls, Duration::from_secs(cfg.window_secs))
    }

    /// Take one slot without waiting. Returns true if acquired.
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut state = self.state.lock();

        match state.as_mut() {
            Some(w) if now < w.opened_at + self.window => {
                if w.count >= self.max_calls {
                    return false;
                }
                w.count += 1;
                true
            }
            _ => {
                if self.max_calls == 0 {
                    return false;
                }
                *state = Some(Window {
                    opened_at: now,
                    count: 1,
                });
                true
            }
        }
    }

    /// Time until the current window expires; zero if none is open.
    pub fn retry_after(&self) -> Duration {
        let now = Instant::now();
        match self.state.lock().as_ref() {
            Some(w) => (w.opened_at + self.window).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}
