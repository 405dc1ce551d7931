use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Fixed-window request counter keyed by caller.
#[derive(Clone)]
pub struct Throttle {
    max_requests: Option<u32>,
    window: Duration,
    hits: Arc<DashMap<String, Window>>,
}

struct Window {
    started: Instant,
    count: u32,
}

impl Throttle {
    /// `None` turns throttling off.
    pub fn new(max_requests: Option<u32>, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: Arc::new(DashMap::new()),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None, Duration::ZERO)
    }

    /// Counts one request for `key`. On refusal returns how long until the
    /// window resets.
    pub fn check(&self, key: &str) -> Result<(), Duration> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), Duration> {
        let Some(max_requests) = self.max_requests else {
            return Ok(());
        };

        let mut window = self
            .hits
            .entry(key.to_string())
            .or_insert(Window { started: now, count: 0 });

        let elapsed = now.saturating_duration_since(window.started);
        if elapsed >= self.window {
            window.started = now;
            window.count = 0;
        }

        if window.count >= max_requests {
            return Err(self.window.saturating_sub(elapsed));
        }

        window.count += 1;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_never_refuses() {
        let throttle = Throttle::disabled();
        for _ in 0..1000 {
            assert!(throttle.check("alice").is_ok());
        }
    }

    #[test]
    fn test_refuses_after_limit_until_window_resets() {
        let throttle = Throttle::new(Some(2), Duration::from_secs(60));
        let start = Instant::now();

        assert!(throttle.check_at("alice", start).is_ok());
        assert!(throttle.check_at("alice", start).is_ok());
        assert_eq!(
            throttle.check_at("alice", start + Duration::from_secs(15)),
            Err(Duration::from_secs(45))
        );

        // other callers have their own window
        assert!(throttle.check_at("bob", start).is_ok());

        assert!(throttle.check_at("alice", start + Duration::from_secs(60)).is_ok());
    }
}
