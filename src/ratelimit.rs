use std::collections::HashMap;
use std::sync::Mutex;

/// Time source for the limiter; injected so tests can drive the window
/// deterministically.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[derive(Debug)]
struct Window {
    count: u32,
    reset_at: i64,
}

/// Fixed-window request counter keyed by caller identity.
///
/// Volatile and process-local: each server instance enforces its own
/// windows, so the limit is best-effort when scaled horizontally. The
/// mutex makes every check a single atomic increment-and-compare, which
/// keeps counting correct under concurrent bursts within one instance.
pub struct FixedWindowLimiter {
    entries: Mutex<HashMap<String, Window>>,
    max_requests: u32,
    window_ms: i64,
    clock: Box<dyn Clock>,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window_ms: i64) -> Self {
        Self::with_clock(max_requests, window_ms, Box::new(SystemClock))
    }

    pub fn with_clock(max_requests: u32, window_ms: i64, clock: Box<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_requests,
            window_ms,
            clock,
        }
    }

    /// Returns true when `key` is rate limited.
    ///
    /// The first request for a key, or any request after its window has
    /// elapsed, reinitializes the counter and passes. Exactly
    /// `max_requests` calls pass within one window; expired entries count
    /// as absent whether or not `cleanup` has swept them yet.
    pub fn check(&self, key: &str) -> bool {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock().expect("limiter lock poisoned");

        match entries.get_mut(key) {
            Some(window) if window.reset_at >= now => {
                if window.count >= self.max_requests {
                    return true;
                }
                window.count += 1;
                false
            }
            _ => {
                entries.insert(
                    key.to_string(),
                    Window {
                        count: 1,
                        reset_at: now + self.window_ms,
                    },
                );
                false
            }
        }
    }

    /// Lazily sweeps expired windows. Called on demand rather than on a
    /// timer; skipping a sweep only costs memory, never correctness.
    pub fn cleanup(&self) {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock().expect("limiter lock poisoned");
        entries.retain(|_, window| window.reset_at >= now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct ManualClock(Arc<AtomicI64>);

    impl Clock for ManualClock {
        fn now_millis(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn manual_limiter(max: u32, window_ms: i64) -> (FixedWindowLimiter, Arc<AtomicI64>) {
        let time = Arc::new(AtomicI64::new(0));
        let limiter =
            FixedWindowLimiter::with_clock(max, window_ms, Box::new(ManualClock(time.clone())));
        (limiter, time)
    }

    #[test]
    fn test_exactly_max_requests_pass() {
        let (limiter, _) = manual_limiter(5, 60_000);
        for i in 0..5 {
            assert!(!limiter.check("k"), "call {} should pass", i + 1);
        }
        assert!(limiter.check("k"), "sixth call should be limited");
        assert!(limiter.check("k"), "limited state should persist");
    }

    #[test]
    fn test_window_elapse_resets_count() {
        let (limiter, time) = manual_limiter(2, 1_000);
        assert!(!limiter.check("k"));
        assert!(!limiter.check("k"));
        assert!(limiter.check("k"));

        time.store(1_001, Ordering::SeqCst);
        assert!(!limiter.check("k"), "fresh window should pass");
        assert!(!limiter.check("k"));
        assert!(limiter.check("k"));
    }

    #[test]
    fn test_keys_are_independent() {
        let (limiter, _) = manual_limiter(1, 60_000);
        assert!(!limiter.check("a"));
        assert!(limiter.check("a"));
        assert!(!limiter.check("b"));
    }

    #[test]
    fn test_expired_entry_passes_without_cleanup() {
        let (limiter, time) = manual_limiter(1, 1_000);
        assert!(!limiter.check("k"));
        assert!(limiter.check("k"));

        // no cleanup() call; check must treat the stale entry as absent
        time.store(5_000, Ordering::SeqCst);
        assert!(!limiter.check("k"));
    }

    #[test]
    fn test_cleanup_sweeps_only_expired() {
        let (limiter, time) = manual_limiter(5, 1_000);
        limiter.check("old");
        time.store(500, Ordering::SeqCst);
        limiter.check("fresh");

        time.store(1_200, Ordering::SeqCst);
        limiter.cleanup();

        let entries = limiter.entries.lock().unwrap();
        assert!(!entries.contains_key("old"));
        assert!(entries.contains_key("fresh"));
    }
}
