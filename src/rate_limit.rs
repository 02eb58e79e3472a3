use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use crate::metrics::TRACKED_CALLERS;

// Sweep the whole store once this many callers are tracked
pub const GC_THRESHOLD: usize = 1000;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_millis(60_000),
        }
    }
}

// Outcome of one admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_after: Duration, // until the oldest tracked request leaves the window
    pub retry_after_secs: u64, // 0 when allowed
}

// Rate limit entry - request timestamps per IP/key, oldest first
#[derive(Debug, Default)]
pub struct RateWindow {
    hits: VecDeque<Instant>,
}

impl RateWindow {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&t) = self.hits.front() {
            if now.saturating_duration_since(t) >= window {
                self.hits.pop_front();
            } else {
                break;
            }
        }
    }
}

// Sliding-log admission controller, one window per caller
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: DashMap<String, RateWindow>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, identifier: &str, config: &RateLimitConfig) -> RateDecision {
        self.check_at(identifier, config, Instant::now())
    }

    pub fn check_at(&self, identifier: &str, config: &RateLimitConfig, now: Instant) -> RateDecision {
        let decision = {
            let mut entry = self.windows.entry(identifier.to_string()).or_default();
            entry.prune(now, config.window);

            let count = entry.hits.len() as u32;
            if count < config.max_requests {
                entry.hits.push_back(now);
                let oldest = entry.hits.front().copied().unwrap_or(now);
                RateDecision {
                    allowed: true,
                    limit: config.max_requests,
                    remaining: config.max_requests - count - 1,
                    reset_after: (oldest + config.window).saturating_duration_since(now),
                    retry_after_secs: 0,
                }
            } else {
                let oldest = entry.hits.front().copied().unwrap_or(now);
                let wait = (oldest + config.window).saturating_duration_since(now);
                RateDecision {
                    allowed: false,
                    limit: config.max_requests,
                    remaining: 0,
                    reset_after: wait,
                    retry_after_secs: ceil_secs(wait).max(1),
                }
            }
        };
        // entry guard is gone, safe to walk every shard
        if self.windows.len() > GC_THRESHOLD {
            self.sweep_at(now, config.window);
        }
        TRACKED_CALLERS.set(self.windows.len() as f64);
        decision
    }

    // Drop callers whose whole window has expired
    pub fn sweep_at(&self, now: Instant, window: Duration) {
        let before = self.windows.len();
        self.windows.retain(|_, w| {
            w.prune(now, window);
            !w.hits.is_empty()
        });
        tracing::debug!(
            before,
            remaining = self.windows.len(),
            "rate limiter sweep complete"
        );
    }

    pub fn tracked(&self) -> usize {
        self.windows.len()
    }
}

fn ceil_secs(d: Duration) -> u64 {
    let ms = d.as_millis() as u64;
    ms.div_ceil(1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn denies_after_quota_within_window() {
        let limiter = RateLimiter::new();
        let config = RateLimitConfig::default();
        let t0 = Instant::now();

        for i in 0..10 {
            let d = limiter.check_at("ip", &config, t0 + ms(i));
            assert!(d.allowed, "request {} should be allowed", i);
            assert_eq!(d.remaining, 9 - i as u32);
        }
        let denied = limiter.check_at("ip", &config, t0 + ms(20));
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert!(denied.retry_after_secs > 0);
    }

    #[test]
    fn two_per_second_scenario() {
        let limiter = RateLimiter::new();
        let config = RateLimitConfig {
            max_requests: 2,
            window: ms(1000),
        };
        let t0 = Instant::now();

        let a = limiter.check_at("ip1", &config, t0);
        assert!(a.allowed);
        assert_eq!(a.remaining, 1);

        let b = limiter.check_at("ip1", &config, t0 + ms(100));
        assert!(b.allowed);
        assert_eq!(b.remaining, 0);

        let c = limiter.check_at("ip1", &config, t0 + ms(200));
        assert!(!c.allowed);
        assert_eq!(c.retry_after_secs, 1);
        assert_eq!(c.reset_after, ms(800));

        // both earlier hits are a full window old by now
        let d = limiter.check_at("ip1", &config, t0 + ms(1100));
        assert!(d.allowed);
        assert_eq!(d.remaining, 1);
    }

    #[test]
    fn quota_fully_resets_after_window() {
        let limiter = RateLimiter::new();
        let config = RateLimitConfig {
            max_requests: 2,
            window: ms(1000),
        };
        let t0 = Instant::now();
        limiter.check_at("ip1", &config, t0);
        limiter.check_at("ip1", &config, t0 + ms(100));
        assert!(!limiter.check_at("ip1", &config, t0 + ms(200)).allowed);

        let later = t0 + ms(1200);
        let first = limiter.check_at("ip1", &config, later);
        assert!(first.allowed);
        assert_eq!(first.remaining, 1);
        assert!(limiter.check_at("ip1", &config, later + ms(1)).allowed);
        assert!(!limiter.check_at("ip1", &config, later + ms(2)).allowed);
    }

    #[test]
    fn denied_requests_are_not_recorded() {
        let limiter = RateLimiter::new();
        let config = RateLimitConfig {
            max_requests: 1,
            window: ms(1000),
        };
        let t0 = Instant::now();
        assert!(limiter.check_at("ip", &config, t0).allowed);
        for i in 1..5 {
            assert!(!limiter.check_at("ip", &config, t0 + ms(i * 100)).allowed);
        }
        // only the first hit is tracked, so the window frees up at t0+1000
        assert!(limiter.check_at("ip", &config, t0 + ms(1000)).allowed);
    }

    #[test]
    fn callers_are_independent() {
        let limiter = RateLimiter::new();
        let config = RateLimitConfig {
            max_requests: 1,
            window: ms(1000),
        };
        let t0 = Instant::now();
        assert!(limiter.check_at("a", &config, t0).allowed);
        assert!(!limiter.check_at("a", &config, t0).allowed);
        assert!(limiter.check_at("b", &config, t0).allowed);
    }

    #[test]
    fn sweep_drops_expired_callers_past_threshold() {
        let limiter = RateLimiter::new();
        let config = RateLimitConfig {
            max_requests: 5,
            window: ms(1000),
        };
        let t0 = Instant::now();
        for i in 0..GC_THRESHOLD {
            limiter.check_at(&format!("old-{i}"), &config, t0);
        }
        assert_eq!(limiter.tracked(), GC_THRESHOLD);

        // pushes the store past the threshold after every old window expired
        limiter.check_at("fresh", &config, t0 + ms(2000));
        assert_eq!(limiter.tracked(), 1);
    }
}
