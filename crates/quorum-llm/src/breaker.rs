//! Circuit breaker guarding a single provider.
//!
//! The breaker opens after a run of consecutive failures and stops sending
//! requests until a cooldown elapses. The first request after cooldown is a
//! probe: success closes the breaker, failure re-opens it.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Breaker state reported by [`CircuitBreaker::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Requests flow normally.
    Closed,
    /// Requests are rejected until the cooldown elapses.
    Open,
    /// Cooldown elapsed; one probe request is allowed through.
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probing: bool,
}

/// Circuit breaker with consecutive-failure threshold and cooldown.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a breaker that opens after `failure_threshold` consecutive
    /// failures and stays open for `cooldown`.
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            cooldown,
            inner: Mutex::new(BreakerInner {
                consecutive_failures: 0,
                opened_at: None,
                probing: false,
            }),
        }
    }

    /// Current breaker state.
    pub fn state(&self) -> BreakerState {
        let inner = self.inner.lock();
        match inner.opened_at {
            None => BreakerState::Closed,
            Some(opened_at) if opened_at.elapsed() >= self.cooldown => BreakerState::HalfOpen,
            Some(_) => BreakerState::Open,
        }
    }

    /// Whether a request may be sent right now.
    ///
    /// In the half-open state only the first caller gets through; subsequent
    /// callers are rejected until the probe outcome is recorded.
    pub fn allow(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.opened_at {
            None => true,
            Some(opened_at) if opened_at.elapsed() >= self.cooldown => {
                if inner.probing {
                    false
                } else {
                    inner.probing = true;
                    true
                }
            }
            Some(_) => false,
        }
    }

    /// Record a successful call, closing the breaker.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.probing = false;
    }

    /// Record a failed call, opening the breaker once the threshold is hit.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        if inner.opened_at.is_some() {
            // Failed probe: restart the cooldown.
            inner.opened_at = Some(Instant::now());
            inner.probing = false;
            return;
        }
        inner.consecutive_failures += 1;
        if inner.consecutive_failures >= self.failure_threshold {
            tracing::warn!(
                failures = inner.consecutive_failures,
                cooldown_ms = self.cooldown.as_millis() as u64,
                "Circuit breaker opened"
            );
            inner.opened_at = Some(Instant::now());
            inner.probing = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_closed() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(30));
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert!(breaker.allow());
    }

    #[test]
    fn test_opens_after_threshold() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(30));
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);

        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(!breaker.allow());
    }

    #[test]
    fn test_success_resets_failure_count() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(30));
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn test_half_open_allows_single_probe() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(0));
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::HalfOpen);

        // First caller gets the probe, second does not.
        assert!(breaker.allow());
        assert!(!breaker.allow());
    }

    #[test]
    fn test_probe_success_closes() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(0));
        breaker.record_failure();
        assert!(breaker.allow());
        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert!(breaker.allow());
    }

    #[test]
    fn test_probe_failure_reopens() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(0));
        breaker.record_failure();
        assert!(breaker.allow());
        breaker.record_failure();
        // Cooldown restarted; zero cooldown means immediately half-open again.
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        assert!(breaker.allow());
    }
}
