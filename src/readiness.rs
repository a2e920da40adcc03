//! Deferred delivery of a payload to a component that may not exist yet.
//!
//! The map layer only exists while its surface is shown, but fetch results can
//! arrive at any time. A payload is offered immediately and then re-offered on
//! a fixed interval until it is accepted or the retries run out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            interval: Duration::from_millis(500),
        }
    }
}

/// Shared with timer threads; once set, their wakeups are dropped.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RetryToken(u64);

#[derive(Debug, Clone)]
pub enum RetryStep {
    Delivered,
    /// Call [`ReadinessCoordinator::retry`] with `token` after `after`, unless
    /// `cancel` is set by then.
    Scheduled {
        token: RetryToken,
        after: Duration,
        cancel: CancelFlag,
    },
    Exhausted,
    /// The token no longer refers to the pending payload.
    Stale,
}

#[derive(Debug)]
struct Pending<T> {
    payload: T,
    token: RetryToken,
    attempts: u32,
    cancel: CancelFlag,
}

#[derive(Debug)]
pub struct ReadinessCoordinator<T> {
    policy: RetryPolicy,
    pending: Option<Pending<T>>,
    next_token: u64,
}

impl<T> Default for ReadinessCoordinator<T> {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl<T> ReadinessCoordinator<T> {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            pending: None,
            next_token: 0,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Offer `payload` now. `deliver` returns false while its target is missing.
    /// Supersedes anything still waiting.
    pub fn submit(&mut self, payload: T, mut deliver: impl FnMut(&T) -> bool) -> RetryStep {
        self.cancel();
        if deliver(&payload) {
            return RetryStep::Delivered;
        }
        self.next_token += 1;
        let token = RetryToken(self.next_token);
        let cancel = CancelFlag::default();
        self.pending = Some(Pending {
            payload,
            token,
            attempts: 0,
            cancel: cancel.clone(),
        });
        RetryStep::Scheduled {
            token,
            after: self.policy.interval,
            cancel,
        }
    }

    /// Re-offer the payload waiting under `token`.
    pub fn retry(&mut self, token: RetryToken, mut deliver: impl FnMut(&T) -> bool) -> RetryStep {
        let Some(pending) = self.pending.as_mut().filter(|p| p.token == token) else {
            return RetryStep::Stale;
        };
        if pending.cancel.is_cancelled() {
            self.pending = None;
            return RetryStep::Stale;
        }
        pending.attempts += 1;
        if deliver(&pending.payload) {
            self.pending = None;
            return RetryStep::Delivered;
        }
        if pending.attempts >= self.policy.max_retries {
            tracing::warn!(
                "target still unavailable after {} retries; giving up",
                pending.attempts
            );
            self.pending = None;
            return RetryStep::Exhausted;
        }
        RetryStep::Scheduled {
            token,
            after: self.policy.interval,
            cancel: pending.cancel.clone(),
        }
    }

    /// Drop the waiting payload and silence its timers.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_of(step: &RetryStep) -> RetryToken {
        match step {
            RetryStep::Scheduled { token, .. } => *token,
            other => panic!("expected a scheduled retry, got {other:?}"),
        }
    }

    #[test]
    fn ready_target_delivers_immediately() {
        let mut c = ReadinessCoordinator::default();
        let mut got = Vec::new();
        let step = c.submit(5, |v| {
            got.push(*v);
            true
        });
        assert!(matches!(step, RetryStep::Delivered));
        assert_eq!(got, vec![5]);
        assert!(!c.is_pending());
    }

    #[test]
    fn retries_until_target_appears() {
        let mut c = ReadinessCoordinator::default();
        let step = c.submit("payload", |_| false);
        let RetryStep::Scheduled { after, .. } = &step else {
            panic!("expected a scheduled retry");
        };
        assert_eq!(*after, Duration::from_millis(500));
        let token = token_of(&step);
        token_of(&c.retry(token, |_| false));
        assert!(matches!(c.retry(token, |p| *p == "payload"), RetryStep::Delivered));
        assert!(!c.is_pending());
    }

    #[test]
    fn gives_up_after_ten_retries() {
        let mut c: ReadinessCoordinator<u8> = ReadinessCoordinator::default();
        let token = token_of(&c.submit(1, |_| false));
        let mut offers = 0;
        let mut last = RetryStep::Stale;
        for _ in 0..10 {
            last = c.retry(token, |_| {
                offers += 1;
                false
            });
        }
        assert_eq!(offers, 10);
        assert!(matches!(last, RetryStep::Exhausted));
        assert!(matches!(c.retry(token, |_| true), RetryStep::Stale));
    }

    #[test]
    fn newer_submit_supersedes_pending() {
        let mut c = ReadinessCoordinator::default();
        let first = c.submit(1, |_| false);
        let RetryStep::Scheduled { cancel: old_cancel, .. } = &first else {
            panic!("expected a scheduled retry");
        };
        let second = token_of(&c.submit(2, |_| false));
        assert!(old_cancel.is_cancelled());
        assert!(matches!(c.retry(token_of(&first), |_| true), RetryStep::Stale));
        let mut seen = None;
        c.retry(second, |v| {
            seen = Some(*v);
            true
        });
        assert_eq!(seen, Some(2));
    }

    #[test]
    fn cancel_silences_timers() {
        let mut c = ReadinessCoordinator::default();
        let step = c.submit(1, |_| false);
        let RetryStep::Scheduled { token, cancel, .. } = step else {
            panic!("expected a scheduled retry");
        };
        c.cancel();
        assert!(cancel.is_cancelled());
        assert!(!c.is_pending());
        assert!(matches!(c.retry(token, |_| true), RetryStep::Stale));
    }
}
