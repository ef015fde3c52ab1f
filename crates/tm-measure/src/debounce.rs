//! Quiet-period scheduler for re-measurement requests.
//!
//! While guide lines are dragged the caller submits a request per move; only
//! the last one is released, once no new request arrived for the quiet
//! period. Time is passed in by the caller.

use std::time::{Duration, Instant};

/// Default quiet period (300ms)
pub const DEFAULT_QUIET_MS: u64 = 300;

#[derive(Debug)]
struct Pending<T> {
    request: T,
    last_seen: Instant,
}

#[derive(Debug)]
pub struct Debouncer<T> {
    quiet: Duration,
    pending: Option<Pending<T>>,
    superseded: u64,
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_QUIET_MS))
    }
}

impl<T> Debouncer<T> {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
            superseded: 0,
        }
    }

    /// Replaces any pending request and restarts the quiet period.
    pub fn submit(&mut self, request: T, now: Instant) {
        if self.pending.is_some() {
            self.superseded += 1;
        }
        self.pending = Some(Pending {
            request,
            last_seen: now,
        });
    }

    /// Releases the pending request once the quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let ready = self
            .pending
            .as_ref()
            .is_some_and(|p| now.saturating_duration_since(p.last_seen) >= self.quiet);
        if ready {
            self.pending.take().map(|p| p.request)
        } else {
            None
        }
    }

    /// Time left until [`Self::poll`] would release, if anything is pending.
    pub fn time_until_ready(&self, now: Instant) -> Option<Duration> {
        self.pending
            .as_ref()
            .map(|p| self.quiet.saturating_sub(now.saturating_duration_since(p.last_seen)))
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.request)
    }

    /// Requests dropped because a newer one replaced them.
    pub fn superseded(&self) -> u64 {
        self.superseded
    }
}
