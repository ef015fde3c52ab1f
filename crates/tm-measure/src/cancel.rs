//! Cooperative cancellation and the per-image time budget.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{MeasureError, Result};

/// Cloneable flag shared between the caller and a running measurement.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Cancellation token plus wall-clock budget, checked between scan lines.
#[derive(Debug, Clone)]
pub struct Deadline {
    token: CancelToken,
    started: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn new(token: CancelToken, budget_ms: u64) -> Self {
        Self {
            token,
            started: Instant::now(),
            budget: Duration::from_millis(budget_ms),
        }
    }

    /// Budget without a cancellation source.
    pub fn with_budget(budget_ms: u64) -> Self {
        Self::new(CancelToken::new(), budget_ms)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// `Cancelled` takes precedence over `TimedOut`.
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(MeasureError::Cancelled);
        }
        if self.started.elapsed() > self.budget {
            return Err(MeasureError::TimedOut {
                budget_ms: self.budget.as_millis() as u64,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{CancelToken, Deadline};
    use crate::MeasureError;

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn cancelled_before_timeout() {
        let token = CancelToken::new();
        let deadline = Deadline::new(token.clone(), 0);
        token.cancel();
        assert_eq!(deadline.check(), Err(MeasureError::Cancelled));
    }

    #[test]
    fn zero_budget_times_out() {
        let deadline = Deadline::with_budget(0);
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert_eq!(deadline.check(), Err(MeasureError::TimedOut { budget_ms: 0 }));
    }

    #[test]
    fn generous_budget_passes() {
        assert!(Deadline::with_budget(60_000).check().is_ok());
    }
}
