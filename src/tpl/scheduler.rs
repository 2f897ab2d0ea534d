//! Coalescing refresh scheduler
//!
//! The first change notification after a refresh arms a deadline one period
//! ahead; further notifications before the deadline are absorbed. The owner
//! polls and runs a single refresh once the deadline has passed.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Source of the current time
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Cell::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// Shared handle to a single pending deadline
#[derive(Clone)]
pub struct UpdateScheduler {
    period: Duration,
    clock: Rc<dyn Clock>,
    deadline: Rc<Cell<Option<Instant>>>,
}

impl UpdateScheduler {
    pub fn new(period: Duration) -> Self {
        Self::with_clock(period, Rc::new(SystemClock))
    }

    pub fn with_clock(period: Duration, clock: Rc<dyn Clock>) -> Self {
        Self {
            period,
            clock,
            deadline: Rc::new(Cell::new(None)),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Request a refresh; a no-op while one is already pending
    pub fn arm(&self) {
        if self.deadline.get().is_some() {
            return;
        }
        let deadline = self.clock.now() + self.period;
        tracing::trace!(period_ms = self.period.as_millis() as u64, "refresh scheduled");
        self.deadline.set(Some(deadline));
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.get().is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline.get()
    }

    /// Armed and past the deadline
    pub fn is_due(&self) -> bool {
        self.deadline
            .get()
            .is_some_and(|deadline| self.clock.now() >= deadline)
    }

    /// Time left until the deadline, zero if already due
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .get()
            .map(|deadline| deadline.saturating_duration_since(self.clock.now()))
    }

    pub fn disarm(&self) {
        self.deadline.set(None);
    }
}

impl fmt::Debug for UpdateScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateScheduler")
            .field("period", &self.period)
            .field("deadline", &self.deadline.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> (Rc<ManualClock>, UpdateScheduler) {
        let clock = Rc::new(ManualClock::new());
        let scheduler = UpdateScheduler::with_clock(Duration::from_millis(50), clock.clone());
        (clock, scheduler)
    }

    #[test]
    fn test_repeated_arm_keeps_first_deadline() {
        let (clock, scheduler) = scheduler();
        scheduler.arm();
        let first = scheduler.deadline();
        clock.advance(Duration::from_millis(30));
        scheduler.arm();
        assert_eq!(scheduler.deadline(), first);
        assert!(!scheduler.is_due());
        clock.advance(Duration::from_millis(20));
        assert!(scheduler.is_due());
    }

    #[test]
    fn test_disarm_allows_new_deadline() {
        let (clock, scheduler) = scheduler();
        assert!(!scheduler.is_armed());
        assert_eq!(scheduler.remaining(), None);
        scheduler.arm();
        scheduler.disarm();
        clock.advance(Duration::from_millis(10));
        scheduler.arm();
        assert_eq!(scheduler.remaining(), Some(Duration::from_millis(50)));
    }

    #[test]
    fn test_clones_share_deadline() {
        let (_clock, scheduler) = scheduler();
        let handle = scheduler.clone();
        handle.arm();
        assert!(scheduler.is_armed());
    }
}
