use crate::clock::{Scheduler, TimerId};
use std::time::Duration;

/// Quiet-period timer shared by the search commit path and the suggestion
/// list. Each consumer owns its own instance.
#[derive(Debug, Default)]
pub struct Debouncer {
    pending: Option<TimerId>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self { pending: None }
    }

    /// Restart the quiet period. The previous timer is cancelled before the
    /// new one is armed.
    pub fn trigger<T>(&mut self, sched: &mut Scheduler<T>, delay: Duration, payload: T) -> TimerId {
        self.cancel(sched);
        let id = sched.set_timeout(delay, payload);
        self.pending = Some(id);
        id
    }

    /// Claim a fired timer. True exactly once, and only for the timer armed
    /// by the latest `trigger`.
    pub fn accept(&mut self, id: TimerId) -> bool {
        if self.pending == Some(id) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Drop the pending timer, if any. Returns whether one was pending.
    pub fn cancel<T>(&mut self, sched: &mut Scheduler<T>) -> bool {
        match self.pending.take() {
            Some(id) => {
                sched.cancel(id);
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
