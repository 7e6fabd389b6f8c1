//! Single driving clock for the feedback engine.
//!
//! Every timeout, interval and animation frame the engine uses is registered
//! here. Time is virtual: the owner advances it (from wall-clock time in the
//! binary, explicitly in tests), and due timers are handed back one at a time
//! so a handler can schedule or cancel further timers before the next one is
//! delivered.

use log::trace;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Handle of a registered timer.
///
/// Ids are never reused, so a handle held by a component doubles as the
/// liveness token it compares fired timers against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// A timer that came due.
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<T> {
    pub id: TimerId,
    /// Deadline the timer was due at (the clock's `now` after delivery).
    pub at: Duration,
    pub payload: T,
}

#[derive(Debug)]
struct Timer<T> {
    key: (Duration, u64),
    period: Option<Duration>,
    payload: T,
}

/// Cooperative timer queue with a virtual monotonic clock.
#[derive(Debug)]
pub struct Scheduler<T> {
    now: Duration,
    next_id: u64,
    next_seq: u64,
    queue: BTreeMap<(Duration, u64), TimerId>,
    timers: HashMap<TimerId, Timer<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 1,
            next_seq: 0,
            queue: BTreeMap::new(),
            timers: HashMap::new(),
        }
    }

    /// Current virtual time since the scheduler was created.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule `payload` to fire once after `delay`.
    pub fn set_timeout(&mut self, delay: Duration, payload: T) -> TimerId {
        self.insert(delay, None, payload)
    }

    /// Schedule `payload` to fire every `period`, first after one period.
    pub fn set_interval(&mut self, period: Duration, payload: T) -> TimerId {
        // A zero period would never let the clock move past `now`.
        let period = period.max(Duration::from_millis(1));
        self.insert(period, Some(period), payload)
    }

    /// Remove a timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.timers.remove(&id) {
            Some(timer) => {
                self.queue.remove(&timer.key);
                trace!("timer {} cancelled at {:?}", id.0, self.now);
                true
            }
            None => false,
        }
    }

    /// Whether the timer is still registered.
    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    /// Number of registered timers.
    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Deadline of the earliest registered timer.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Move the clock forward to `until`. Never moves it backwards.
    ///
    /// Callers drain [`Scheduler::pop_due`] first; timers left in the past
    /// are delivered on the next pop without rewinding the clock.
    pub fn advance_to(&mut self, until: Duration) {
        if until > self.now {
            self.now = until;
        }
    }

    fn insert(&mut self, delay: Duration, period: Option<Duration>, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let key = (self.now + delay, self.next_seq);
        self.next_seq += 1;
        self.queue.insert(key, id);
        self.timers.insert(id, Timer { key, period, payload });
        trace!("timer {} armed for {:?} (period {:?})", id.0, key.0, period);
        id
    }
}

impl<T: Clone> Scheduler<T> {
    /// Deliver the earliest timer due at or before `until`.
    ///
    /// The clock moves to the timer's deadline. Intervals are re-armed one
    /// period after the deadline they just fired at; timeouts are removed.
    /// Timers with equal deadlines fire in the order they were armed.
    pub fn pop_due(&mut self, until: Duration) -> Option<Fired<T>> {
        let (&key, &id) = self.queue.iter().next()?;
        if key.0 > until {
            return None;
        }
        self.queue.remove(&key);
        self.advance_to(key.0);

        let timer = self.timers.get_mut(&id)?;
        let payload = timer.payload.clone();
        match timer.period {
            Some(period) => {
                let next = (key.0 + period, self.next_seq);
                self.next_seq += 1;
                timer.key = next;
                self.queue.insert(next, id);
            }
            None => {
                self.timers.remove(&id);
            }
        }

        Some(Fired { id, at: key.0, payload })
    }
}
