//! Simulated progress for operations whose real progress is unobservable.
//!
//! The controller ramps towards a ceiling while the operation is in flight
//! and only climbs to 100% once the caller reports that it resolved:
//!
//! ```text
//!   Idle --start--> Ramping --complete--> Finishing --reset delay--> Idle
//!                      ^                      |
//!                      +-------start----------+
//! ```
//!
//! All timers live on the owner's [`Scheduler`]; fired timers are routed back
//! through [`ProgressController::on_timer`], which ignores anything that is
//! not the currently armed handle for its slot.

use crate::clock::{Scheduler, TimerId};
use crate::config::duration_ms;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Internal fixed-point scale: values are held in basis points.
const SCALE: u32 = 10_000;

fn to_points(value: f64) -> u32 {
    (value.clamp(0.0, 1.0) * SCALE as f64).round() as u32
}

/// Timing and step constants for the simulated progress signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    #[serde(with = "duration_ms")]
    pub tick: Duration,
    pub step: f64,
    pub ceiling: f64,
    #[serde(with = "duration_ms")]
    pub finish_tick: Duration,
    pub finish_step: f64,
    /// Forces completion if the finishing ticks stall.
    #[serde(with = "duration_ms")]
    pub finish_guard: Duration,
    /// Minimum time between `complete()` and the settled signal.
    #[serde(with = "duration_ms")]
    pub dwell: Duration,
    #[serde(with = "duration_ms")]
    pub settle: Duration,
    #[serde(with = "duration_ms")]
    pub reset_delay: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(50),
            step: 0.02,
            ceiling: 0.9,
            finish_tick: Duration::from_millis(30),
            finish_step: 0.15,
            finish_guard: Duration::from_millis(500),
            dwell: Duration::from_millis(200),
            settle: Duration::from_millis(100),
            reset_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Ramping,
    Finishing,
}

/// Snapshot handed to readers (progress bar, motion target).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressState {
    pub value: f64,
    pub phase: Phase,
}

/// Timer slots owned by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressTimer {
    Ramp,
    Climb,
    Guard,
    Hold,
    Reset,
}

/// Outbound notifications produced by timer handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressSignal {
    /// 100% has been on screen long enough; the loading UI may be dismissed.
    Settled,
    /// Value returned to zero, ready for the next operation.
    Reset,
}

#[derive(Debug, Default)]
struct Slots {
    ramp: Option<TimerId>,
    climb: Option<TimerId>,
    guard: Option<TimerId>,
    hold: Option<TimerId>,
    reset: Option<TimerId>,
}

impl Slots {
    fn get(&self, timer: ProgressTimer) -> Option<TimerId> {
        match timer {
            ProgressTimer::Ramp => self.ramp,
            ProgressTimer::Climb => self.climb,
            ProgressTimer::Guard => self.guard,
            ProgressTimer::Hold => self.hold,
            ProgressTimer::Reset => self.reset,
        }
    }

    fn take(&mut self, timer: ProgressTimer) -> Option<TimerId> {
        match timer {
            ProgressTimer::Ramp => self.ramp.take(),
            ProgressTimer::Climb => self.climb.take(),
            ProgressTimer::Guard => self.guard.take(),
            ProgressTimer::Hold => self.hold.take(),
            ProgressTimer::Reset => self.reset.take(),
        }
    }

    fn cancel<T>(&mut self, timer: ProgressTimer, sched: &mut Scheduler<T>) {
        if let Some(id) = self.take(timer) {
            sched.cancel(id);
        }
    }

    fn cancel_all<T>(&mut self, sched: &mut Scheduler<T>) {
        for timer in [
            ProgressTimer::Ramp,
            ProgressTimer::Climb,
            ProgressTimer::Guard,
            ProgressTimer::Hold,
            ProgressTimer::Reset,
        ] {
            self.cancel(timer, sched);
        }
    }

    fn is_empty(&self) -> bool {
        self.ramp.is_none()
            && self.climb.is_none()
            && self.guard.is_none()
            && self.hold.is_none()
            && self.reset.is_none()
    }
}

/// Single writer of a [`ProgressState`].
#[derive(Debug)]
pub struct ProgressController {
    config: ProgressConfig,
    step: u32,
    ceiling: u32,
    finish_step: u32,
    value: u32,
    phase: Phase,
    completed_at: Option<Duration>,
    slots: Slots,
}

impl Default for ProgressController {
    fn default() -> Self {
        Self::new(ProgressConfig::default())
    }
}

impl ProgressController {
    pub fn new(config: ProgressConfig) -> Self {
        Self {
            step: to_points(config.step),
            ceiling: to_points(config.ceiling),
            finish_step: to_points(config.finish_step).max(1),
            config,
            value: 0,
            phase: Phase::Idle,
            completed_at: None,
            slots: Slots::default(),
        }
    }

    pub fn config(&self) -> &ProgressConfig {
        &self.config
    }

    pub fn value(&self) -> f64 {
        self.value as f64 / SCALE as f64
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> ProgressState {
        ProgressState {
            value: self.value(),
            phase: self.phase,
        }
    }

    /// Whole percent, for labels.
    pub fn percent(&self) -> u32 {
        self.value * 100 / SCALE
    }

    /// Whether any timer of the current cycle is still armed.
    pub fn is_active(&self) -> bool {
        !self.slots.is_empty()
    }

    /// Begin a new operation. Any previous cycle is cancelled before the new
    /// ramp is armed.
    pub fn start<T>(&mut self, sched: &mut Scheduler<T>)
    where
        T: From<ProgressTimer>,
    {
        self.slots.cancel_all(sched);
        self.value = 0;
        self.phase = Phase::Ramping;
        self.completed_at = None;
        self.slots.ramp = Some(sched.set_interval(self.config.tick, ProgressTimer::Ramp.into()));
        debug!("progress: ramp started at {:?}", sched.now());
    }

    /// The real operation resolved (success or failure alike).
    pub fn complete<T>(&mut self, sched: &mut Scheduler<T>)
    where
        T: From<ProgressTimer>,
    {
        if self.phase != Phase::Ramping {
            trace!("progress: complete() ignored in phase {:?}", self.phase);
            return;
        }

        self.slots.cancel(ProgressTimer::Ramp, sched);
        self.phase = Phase::Finishing;
        self.completed_at = Some(sched.now());

        if self.value >= self.ceiling {
            self.value = SCALE;
            self.slots.hold = Some(sched.set_timeout(self.config.dwell, ProgressTimer::Hold.into()));
            debug!("progress: already at ceiling, dwelling at 100%");
        } else {
            self.slots.climb = Some(
                sched.set_interval(self.config.finish_tick, ProgressTimer::Climb.into()),
            );
            self.slots.guard = Some(
                sched.set_timeout(self.config.finish_guard, ProgressTimer::Guard.into()),
            );
            debug!("progress: finishing from {}%", self.percent());
        }
    }

    /// Stop every timer and keep the current value. Safe to call repeatedly.
    pub fn cancel<T>(&mut self, sched: &mut Scheduler<T>) {
        if self.slots.is_empty() && self.phase == Phase::Idle {
            return;
        }
        self.slots.cancel_all(sched);
        self.phase = Phase::Idle;
        debug!("progress: cancelled at {}%", self.percent());
    }

    /// Route a fired timer back into the controller. Timers that are not
    /// the currently armed handle for their slot are ignored.
    pub fn on_timer<T>(
        &mut self,
        id: TimerId,
        timer: ProgressTimer,
        sched: &mut Scheduler<T>,
    ) -> Option<ProgressSignal>
    where
        T: From<ProgressTimer>,
    {
        if self.slots.get(timer) != Some(id) {
            trace!("progress: stale {:?} timer {} ignored", timer, id.raw());
            return None;
        }

        match timer {
            ProgressTimer::Ramp => {
                self.value = (self.value + self.step).min(self.ceiling).max(self.value);
                None
            }
            ProgressTimer::Climb => {
                self.value = (self.value + self.finish_step).min(SCALE);
                if self.value == SCALE {
                    self.reach_full(sched);
                }
                None
            }
            ProgressTimer::Guard => {
                self.slots.guard = None;
                debug!("progress: finish guard forced completion from {}%", self.percent());
                self.value = SCALE;
                self.reach_full(sched);
                None
            }
            ProgressTimer::Hold => {
                self.slots.hold = None;
                self.slots.reset = Some(
                    sched.set_timeout(self.config.reset_delay, ProgressTimer::Reset.into()),
                );
                Some(ProgressSignal::Settled)
            }
            ProgressTimer::Reset => {
                self.slots.reset = None;
                self.value = 0;
                self.phase = Phase::Idle;
                debug!("progress: reset at {:?}", sched.now());
                Some(ProgressSignal::Reset)
            }
        }
    }

    fn reach_full<T>(&mut self, sched: &mut Scheduler<T>)
    where
        T: From<ProgressTimer>,
    {
        self.slots.cancel(ProgressTimer::Climb, sched);
        self.slots.cancel(ProgressTimer::Guard, sched);

        // 100% stays up for the settle time, and never ends sooner than
        // `dwell` after the operation resolved.
        let dwell_left = self
            .completed_at
            .map(|at| (at + self.config.dwell).saturating_sub(sched.now()))
            .unwrap_or_default();
        let hold = self.config.settle.max(dwell_left);
        self.slots.hold = Some(sched.set_timeout(hold, ProgressTimer::Hold.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    struct Harness {
        sched: Scheduler<ProgressTimer>,
        progress: ProgressController,
        signals: Vec<(Duration, ProgressSignal)>,
        samples: Vec<f64>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                sched: Scheduler::new(),
                progress: ProgressController::default(),
                signals: Vec::new(),
                samples: Vec::new(),
            }
        }

        fn run_until(&mut self, until: Duration) {
            while let Some(fired) = self.sched.pop_due(until) {
                if let Some(signal) = self.progress.on_timer(fired.id, fired.payload, &mut self.sched) {
                    self.signals.push((fired.at, signal));
                }
                self.samples.push(self.progress.value());
            }
            self.sched.advance_to(until);
        }

        fn run_for(&mut self, span: Duration) {
            let until = self.sched.now() + span;
            self.run_until(until);
        }
    }

    #[test]
    fn test_ramp_never_crosses_ceiling() {
        let mut h = Harness::new();
        h.progress.start(&mut h.sched);
        h.run_for(Duration::from_secs(60));

        assert_eq!(h.progress.value(), 0.9);
        assert_eq!(h.progress.phase(), Phase::Ramping);
        assert!(h.samples.iter().all(|v| *v <= 0.9));
    }

    #[test]
    fn test_value_is_monotonic_until_reset() {
        let mut h = Harness::new();
        h.progress.start(&mut h.sched);
        h.run_for(ms(730));
        h.progress.complete(&mut h.sched);
        h.run_for(ms(400));

        assert!(h.samples.windows(2).all(|w| w[0] <= w[1]));
        assert!(h.samples.iter().all(|v| *v <= 1.0));
        assert_eq!(h.progress.value(), 1.0);
    }

    #[test]
    fn test_twenty_one_ticks_reach_exactly_042() {
        let mut h = Harness::new();
        h.progress.start(&mut h.sched);
        h.run_until(ms(1050));
        assert_eq!(h.progress.value(), 0.42);
    }

    #[test]
    fn test_finishing_reaches_full_within_four_fast_ticks() {
        let mut h = Harness::new();
        h.progress.start(&mut h.sched);
        h.run_until(ms(1050));
        h.progress.complete(&mut h.sched);
        assert_eq!(h.progress.phase(), Phase::Finishing);

        h.run_until(ms(1050 + 4 * 30));
        assert_eq!(h.progress.value(), 1.0);
        assert_eq!(h.progress.phase(), Phase::Finishing);

        h.run_until(ms(2000));
        assert_eq!(
            h.signals,
            vec![
                (ms(1170 + 100), ProgressSignal::Settled),
                (ms(1170 + 100 + 500), ProgressSignal::Reset),
            ]
        );
        assert_eq!(h.progress.value(), 0.0);
        assert_eq!(h.progress.phase(), Phase::Idle);
        assert_eq!(h.sched.pending(), 0);
    }

    #[test]
    fn test_complete_at_ceiling_dwells_before_settling() {
        let mut h = Harness::new();
        h.progress.start(&mut h.sched);
        h.run_for(Duration::from_secs(5));
        let completed_at = h.sched.now();

        h.progress.complete(&mut h.sched);
        assert_eq!(h.progress.value(), 1.0);

        h.run_for(ms(199));
        assert!(h.signals.is_empty());
        h.run_for(ms(1));
        assert_eq!(h.signals, vec![(completed_at + ms(200), ProgressSignal::Settled)]);
    }

    #[test]
    fn test_instant_resolution_is_still_perceptible() {
        let mut h = Harness::new();
        h.progress.start(&mut h.sched);
        h.progress.complete(&mut h.sched);

        h.run_for(ms(1000));
        let (settled_at, signal) = h.signals[0];
        assert_eq!(signal, ProgressSignal::Settled);
        assert!(settled_at >= h.progress.config().dwell);
        assert!(h.samples.contains(&1.0));
    }

    #[test]
    fn test_guard_forces_completion_when_ticks_are_too_slow() {
        let config = ProgressConfig {
            finish_tick: ms(400),
            ..ProgressConfig::default()
        };
        let mut sched: Scheduler<ProgressTimer> = Scheduler::new();
        let mut progress = ProgressController::new(config);
        progress.start(&mut sched);
        progress.complete(&mut sched);

        let mut signals = Vec::new();
        while let Some(fired) = sched.pop_due(ms(600)) {
            if let Some(s) = progress.on_timer(fired.id, fired.payload, &mut sched) {
                signals.push((fired.at, s));
            }
        }
        assert_eq!(progress.value(), 1.0);
        assert_eq!(signals, vec![(ms(600), ProgressSignal::Settled)]);
    }

    #[test]
    fn test_restart_cancels_previous_cycle() {
        let mut h = Harness::new();
        h.progress.start(&mut h.sched);
        h.run_until(ms(125));
        h.progress.start(&mut h.sched);
        h.run_until(ms(225));

        // Restarted at 125: ticks at 175 and 225 only.
        assert_eq!(h.progress.value(), 0.04);
        assert_eq!(h.sched.pending(), 1);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut h = Harness::new();
        h.progress.start(&mut h.sched);
        h.run_until(ms(200));
        h.progress.cancel(&mut h.sched);
        let snapshot = h.progress.state();

        h.progress.cancel(&mut h.sched);
        h.run_for(Duration::from_secs(2));

        assert_eq!(h.progress.state(), snapshot);
        assert_eq!(snapshot.value, 0.08);
        assert_eq!(h.sched.pending(), 0);
    }

    #[test]
    fn test_cancel_after_natural_completion_changes_nothing() {
        let mut h = Harness::new();
        h.progress.start(&mut h.sched);
        h.progress.complete(&mut h.sched);
        h.run_for(Duration::from_secs(2));
        let snapshot = h.progress.state();

        h.progress.cancel(&mut h.sched);
        assert_eq!(h.progress.state(), snapshot);
    }

    #[test]
    fn test_stale_timer_after_cancel_is_noop() {
        let mut sched: Scheduler<ProgressTimer> = Scheduler::new();
        let mut progress = ProgressController::default();
        progress.start(&mut sched);
        let fired = sched.pop_due(ms(50)).expect("ramp tick");
        progress.cancel(&mut sched);

        assert_eq!(progress.on_timer(fired.id, fired.payload, &mut sched), None);
        assert_eq!(progress.value(), 0.0);
    }

    #[test]
    fn test_settle_never_precedes_dwell_after_complete() {
        let dwell = ProgressConfig::default().dwell;
        // ramp ticks needed to reach 0.0, 0.5, 0.76, 0.88 and the 0.9 ceiling
        for ticks in [0u64, 25, 38, 44, 45] {
            let mut h = Harness::new();
            h.progress.start(&mut h.sched);
            h.run_for(ms(ticks * 50));
            let completed_at = h.sched.now();
            h.progress.complete(&mut h.sched);

            h.run_for(Duration::from_secs(2));
            let (settled_at, signal) = h.signals[0];
            assert_eq!(signal, ProgressSignal::Settled);
            assert!(
                settled_at >= completed_at + dwell,
                "complete() after {} ticks settled {:?} after the call",
                ticks,
                settled_at - completed_at
            );
        }
    }

    #[test]
    fn test_quick_climb_waits_out_dwell() {
        let mut h = Harness::new();
        h.progress.start(&mut h.sched);
        h.run_for(ms(44 * 50));
        let completed_at = h.sched.now();
        h.progress.complete(&mut h.sched);

        // one fast tick reaches 100%, settle alone would end at +130ms
        h.run_for(ms(30));
        assert_eq!(h.progress.value(), 1.0);
        h.run_for(ms(169));
        assert!(h.signals.is_empty());
        h.run_for(ms(1));
        assert_eq!(h.signals, vec![(completed_at + ms(200), ProgressSignal::Settled)]);
    }

    #[test]
    fn test_second_complete_while_finishing_is_ignored() {
        let mut h = Harness::new();
        h.progress.start(&mut h.sched);
        h.run_until(ms(1050));
        h.progress.complete(&mut h.sched);
        let pending = h.sched.pending();
        let deadline = h.sched.next_deadline();

        h.run_until(ms(1100));
        let value = h.progress.value();
        h.progress.complete(&mut h.sched);
        assert_eq!(h.sched.pending(), pending);
        assert_eq!(h.progress.value(), value);
        assert_eq!(h.progress.phase(), Phase::Finishing);
        assert_eq!(deadline, Some(ms(1080)));

        h.run_until(ms(2000));
        assert_eq!(h.signals[0], (ms(1270), ProgressSignal::Settled));
    }

    #[test]
    fn test_complete_while_idle_is_ignored() {
        let mut sched: Scheduler<ProgressTimer> = Scheduler::new();
        let mut progress = ProgressController::default();
        progress.complete(&mut sched);
        assert_eq!(progress.phase(), Phase::Idle);
        assert_eq!(sched.pending(), 0);
    }
}
