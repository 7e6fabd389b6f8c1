use super::stages::{MarkerState, STAGE_COUNT, StageTracker, TrackStatus};
use crate::clock::{Scheduler, TimerId};
use crate::config::duration_ms;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const MIN_DAMPING: f64 = 0.05;
pub const MAX_DAMPING: f64 = 0.15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Fraction of the remaining distance covered per frame.
    pub damping: f64,
    /// Snap distance.
    pub epsilon: f64,
    #[serde(with = "duration_ms")]
    pub frame_interval: Duration,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            damping: 0.1,
            epsilon: 0.001,
            frame_interval: Duration::from_millis(16),
        }
    }
}

impl MotionConfig {
    /// Damping pulled into the supported range.
    pub fn clamped(mut self) -> Self {
        if !(MIN_DAMPING..=MAX_DAMPING).contains(&self.damping) {
            let clamped = if self.damping.is_nan() {
                Self::default().damping
            } else {
                self.damping.clamp(MIN_DAMPING, MAX_DAMPING)
            };
            warn!(
                "motion damping {} outside [{}, {}], using {}",
                self.damping, MIN_DAMPING, MAX_DAMPING, clamped
            );
            self.damping = clamped;
        }
        if self.epsilon.is_nan() || self.epsilon <= 0.0 {
            warn!("motion epsilon {} must be positive, using default", self.epsilon);
            self.epsilon = Self::default().epsilon;
        }
        self
    }
}

/// Pixel (or cell) mapping for the rendered value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Track {
    pub width: f64,
    pub marker_width: f64,
}

impl Track {
    pub fn new(width: f64, marker_width: f64) -> Self {
        Self { width, marker_width }
    }

    pub fn offset(&self, rendered: f64) -> f64 {
        (rendered * (self.width - self.marker_width)).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AnimationSample {
    pub target: f64,
    pub rendered: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionTimer {
    Frame,
}

/// Damped follower of an externally owned target value.
///
/// The owner writes the target; this only ever writes `rendered`. The frame
/// loop is registered while there is distance to cover and released once
/// converged, on teardown, or when the target is reached.
pub struct MotionController {
    config: MotionConfig,
    sample: AnimationSample,
    track: Track,
    stages: StageTracker,
    frame: Option<TimerId>,
    alive: bool,
}

impl Default for MotionController {
    fn default() -> Self {
        Self::new(MotionConfig::default(), Track::default())
    }
}

impl MotionController {
    pub fn new(config: MotionConfig, track: Track) -> Self {
        Self {
            config: config.clamped(),
            sample: AnimationSample::default(),
            track,
            stages: StageTracker::new(),
            frame: None,
            alive: true,
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn sample(&self) -> AnimationSample {
        self.sample
    }

    pub fn rendered(&self) -> f64 {
        self.sample.rendered
    }

    pub fn target(&self) -> f64 {
        self.sample.target
    }

    pub fn offset(&self) -> f64 {
        self.track.offset(self.sample.rendered)
    }

    pub fn track(&self) -> Track {
        self.track
    }

    pub fn stage(&self) -> usize {
        self.stages.stage()
    }

    pub fn status(&self) -> TrackStatus {
        self.stages.status()
    }

    pub fn markers(&self) -> [MarkerState; STAGE_COUNT] {
        self.stages.markers()
    }

    pub fn is_animating(&self) -> bool {
        self.frame.is_some()
    }

    pub fn is_converged(&self) -> bool {
        self.sample.rendered == self.sample.target
    }

    /// New target from the owner. Ignored once the track is terminal.
    pub fn set_target<T>(&mut self, target: f64, sched: &mut Scheduler<T>)
    where
        T: From<MotionTimer>,
    {
        if !self.alive || self.stages.is_terminal() {
            return;
        }
        self.retarget(target, sched);
    }

    /// External "done": snap markers to complete and glide to the end.
    pub fn complete<T>(&mut self, sched: &mut Scheduler<T>)
    where
        T: From<MotionTimer>,
    {
        if !self.alive || !self.stages.complete() {
            return;
        }
        debug!("motion: completed");
        self.retarget(1.0, sched);
    }

    /// External error: the current stage turns to error and auto-progress
    /// stops. Motion settles where the target already was.
    pub fn fail(&mut self) {
        if !self.alive || !self.stages.fail() {
            return;
        }
        debug!("motion: failed at stage {}", self.stages.stage());
    }

    /// Advance one frame. Returns true when the follower is converged.
    pub fn step(&mut self) -> bool {
        let AnimationSample { target, rendered } = self.sample;
        let next = rendered + (target - rendered) * self.config.damping;
        self.sample.rendered = if (target - next).abs() < self.config.epsilon {
            target
        } else {
            next
        };
        self.is_converged()
    }

    /// Frame callback. Stale frames are ignored.
    pub fn on_frame<T>(&mut self, id: TimerId, sched: &mut Scheduler<T>) -> Option<AnimationSample> {
        if !self.alive || self.frame != Some(id) {
            return None;
        }
        if self.step() {
            if let Some(frame) = self.frame.take() {
                sched.cancel(frame);
            }
            trace!("motion: converged at {}", self.sample.rendered);
        }
        Some(self.sample)
    }

    /// Viewport changed: same rendered value, new mapping.
    pub fn resize(&mut self, track: Track) -> f64 {
        self.track = track;
        self.offset()
    }

    pub fn teardown<T>(&mut self, sched: &mut Scheduler<T>) {
        if let Some(frame) = self.frame.take() {
            sched.cancel(frame);
        }
        self.alive = false;
    }

    fn retarget<T>(&mut self, target: f64, sched: &mut Scheduler<T>)
    where
        T: From<MotionTimer>,
    {
        let target = if target.is_nan() { 0.0 } else { target.clamp(0.0, 1.0) };
        self.sample.target = target;
        if self.stages.observe(target) {
            trace!("motion: stage {}", self.stages.stage());
        }
        if !self.is_converged() && self.frame.is_none() {
            self.frame = Some(sched.set_interval(self.config.frame_interval, MotionTimer::Frame.into()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_frames(motion: &mut MotionController, sched: &mut Scheduler<MotionTimer>, frames: u32) {
        for _ in 0..frames {
            let until = sched.now() + motion.config().frame_interval;
            while let Some(fired) = sched.pop_due(until) {
                motion.on_frame(fired.id, sched);
            }
            sched.advance_to(until);
        }
    }

    #[test]
    fn test_converges_to_held_target_without_oscillation() {
        let mut sched: Scheduler<MotionTimer> = Scheduler::new();
        let mut motion = MotionController::default();
        motion.set_target(0.75, &mut sched);

        let mut last_gap = f64::MAX;
        for _ in 0..62 {
            assert!(!motion.step());
            let gap = (motion.target() - motion.rendered()).abs();
            assert!(gap <= last_gap);
            assert!(motion.rendered() <= 0.75);
            last_gap = gap;
        }
        assert!(motion.step());
        assert_eq!(motion.rendered(), 0.75);

        for _ in 0..10 {
            motion.step();
            assert_eq!(motion.rendered(), 0.75);
        }
    }

    #[test]
    fn test_frame_loop_stops_when_converged() {
        let mut sched: Scheduler<MotionTimer> = Scheduler::new();
        let mut motion = MotionController::default();
        motion.set_target(0.5, &mut sched);
        assert!(motion.is_animating());

        run_frames(&mut motion, &mut sched, 100);
        assert_eq!(motion.rendered(), 0.5);
        assert!(!motion.is_animating());
        assert_eq!(sched.pending(), 0);

        motion.set_target(0.75, &mut sched);
        assert!(motion.is_animating());
    }

    #[test]
    fn test_damping_is_clamped() {
        let motion = MotionController::new(
            MotionConfig {
                damping: 0.9,
                ..MotionConfig::default()
            },
            Track::default(),
        );
        assert_eq!(motion.config().damping, MAX_DAMPING);

        let motion = MotionController::new(
            MotionConfig {
                damping: 0.0,
                ..MotionConfig::default()
            },
            Track::default(),
        );
        assert_eq!(motion.config().damping, MIN_DAMPING);
    }

    #[test]
    fn test_resize_keeps_rendered_value() {
        let mut sched: Scheduler<MotionTimer> = Scheduler::new();
        let mut motion = MotionController::new(MotionConfig::default(), Track::new(420.0, 20.0));
        motion.set_target(0.5, &mut sched);
        run_frames(&mut motion, &mut sched, 200);
        assert_eq!(motion.offset(), 200.0);

        assert_eq!(motion.resize(Track::new(220.0, 20.0)), 100.0);
        assert_eq!(motion.rendered(), 0.5);
        assert_eq!(motion.resize(Track::new(10.0, 20.0)), 0.0);
    }

    #[test]
    fn test_failure_stops_auto_progress() {
        let mut sched: Scheduler<MotionTimer> = Scheduler::new();
        let mut motion = MotionController::default();
        motion.set_target(0.25, &mut sched);
        motion.fail();
        motion.set_target(0.75, &mut sched);

        assert_eq!(motion.target(), 0.25);
        assert_eq!(motion.status(), TrackStatus::Failed);
        assert_eq!(motion.markers()[1], MarkerState::Error);
    }

    #[test]
    fn test_complete_glides_to_end() {
        let mut sched: Scheduler<MotionTimer> = Scheduler::new();
        let mut motion = MotionController::default();
        motion.set_target(0.5, &mut sched);
        motion.complete(&mut sched);

        assert_eq!(motion.target(), 1.0);
        assert_eq!(motion.markers(), [MarkerState::Done; 4]);
        run_frames(&mut motion, &mut sched, 200);
        assert_eq!(motion.rendered(), 1.0);
    }

    #[test]
    fn test_teardown_releases_frame_loop() {
        let mut sched: Scheduler<MotionTimer> = Scheduler::new();
        let mut motion = MotionController::default();
        motion.set_target(0.75, &mut sched);
        motion.teardown(&mut sched);

        assert_eq!(sched.pending(), 0);
        motion.set_target(1.0, &mut sched);
        assert_eq!(sched.pending(), 0);
    }
}
