//! Smooth visual position driven by a discrete external progress value.

pub mod follower;
pub mod stages;

pub use follower::{AnimationSample, MAX_DAMPING, MIN_DAMPING, MotionConfig, MotionController, MotionTimer, Track};
pub use stages::{MarkerState, STAGE_COUNT, StageTracker, TrackStatus, stage_for};
