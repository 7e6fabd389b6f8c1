use serde::Serialize;

pub const STAGE_COUNT: usize = 4;

/// Width of one discrete stage in target units.
const STAGE_SPAN: f64 = 0.25;

/// Discrete stage for a target value; 1.0 clamps to the top stage.
pub fn stage_for(target: f64) -> usize {
    let stage = (target.clamp(0.0, 1.0) / STAGE_SPAN).floor() as usize;
    stage.min(STAGE_COUNT - 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    Ramping,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerState {
    Pending,
    Lit,
    Done,
    Error,
}

/// Discrete overlay on top of the continuous motion.
///
/// `Completed` and `Failed` are terminal and only entered on an explicit
/// external signal; neither is inferred from the target reaching 1.0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTracker {
    stage: usize,
    status: TrackStatus,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StageTracker {
    pub fn new() -> Self {
        Self {
            stage: 0,
            status: TrackStatus::Ramping,
        }
    }

    pub fn stage(&self) -> usize {
        self.stage
    }

    pub fn status(&self) -> TrackStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status != TrackStatus::Ramping
    }

    /// Follow a new target. Returns true when the lit stage changed.
    pub fn observe(&mut self, target: f64) -> bool {
        if self.is_terminal() {
            return false;
        }
        let stage = stage_for(target);
        let moved = stage != self.stage;
        self.stage = stage;
        moved
    }

    pub fn complete(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.stage = STAGE_COUNT - 1;
        self.status = TrackStatus::Completed;
        true
    }

    pub fn fail(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = TrackStatus::Failed;
        true
    }

    pub fn markers(&self) -> [MarkerState; STAGE_COUNT] {
        let mut markers = [MarkerState::Pending; STAGE_COUNT];
        for (i, marker) in markers.iter_mut().enumerate() {
            *marker = match self.status {
                TrackStatus::Completed => MarkerState::Done,
                _ if i < self.stage => MarkerState::Done,
                TrackStatus::Failed if i == self.stage => MarkerState::Error,
                TrackStatus::Ramping if i == self.stage => MarkerState::Lit,
                _ => MarkerState::Pending,
            };
        }
        markers
    }
}
