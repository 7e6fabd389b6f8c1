//! Page-level composition of the feedback components.
//!
//! A `ListScreen` owns the scheduler and one instance of every component,
//! routes fired timers back to their owner, and turns committed filter
//! changes into load requests for the fetch layer. It is the only place
//! that tears components down.

use crate::clock::{Scheduler, TimerId};
use crate::config::EngineConfig;
use crate::filter::{
    FilterPatch, FilterReconciler, FilterTimer, LoadMode, LoadOutcome, LoadRequest, NavigationStore, RequestId,
};
use crate::motion::{MotionController, MotionTimer, Track};
use crate::progress::{Phase, ProgressController, ProgressSignal, ProgressTimer};
use crate::suggest::{Bounds, Searchable, SuggestTimer, SuggestionEngine, Viewport};
use log::{debug, info};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenTimer {
    Progress(ProgressTimer),
    Filter(FilterTimer),
    Suggest(SuggestTimer),
    Motion(MotionTimer),
}

impl From<ProgressTimer> for ScreenTimer {
    fn from(timer: ProgressTimer) -> Self {
        ScreenTimer::Progress(timer)
    }
}

impl From<FilterTimer> for ScreenTimer {
    fn from(timer: FilterTimer) -> Self {
        ScreenTimer::Filter(timer)
    }
}

impl From<SuggestTimer> for ScreenTimer {
    fn from(timer: SuggestTimer) -> Self {
        ScreenTimer::Suggest(timer)
    }
}

impl From<MotionTimer> for ScreenTimer {
    fn from(timer: MotionTimer) -> Self {
        ScreenTimer::Motion(timer)
    }
}

/// Outbound notifications for the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScreenEvent {
    /// Fetch this filter and report back through [`ListScreen::resolved`].
    Load(LoadRequest),
    /// 100% has been shown long enough; dismiss the loading UI.
    LoadingHidden,
    /// The progress value returned to 0.
    ProgressReset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestKey {
    Up,
    Down,
    Enter,
    Esc,
}

pub struct ListScreen<I, N: NavigationStore> {
    sched: Scheduler<ScreenTimer>,
    progress: ProgressController,
    filter: FilterReconciler<N>,
    suggest: SuggestionEngine<I>,
    motion: MotionController,
    loading_visible: bool,
    events: Vec<ScreenEvent>,
    alive: bool,
}

impl<I: Searchable + 'static, N: NavigationStore> ListScreen<I, N> {
    pub fn new(config: &EngineConfig, navigation: N, dataset: Vec<I>) -> Self {
        Self::with_suggestions(config, navigation, SuggestionEngine::new(config.suggest.clone(), dataset))
    }

    /// Build around a preconfigured suggestion engine (custom matcher or
    /// formatter).
    pub fn with_suggestions(config: &EngineConfig, navigation: N, suggest: SuggestionEngine<I>) -> Self {
        Self {
            sched: Scheduler::new(),
            progress: ProgressController::new(config.progress.clone()),
            filter: FilterReconciler::new(config.filter.clone(), navigation),
            suggest,
            motion: MotionController::new(config.motion.clone(), Track::default()),
            loading_visible: false,
            events: Vec::new(),
            alive: true,
        }
    }
}

impl<I: Searchable, N: NavigationStore> ListScreen<I, N> {
    pub fn now(&self) -> Duration {
        self.sched.now()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.sched.next_deadline()
    }

    pub fn progress(&self) -> &ProgressController {
        &self.progress
    }

    pub fn filter(&self) -> &FilterReconciler<N> {
        &self.filter
    }

    pub fn navigation_mut(&mut self) -> &mut N {
        self.filter.navigation_mut()
    }

    pub fn suggestions(&self) -> &SuggestionEngine<I> {
        &self.suggest
    }

    pub fn motion(&self) -> &MotionController {
        &self.motion
    }

    pub fn is_loading_visible(&self) -> bool {
        self.loading_visible
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn pending_timers(&self) -> usize {
        self.sched.pending()
    }

    /// Events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<ScreenEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn open(&mut self) {
        if let Some(request) = self.filter.open() {
            self.issue(request);
        }
    }

    /// Keystroke in the search input: feeds both the draft filter and the
    /// suggestion list.
    pub fn type_search(&mut self, text: &str) {
        if !self.alive {
            return;
        }
        self.filter.edit_search(text, &mut self.sched);
        self.suggest.on_input(text, &mut self.sched);
    }

    pub fn submit_search(&mut self) {
        if !self.alive {
            return;
        }
        self.suggest.close(&mut self.sched);
        if let Some(request) = self.filter.submit(&mut self.sched) {
            self.issue(request);
        }
    }

    /// Select-style controls (status, page): committed immediately.
    pub fn set_filter(&mut self, patch: FilterPatch) {
        if let Some(request) = self.filter.update_filter(patch, &mut self.sched) {
            self.issue(request);
        }
    }

    pub fn set_page(&mut self, page: u32) {
        self.set_filter(FilterPatch::new().page(page));
    }

    pub fn focus_search(&mut self) {
        self.suggest.on_focus(&mut self.sched);
    }

    pub fn blur_search(&mut self) {
        self.suggest.on_blur(&mut self.sched);
    }

    /// Commit a suggestion through the regular search path.
    pub fn select_suggestion(&mut self, index: usize) -> Option<String> {
        let value = self.suggest.select(index, &mut self.sched)?;
        if let Some(request) = self.filter.submit_text(value.clone(), &mut self.sched) {
            self.issue(request);
        }
        Some(value)
    }

    /// Keyboard handling while the search input has focus. Returns whether
    /// the key was consumed by the suggestion list.
    pub fn suggestion_key(&mut self, key: SuggestKey) -> bool {
        if !self.suggest.is_visible() {
            if key == SuggestKey::Enter {
                self.submit_search();
                return true;
            }
            return false;
        }
        match key {
            SuggestKey::Up => self.suggest.highlight_prev(),
            SuggestKey::Down => self.suggest.highlight_next(),
            SuggestKey::Enter => {
                if let Some(index) = self.suggest.highlighted() {
                    self.select_suggestion(index);
                }
            }
            SuggestKey::Esc => self.suggest.close(&mut self.sched),
        }
        true
    }

    /// Scroll/resize/layout change.
    pub fn viewport_changed(&mut self, input: Bounds, viewport: Viewport, track: Track) {
        self.suggest.reanchor(input, viewport);
        self.motion.resize(track);
    }

    /// Re-validate the committed filter. Silent while results are shown.
    pub fn refresh(&mut self) {
        if let Some(request) = self.filter.refresh() {
            self.issue(request);
        }
    }

    /// Navigation changed outside the screen (back/forward).
    pub fn navigation_changed(&mut self) {
        if let Some(request) = self.filter.sync_from_navigation(&mut self.sched) {
            self.issue(request);
        }
    }

    /// A load finished. Returns false for superseded requests, which are
    /// dropped without touching the loading UI.
    pub fn resolved(&mut self, id: RequestId, outcome: LoadOutcome) -> bool {
        if !self.filter.resolve(id, outcome) {
            return false;
        }
        if self.loading_visible && self.progress.phase() == Phase::Ramping {
            self.progress.complete(&mut self.sched);
        }
        true
    }

    /// New discrete stage value for the tracked operation.
    pub fn track_progress(&mut self, target: f64) {
        self.motion.set_target(target, &mut self.sched);
    }

    pub fn track_completed(&mut self) {
        self.motion.complete(&mut self.sched);
    }

    pub fn track_failed(&mut self) {
        self.motion.fail();
    }

    /// Run every timer due up to `until`, in order.
    pub fn advance_to(&mut self, until: Duration) {
        while let Some(fired) = self.sched.pop_due(until) {
            self.dispatch(fired.id, fired.payload);
        }
        self.sched.advance_to(until);
    }

    pub fn advance_by(&mut self, delta: Duration) {
        let until = self.sched.now() + delta;
        self.advance_to(until);
    }

    pub fn teardown(&mut self) {
        if !self.alive {
            return;
        }
        self.progress.cancel(&mut self.sched);
        self.filter.teardown(&mut self.sched);
        self.suggest.teardown(&mut self.sched);
        self.motion.teardown(&mut self.sched);
        self.loading_visible = false;
        self.alive = false;
        info!("screen: torn down with {} timers left", self.sched.pending());
    }

    fn dispatch(&mut self, id: TimerId, timer: ScreenTimer) {
        match timer {
            ScreenTimer::Progress(timer) => match self.progress.on_timer(id, timer, &mut self.sched) {
                Some(ProgressSignal::Settled) => {
                    self.loading_visible = false;
                    self.events.push(ScreenEvent::LoadingHidden);
                }
                Some(ProgressSignal::Reset) => self.events.push(ScreenEvent::ProgressReset),
                None => {}
            },
            ScreenTimer::Filter(timer) => {
                if let Some(request) = self.filter.on_timer(id, timer, &mut self.sched) {
                    self.issue(request);
                }
            }
            ScreenTimer::Suggest(timer) => self.suggest.on_timer(id, timer, &mut self.sched),
            ScreenTimer::Motion(_) => {
                self.motion.on_frame(id, &mut self.sched);
            }
        }
    }

    fn issue(&mut self, request: LoadRequest) {
        debug!("screen: {} {:?} for {:?}", request.id, request.mode, request.changed);
        if request.mode == LoadMode::Visible {
            self.progress.start(&mut self.sched);
            self.loading_visible = true;
        }
        self.events.push(ScreenEvent::Load(request));
    }
}
