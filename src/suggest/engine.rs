use super::anchor::{Bounds, Placement, Viewport, place_overlay};
use super::matcher::{FuzzyRanker, Searchable, contains_any, first_matching_field, suggest};
use crate::clock::{Scheduler, TimerId};
use crate::config::duration_ms;
use crate::debounce::Debouncer;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// How matches are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ranking {
    /// Matcher acceptance, source order.
    #[default]
    SourceOrder,
    /// Fuzzy score, best first; ties keep source order.
    Fuzzy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestConfig {
    #[serde(with = "duration_ms")]
    pub debounce: Duration,
    /// How long the list survives a blur, so a click on it still lands.
    #[serde(with = "duration_ms")]
    pub blur_grace: Duration,
    pub max_results: usize,
    pub ranking: Ranking,
    pub row_height: f64,
    /// Extra overlay height for borders/padding.
    pub chrome: f64,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(150),
            blur_grace: Duration::from_millis(200),
            max_results: 5,
            ranking: Ranking::SourceOrder,
            row_height: 1.0,
            chrome: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestTimer {
    Debounce,
    BlurGrace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    /// Index into the dataset.
    pub index: usize,
    pub label: String,
    /// Canonical search text committed on selection.
    pub value: String,
}

/// Derived candidate list; always recomputed whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SuggestionSet {
    pub query: String,
    pub candidates: Vec<Suggestion>,
    pub visible: bool,
}

type Matcher<I> = Box<dyn Fn(&I, &str) -> bool + Send>;
type Formatter<I> = Box<dyn Fn(&I, &str) -> String + Send>;

/// Type-ahead suggestions over a client-held dataset.
///
/// Listens to the same keystrokes as the filter draft but never writes
/// committed state; a selection is handed back to the caller, which commits
/// it through the regular search path.
pub struct SuggestionEngine<I> {
    config: SuggestConfig,
    dataset: Vec<I>,
    /// Custom acceptance test; `None` leaves acceptance to the ranking.
    matcher: Option<Matcher<I>>,
    formatter: Formatter<I>,
    ranker: FuzzyRanker,
    query: String,
    set: SuggestionSet,
    highlight: usize,
    focused: bool,
    debounce: Debouncer,
    blur_timer: Option<TimerId>,
    anchor: Option<(Bounds, Viewport)>,
    alive: bool,
}

impl<I: Searchable + 'static> SuggestionEngine<I> {
    pub fn new(config: SuggestConfig, dataset: Vec<I>) -> Self {
        Self {
            config,
            dataset,
            matcher: None,
            formatter: Box::new(first_matching_field::<I>),
            ranker: FuzzyRanker::new(),
            query: String::new(),
            set: SuggestionSet::default(),
            highlight: 0,
            focused: false,
            debounce: Debouncer::new(),
            blur_timer: None,
            anchor: None,
            alive: true,
        }
    }

    /// Restrict candidates to items `matcher` accepts. It receives the
    /// normalized query. Without one, source-order ranking uses
    /// [`contains_any`] and fuzzy ranking accepts anything it can score.
    pub fn with_matcher(mut self, matcher: impl Fn(&I, &str) -> bool + Send + 'static) -> Self {
        self.matcher = Some(Box::new(matcher));
        self
    }

    /// Replace the display formatter. It receives the normalized query.
    pub fn with_formatter(mut self, formatter: impl Fn(&I, &str) -> String + Send + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }
}

impl<I: Searchable> SuggestionEngine<I> {
    pub fn set(&self) -> &SuggestionSet {
        &self.set
    }

    pub fn is_visible(&self) -> bool {
        self.set.visible
    }

    pub fn highlighted(&self) -> Option<usize> {
        (!self.set.candidates.is_empty()).then_some(self.highlight)
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn dataset(&self) -> &[I] {
        &self.dataset
    }

    /// Keystroke: restart the debounce, or clear immediately on a blank query.
    pub fn on_input<T>(&mut self, text: &str, sched: &mut Scheduler<T>)
    where
        T: From<SuggestTimer>,
    {
        if !self.alive {
            return;
        }
        self.query = text.to_string();
        if self.query.trim().is_empty() {
            self.debounce.cancel(sched);
            self.clear();
            return;
        }
        self.debounce.trigger(sched, self.config.debounce, SuggestTimer::Debounce.into());
    }

    pub fn on_focus<T>(&mut self, sched: &mut Scheduler<T>) {
        if !self.alive {
            return;
        }
        self.focused = true;
        if let Some(id) = self.blur_timer.take() {
            sched.cancel(id);
        }
        if self.set.candidates.is_empty() && !self.query.trim().is_empty() {
            self.recompute();
        } else {
            self.update_visibility();
        }
    }

    /// Focus left the input. The list stays up for the grace period and is
    /// then cleared.
    pub fn on_blur<T>(&mut self, sched: &mut Scheduler<T>)
    where
        T: From<SuggestTimer>,
    {
        if !self.alive || !self.focused {
            return;
        }
        self.focused = false;
        if let Some(id) = self.blur_timer.take() {
            sched.cancel(id);
        }
        self.blur_timer = Some(sched.set_timeout(self.config.blur_grace, SuggestTimer::BlurGrace.into()));
        self.update_visibility();
    }

    pub fn on_timer<T>(&mut self, id: TimerId, timer: SuggestTimer, _sched: &mut Scheduler<T>) {
        if !self.alive {
            return;
        }
        match timer {
            SuggestTimer::Debounce => {
                if self.debounce.accept(id) {
                    self.recompute();
                }
            }
            SuggestTimer::BlurGrace => {
                if self.blur_timer == Some(id) {
                    self.blur_timer = None;
                    trace!("suggest: blur grace elapsed");
                    self.clear();
                }
            }
        }
    }

    /// Input bounds or viewport changed (scroll, resize, layout).
    pub fn reanchor(&mut self, input: Bounds, viewport: Viewport) {
        self.anchor = Some((input, viewport));
    }

    /// Current overlay placement, computed from the latest anchor. `None`
    /// while the list is hidden or no anchor has been reported.
    pub fn placement(&self) -> Option<Placement> {
        if !self.set.visible {
            return None;
        }
        let (input, viewport) = self.anchor?;
        Some(place_overlay(
            input,
            viewport,
            self.set.candidates.len(),
            self.config.row_height,
            self.config.chrome,
        ))
    }

    /// Candidate row under a viewport point.
    pub fn row_at(&self, x: f64, y: f64) -> Option<usize> {
        self.placement()?
            .row_at(x, y, self.set.candidates.len(), self.config.chrome)
    }

    pub fn highlight_next(&mut self) {
        let count = self.set.candidates.len();
        if count > 0 {
            self.highlight = (self.highlight + 1) % count;
        }
    }

    pub fn highlight_prev(&mut self) {
        let count = self.set.candidates.len();
        if count > 0 {
            self.highlight = if self.highlight == 0 { count - 1 } else { self.highlight - 1 };
        }
    }

    /// Pick a candidate: cancels pending timers, closes the list and returns
    /// the canonical text to commit.
    pub fn select<T>(&mut self, index: usize, sched: &mut Scheduler<T>) -> Option<String> {
        if !self.alive || !self.set.visible {
            return None;
        }
        let value = self.set.candidates.get(index)?.value.clone();
        self.debounce.cancel(sched);
        if let Some(id) = self.blur_timer.take() {
            sched.cancel(id);
        }
        self.query = value.clone();
        self.clear();
        debug!("suggest: selected {:?}", value);
        Some(value)
    }

    pub fn select_highlighted<T>(&mut self, sched: &mut Scheduler<T>) -> Option<String> {
        let index = self.highlighted()?;
        self.select(index, sched)
    }

    /// Close without selecting (Esc).
    pub fn close<T>(&mut self, sched: &mut Scheduler<T>) {
        self.debounce.cancel(sched);
        self.clear();
    }

    pub fn teardown<T>(&mut self, sched: &mut Scheduler<T>) {
        if !self.alive {
            return;
        }
        self.debounce.cancel(sched);
        if let Some(id) = self.blur_timer.take() {
            sched.cancel(id);
        }
        self.clear();
        self.alive = false;
    }

    fn recompute(&mut self) {
        // Unbounded here: duplicates are dropped before the cap applies.
        let matches = match (self.config.ranking, &self.matcher) {
            (Ranking::SourceOrder, Some(matcher)) => suggest(&self.query, &self.dataset, matcher, usize::MAX),
            (Ranking::SourceOrder, None) => suggest(&self.query, &self.dataset, contains_any::<I>, usize::MAX),
            (Ranking::Fuzzy, Some(matcher)) => self.ranker.rank_by(&self.query, &self.dataset, matcher, usize::MAX),
            (Ranking::Fuzzy, None) => self.ranker.rank(&self.query, &self.dataset, usize::MAX),
        };
        let normalized = super::matcher::normalize_query(&self.query);
        let mut seen = HashSet::new();
        let candidates = matches
            .into_iter()
            .filter(|(_, item)| seen.insert(item.search_text()))
            .take(self.config.max_results)
            .map(|(index, item)| Suggestion {
                index,
                label: (self.formatter)(item, &normalized),
                value: item.search_text(),
            })
            .collect();

        self.set = SuggestionSet {
            query: self.query.clone(),
            candidates,
            visible: false,
        };
        self.highlight = 0;
        self.update_visibility();
        trace!("suggest: {} candidates for {:?}", self.set.candidates.len(), self.query);
    }

    fn update_visibility(&mut self) {
        let attended = self.focused || self.blur_timer.is_some();
        self.set.visible = attended && !self.set.candidates.is_empty();
    }

    fn clear(&mut self) {
        self.set = SuggestionSet {
            query: self.query.clone(),
            candidates: Vec::new(),
            visible: false,
        };
        self.highlight = 0;
    }
}
