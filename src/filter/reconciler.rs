use super::navigation::NavigationStore;
use super::state::{FilterPatch, FilterState, PAGE_KEY};
use crate::clock::{Scheduler, TimerId};
use crate::config::duration_ms;
use crate::debounce::Debouncer;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

/// When free-text search edits reach the committed filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SearchPolicy {
    /// Only on Enter / explicit search action.
    Explicit,
    /// After a quiet period following the last keystroke.
    Debounced {
        #[serde(with = "duration_ms")]
        delay: Duration,
    },
}

impl Default for SearchPolicy {
    fn default() -> Self {
        SearchPolicy::Debounced {
            delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Navigation key bound to the free-text input.
    pub search_key: String,
    /// Keys compared by [`changed`]; empty means every key.
    pub watched_keys: Vec<String>,
    pub policy: SearchPolicy,
    pub reset_page_on_change: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            search_key: "search".to_string(),
            watched_keys: vec!["search".to_string(), "status".to_string()],
            policy: SearchPolicy::default(),
            reset_page_on_change: true,
        }
    }
}

/// Whether a load shows the full loading UI or refreshes in the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    Visible,
    Silent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestId(u64);

impl RequestId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// A data load the page must perform for a committed filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadRequest {
    pub id: RequestId,
    pub filter: FilterState,
    pub mode: LoadMode,
    pub changed: BTreeSet<String>,
}

/// Result reported by the data-fetch layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Success { items: usize },
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterTimer {
    SearchDebounce,
}

/// Keys that differ between two committed snapshots, restricted to
/// `watched` (plus `page`). An empty `watched` list compares every key.
pub fn changed(prev: &FilterState, next: &FilterState, watched: &[String]) -> BTreeSet<String> {
    prev.changed_keys(next)
        .into_iter()
        .filter(|key| key == PAGE_KEY || watched.is_empty() || watched.iter().any(|w| w == key))
        .collect()
}

/// Keeps draft, committed and navigation state consistent for one screen
/// and decides when and how data is (re)loaded.
///
/// The committed filter has exactly one writer: this type. Loads are only
/// ever requested as the result of a committed change.
pub struct FilterReconciler<N: NavigationStore> {
    config: ReconcilerConfig,
    navigation: N,
    committed: FilterState,
    draft_search: String,
    loaded: Option<FilterState>,
    result_empty: bool,
    latest: Option<RequestId>,
    next_request: u64,
    debounce: Debouncer,
    alive: bool,
}

impl<N: NavigationStore> FilterReconciler<N> {
    pub fn new(config: ReconcilerConfig, navigation: N) -> Self {
        let committed = FilterState::from_pairs(&navigation.read());
        let draft_search = committed.get(&config.search_key).unwrap_or_default().to_string();
        Self {
            config,
            navigation,
            committed,
            draft_search,
            loaded: None,
            result_empty: true,
            latest: None,
            next_request: 1,
            debounce: Debouncer::new(),
            alive: true,
        }
    }

    pub fn committed(&self) -> &FilterState {
        &self.committed
    }

    pub fn draft_search(&self) -> &str {
        &self.draft_search
    }

    /// Whether the draft search text differs from the committed one.
    pub fn is_dirty(&self) -> bool {
        self.committed.get(&self.config.search_key).unwrap_or_default() != self.draft_search
    }

    pub fn navigation(&self) -> &N {
        &self.navigation
    }

    pub fn navigation_mut(&mut self) -> &mut N {
        &mut self.navigation
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn latest_request(&self) -> Option<RequestId> {
        self.latest
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// First load for the screen (or a forced reload of the committed
    /// filter when it changed since the last load).
    pub fn open(&mut self) -> Option<LoadRequest> {
        if !self.alive {
            return None;
        }
        self.reconcile()
    }

    /// Merge a partial change into the committed filter, write it to
    /// navigation once, and request a load if anything changed.
    pub fn update_filter<T>(&mut self, patch: FilterPatch, sched: &mut Scheduler<T>) -> Option<LoadRequest> {
        if !self.alive || patch.is_empty() {
            return None;
        }

        let next = self.committed.apply(&patch, self.config.reset_page_on_change);
        if next == self.committed {
            debug!("filter: patch produced no change");
            return None;
        }

        self.committed = next;
        if patch.touches(&self.config.search_key) {
            self.debounce.cancel(sched);
            self.draft_search = self
                .committed
                .get(&self.config.search_key)
                .unwrap_or_default()
                .to_string();
        }
        self.navigation.push(self.committed.to_pairs());
        self.reconcile()
    }

    /// A keystroke in the search input. Only the draft changes; with the
    /// debounced policy the quiet-period timer is restarted.
    pub fn edit_search<T>(&mut self, text: impl Into<String>, sched: &mut Scheduler<T>)
    where
        T: From<FilterTimer>,
    {
        if !self.alive {
            return;
        }
        self.draft_search = text.into();
        if let SearchPolicy::Debounced { delay } = self.config.policy {
            self.debounce.trigger(sched, delay, FilterTimer::SearchDebounce.into());
        }
    }

    /// Explicit search action (Enter, search button, suggestion pick).
    pub fn submit<T>(&mut self, sched: &mut Scheduler<T>) -> Option<LoadRequest> {
        if !self.alive {
            return None;
        }
        self.debounce.cancel(sched);
        let patch = FilterPatch::new().set(self.config.search_key.clone(), self.draft_search.clone());
        self.update_filter(patch, sched)
    }

    /// Replace the draft and commit it in one step.
    pub fn submit_text<T>(&mut self, text: impl Into<String>, sched: &mut Scheduler<T>) -> Option<LoadRequest> {
        if !self.alive {
            return None;
        }
        self.draft_search = text.into();
        self.submit(sched)
    }

    pub fn on_timer<T>(&mut self, id: TimerId, timer: FilterTimer, sched: &mut Scheduler<T>) -> Option<LoadRequest> {
        if !self.alive {
            return None;
        }
        match timer {
            FilterTimer::SearchDebounce => {
                if !self.debounce.accept(id) {
                    return None;
                }
                debug!("filter: search quiet period elapsed, committing {:?}", self.draft_search);
                let patch = FilterPatch::new().set(self.config.search_key.clone(), self.draft_search.clone());
                self.update_filter(patch, sched)
            }
        }
    }

    /// Adopt a navigation change made outside the reconciler (back/forward,
    /// deep link). The draft is reset from the new committed value and
    /// navigation is not written again.
    pub fn sync_from_navigation<T>(&mut self, sched: &mut Scheduler<T>) -> Option<LoadRequest> {
        if !self.alive {
            return None;
        }
        let external = FilterState::from_pairs(&self.navigation.read());
        if external == self.committed {
            return None;
        }
        self.debounce.cancel(sched);
        self.committed = external;
        self.draft_search = self
            .committed
            .get(&self.config.search_key)
            .unwrap_or_default()
            .to_string();
        info!("filter: adopted external navigation state");
        self.reconcile()
    }

    /// Background re-validation of the committed filter.
    pub fn refresh(&mut self) -> Option<LoadRequest> {
        if !self.alive {
            return None;
        }
        let mode = if self.loaded.is_none() || self.result_empty {
            LoadMode::Visible
        } else {
            LoadMode::Silent
        };
        Some(self.issue(BTreeSet::new(), mode))
    }

    /// Report a finished load. Only the most recent request is accepted;
    /// responses to superseded requests are dropped.
    pub fn resolve(&mut self, id: RequestId, outcome: LoadOutcome) -> bool {
        if !self.alive {
            return false;
        }
        if self.latest != Some(id) {
            debug!("filter: dropping response for superseded {}", id);
            return false;
        }
        if let LoadOutcome::Success { items } = outcome {
            self.result_empty = items == 0;
        }
        true
    }

    /// Tear down: cancel timers; every later call is a no-op.
    pub fn teardown<T>(&mut self, sched: &mut Scheduler<T>) {
        if !self.alive {
            return;
        }
        self.debounce.cancel(sched);
        self.alive = false;
        debug!("filter: torn down");
    }

    /// Load-gating rule: visible on first load, on any non-page change, or
    /// when nothing is currently displayed.
    pub fn load_mode(&self, changed: &BTreeSet<String>) -> LoadMode {
        let content_changed = changed.iter().any(|key| key != PAGE_KEY);
        if self.loaded.is_none() || content_changed || self.result_empty {
            LoadMode::Visible
        } else {
            LoadMode::Silent
        }
    }

    fn reconcile(&mut self) -> Option<LoadRequest> {
        let changed = match &self.loaded {
            None => self.committed.changed_keys(&FilterState::default()),
            Some(prev) if *prev == self.committed => return None,
            Some(prev) => changed(prev, &self.committed, &self.config.watched_keys),
        };
        let mode = self.load_mode(&changed);
        Some(self.issue(changed, mode))
    }

    fn issue(&mut self, changed: BTreeSet<String>, mode: LoadMode) -> LoadRequest {
        let id = RequestId(self.next_request);
        self.next_request += 1;
        self.latest = Some(id);
        self.loaded = Some(self.committed.clone());
        let request = LoadRequest {
            id,
            filter: self.committed.clone(),
            mode,
            changed,
        };
        info!(
            "filter: {} {:?} load for ?{}",
            id,
            mode,
            super::navigation::to_query_string(&request.filter.to_pairs())
        );
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::navigation::MemoryNavigation;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn reconciler(policy: SearchPolicy) -> FilterReconciler<MemoryNavigation> {
        let config = ReconcilerConfig {
            policy,
            ..ReconcilerConfig::default()
        };
        FilterReconciler::new(config, MemoryNavigation::new())
    }

    fn debounced(delay: u64) -> SearchPolicy {
        SearchPolicy::Debounced { delay: ms(delay) }
    }

    fn pump(
        filter: &mut FilterReconciler<MemoryNavigation>,
        sched: &mut Scheduler<FilterTimer>,
        until: Duration,
    ) -> Vec<LoadRequest> {
        let mut loads = Vec::new();
        while let Some(fired) = sched.pop_due(until) {
            loads.extend(filter.on_timer(fired.id, fired.payload, sched));
        }
        sched.advance_to(until);
        loads
    }

    #[test]
    fn test_first_load_is_visible() {
        let mut filter = reconciler(SearchPolicy::Explicit);
        let load = filter.open().expect("initial load");
        assert_eq!(load.mode, LoadMode::Visible);
        assert!(filter.open().is_none());
    }

    #[test]
    fn test_update_filter_writes_navigation_once() {
        let mut sched: Scheduler<FilterTimer> = Scheduler::new();
        let mut filter = reconciler(SearchPolicy::Explicit);
        filter.open();

        let load = filter
            .update_filter(FilterPatch::new().set("status", "approved").page(1), &mut sched)
            .expect("load");

        assert_eq!(load.filter.to_pairs(), filter.navigation().read());
        assert_eq!(filter.navigation().query_string(), "page=1&status=approved");
        assert_eq!(filter.navigation().write_count(), 1);
        assert_eq!(load.changed.iter().collect::<Vec<_>>(), vec!["status"]);

        assert!(filter
            .update_filter(FilterPatch::new().set("status", "approved"), &mut sched)
            .is_none());
        assert_eq!(filter.navigation().write_count(), 1);

        filter.update_filter(FilterPatch::new().set("status", ""), &mut sched);
        assert_eq!(filter.navigation().query_string(), "page=1");
    }

    #[test]
    fn test_debounce_collapses_keystrokes_into_one_commit() {
        let mut sched: Scheduler<FilterTimer> = Scheduler::new();
        let mut filter = reconciler(debounced(300));
        filter.open();

        filter.edit_search("a", &mut sched);
        sched.advance_to(ms(100));
        filter.edit_search("ab", &mut sched);
        sched.advance_to(ms(200));
        filter.edit_search("abc", &mut sched);

        let loads = pump(&mut filter, &mut sched, ms(2000));
        assert_eq!(loads.len(), 1);
        assert_eq!(loads[0].filter.get("search"), Some("abc"));
        assert_eq!(filter.navigation().write_count(), 1);
        assert!(!filter.is_dirty());
    }

    #[test]
    fn test_explicit_policy_waits_for_submit() {
        let mut sched: Scheduler<FilterTimer> = Scheduler::new();
        let mut filter = reconciler(SearchPolicy::Explicit);
        filter.open();

        filter.edit_search("ibuprofen", &mut sched);
        assert!(pump(&mut filter, &mut sched, ms(5000)).is_empty());
        assert!(filter.is_dirty());
        assert_eq!(filter.committed().get("search"), None);

        let load = filter.submit(&mut sched).expect("commit");
        assert_eq!(load.filter.get("search"), Some("ibuprofen"));
        assert_eq!(load.mode, LoadMode::Visible);
    }

    #[test]
    fn test_page_only_change_is_silent_when_results_shown() {
        let mut sched: Scheduler<FilterTimer> = Scheduler::new();
        let mut filter = reconciler(SearchPolicy::Explicit);
        let first = filter.open().expect("load");
        filter.resolve(first.id, LoadOutcome::Success { items: 20 });

        let load = filter.update_filter(FilterPatch::new().page(2), &mut sched).expect("load");
        assert_eq!(load.mode, LoadMode::Silent);

        filter.resolve(load.id, LoadOutcome::Success { items: 0 });
        let load = filter.update_filter(FilterPatch::new().page(3), &mut sched).expect("load");
        assert_eq!(load.mode, LoadMode::Visible);
    }

    #[test]
    fn test_refresh_is_silent_after_content_loaded() {
        let mut filter = reconciler(SearchPolicy::Explicit);
        assert_eq!(filter.refresh().map(|l| l.mode), Some(LoadMode::Visible));
        let latest = filter.latest_request().expect("request");
        filter.resolve(latest, LoadOutcome::Success { items: 3 });
        assert_eq!(filter.refresh().map(|l| l.mode), Some(LoadMode::Silent));
    }

    #[test]
    fn test_last_write_wins() {
        let mut sched: Scheduler<FilterTimer> = Scheduler::new();
        let mut filter = reconciler(SearchPolicy::Explicit);
        filter.open();

        let first = filter
            .update_filter(FilterPatch::new().set("status", "pending"), &mut sched)
            .expect("load");
        let second = filter
            .update_filter(FilterPatch::new().set("status", "approved"), &mut sched)
            .expect("load");

        assert!(second.id > first.id);
        assert!(!filter.resolve(first.id, LoadOutcome::Success { items: 4 }));
        assert!(filter.resolve(second.id, LoadOutcome::Success { items: 2 }));
    }

    #[test]
    fn test_back_navigation_resets_draft_without_writing() {
        let mut sched: Scheduler<FilterTimer> = Scheduler::new();
        let mut filter = reconciler(debounced(300));
        filter.open();
        filter.submit_text("amox", &mut sched);
        filter.submit_text("ibu", &mut sched);
        filter.edit_search("ibupro", &mut sched);
        let writes = filter.navigation().write_count();

        assert!(filter.navigation_mut().back());
        let load = filter.sync_from_navigation(&mut sched).expect("load");

        assert_eq!(load.filter.get("search"), Some("amox"));
        assert_eq!(filter.draft_search(), "amox");
        assert_eq!(filter.navigation().write_count(), writes);
        // The pending keystroke commit was dropped with the old draft.
        assert!(pump(&mut filter, &mut sched, ms(2000)).is_empty());
    }

    #[test]
    fn test_no_writes_after_teardown() {
        let mut sched: Scheduler<FilterTimer> = Scheduler::new();
        let mut filter = reconciler(debounced(300));
        let first = filter.open().expect("load");
        filter.edit_search("para", &mut sched);
        filter.teardown(&mut sched);

        assert_eq!(sched.pending(), 0);
        assert!(pump(&mut filter, &mut sched, ms(1000)).is_empty());
        assert!(filter.submit(&mut sched).is_none());
        assert!(!filter.resolve(first.id, LoadOutcome::Success { items: 1 }));
        assert_eq!(filter.committed().get("search"), None);
        assert_eq!(filter.navigation().write_count(), 0);
        filter.teardown(&mut sched);
    }

    #[test]
    fn test_changed_predicate_respects_watched_keys() {
        let prev = FilterState::new().with("status", "pending").with("holder", "acme");
        let next = FilterState::new().with("status", "approved").with("holder", "medco").with_page(2);
        let watched = vec!["search".to_string(), "status".to_string()];

        let keys: Vec<String> = changed(&prev, &next, &watched).into_iter().collect();
        assert_eq!(keys, vec!["page", "status"]);
        assert_eq!(changed(&prev, &next, &[]).len(), 3);
    }

    #[test]
    fn test_deep_link_seeds_committed_and_draft() {
        let nav = MemoryNavigation::from_query("?search=insulin&page=2");
        let mut filter = FilterReconciler::new(ReconcilerConfig::default(), nav);
        assert_eq!(filter.draft_search(), "insulin");
        assert_eq!(filter.committed().page(), 2);
        assert_eq!(filter.open().map(|l| l.mode), Some(LoadMode::Visible));
    }
}
