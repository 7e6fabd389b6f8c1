//! Real-time bridge between the virtual scheduler and the outside world.
//!
//! The components only know virtual time. `WallClock` maps tokio's monotonic
//! clock onto it, and `LoadPump` runs fetches for issued load requests as
//! abortable tasks and hands the results back for [`ListScreen::resolved`].
//!
//! [`ListScreen::resolved`]: crate::screen::ListScreen::resolved

use crate::filter::{FilterState, LoadOutcome, LoadRequest, NavigationStore, RequestId};
use crate::logging;
use crate::screen::ListScreen;
use crate::suggest::Searchable;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::{debug, error, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{self, JoinError, JoinSet};
use tokio::time::Instant;

/// One page of results for a committed filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<I> {
    pub items: Vec<I>,
    pub total: usize,
}

impl<I> Page<I> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }
}

/// The fetch layer behind a list screen.
#[async_trait]
pub trait DataSource<I>: Send + Sync {
    async fn fetch(&self, filter: &FilterState) -> Result<Page<I>>;
}

/// Virtual time anchored at construction.
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    epoch: Instant,
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl WallClock {
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.epoch.elapsed()
    }

    /// Run every screen timer due by now.
    pub fn drive<I: Searchable, N: NavigationStore>(&self, screen: &mut ListScreen<I, N>) {
        screen.advance_to(self.elapsed());
    }

    /// Sleep until the screen's next deadline (or `cap`, whichever is
    /// sooner), then drive it.
    pub async fn tick<I: Searchable, N: NavigationStore>(&self, screen: &mut ListScreen<I, N>, cap: Duration) {
        let now = self.elapsed();
        let wait = screen
            .next_deadline()
            .map(|deadline| deadline.saturating_sub(now))
            .unwrap_or(cap)
            .min(cap);
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        self.drive(screen);
    }
}

/// A finished fetch.
#[derive(Debug)]
pub struct LoadResult<I> {
    pub id: RequestId,
    pub page: Result<Page<I>>,
    pub elapsed: Duration,
}

impl<I> LoadResult<I> {
    pub fn outcome(&self) -> LoadOutcome {
        match &self.page {
            Ok(page) => LoadOutcome::Success { items: page.items.len() },
            Err(_) => LoadOutcome::Failure,
        }
    }
}

/// Runs fetches concurrently; results come back in completion order.
///
/// Every fetch is a task in a [`JoinSet`], so in-flight work can be aborted
/// and a fetch that panics is reported as a failed load instead of being
/// lost.
pub struct LoadPump<I> {
    source: Arc<dyn DataSource<I>>,
    tasks: JoinSet<LoadResult<I>>,
    requests: HashMap<task::Id, (RequestId, Instant)>,
}

impl<I: Send + 'static> LoadPump<I> {
    pub fn new(source: Arc<dyn DataSource<I>>) -> Self {
        Self {
            source,
            tasks: JoinSet::new(),
            requests: HashMap::new(),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Start fetching for a request. Must be called inside a tokio runtime.
    pub fn spawn(&mut self, request: &LoadRequest) {
        let source = Arc::clone(&self.source);
        let id = request.id;
        let filter = request.filter.clone();
        let started = Instant::now();
        debug!("driver: fetching {}", id);

        let handle = self.tasks.spawn(async move {
            let page = source.fetch(&filter).await;
            LoadResult {
                id,
                page,
                elapsed: started.elapsed(),
            }
        });
        self.requests.insert(handle.id(), (id, started));
    }

    /// Abort every in-flight fetch. Their results are never delivered.
    pub fn cancel_all(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        debug!("driver: aborting {} in-flight fetches", self.tasks.len());
        self.tasks.abort_all();
        self.tasks.detach_all();
        self.requests.clear();
    }

    /// Next finished fetch without waiting.
    pub fn try_next(&mut self) -> Option<LoadResult<I>> {
        loop {
            let joined = self.tasks.try_join_next_with_id()?;
            if let Some(result) = self.finish(joined) {
                return Some(result);
            }
        }
    }

    /// Wait for the next finished fetch. `None` once nothing is in flight.
    pub async fn next(&mut self) -> Option<LoadResult<I>> {
        loop {
            let joined = self.tasks.join_next_with_id().await?;
            if let Some(result) = self.finish(joined) {
                return Some(result);
            }
        }
    }

    fn finish(&mut self, joined: Result<(task::Id, LoadResult<I>), JoinError>) -> Option<LoadResult<I>> {
        match joined {
            Ok((task_id, result)) => {
                self.requests.remove(&task_id);
                Some(result)
            }
            Err(err) => {
                let (id, started) = self.requests.remove(&err.id())?;
                if err.is_cancelled() {
                    debug!("driver: fetch for {} aborted", id);
                    return None;
                }
                error!("driver: fetch task for {} panicked", id);
                Some(LoadResult {
                    id,
                    page: Err(anyhow!("fetch task for {} panicked", id)),
                    elapsed: started.elapsed(),
                })
            }
        }
    }
}

/// Report a finished fetch to the screen and log it. Returns the page when
/// the screen accepted it.
pub fn deliver<I: Searchable, N: NavigationStore>(
    screen: &mut ListScreen<I, N>,
    result: LoadResult<I>,
) -> Option<Page<I>> {
    let outcome = result.outcome();
    let accepted = screen.resolved(result.id, outcome);
    logging::load_resolved(result.id, outcome, result.elapsed, accepted);
    if !accepted {
        return None;
    }
    match result.page {
        Ok(page) => Some(page),
        Err(err) => {
            warn!("driver: {} failed: {:#}", result.id, err);
            None
        }
    }
}
