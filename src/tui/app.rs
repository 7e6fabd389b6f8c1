use super::layout;
use crate::catalog::{Shipment, ShipmentStatus};
use crate::config::EngineConfig;
use crate::driver::{self, DataSource, LoadPump, WallClock};
use crate::filter::{FilterPatch, MemoryNavigation};
use crate::logging;
use crate::screen::{ListScreen, ScreenEvent, SuggestKey};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use log::{debug, info};
use ratatui::layout::{Position, Rect};
use std::sync::Arc;

pub const PAGE_SIZE: usize = 10;

/// Confirmation stages of the tracked shipment.
pub const STAGE_LABELS: [&str; 4] = ["Submitted", "Mined", "Confirmed", "Finalized"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Search,
    List,
}

/// Shipment list demo: a search box with suggestions, a status selector,
/// paging, and a tracked shipment whose confirmations arrive on F2.
pub struct DemoApp {
    screen: ListScreen<Shipment, MemoryNavigation>,
    pump: LoadPump<Shipment>,
    clock: WallClock,
    rows: Vec<Shipment>,
    total: usize,
    focus: Focus,
    status: Option<ShipmentStatus>,
    confirmations: usize,
    last_error: Option<String>,
    search_area: Rect,
}

impl DemoApp {
    pub fn new(config: &EngineConfig, source: Arc<dyn DataSource<Shipment>>, dataset: Vec<Shipment>) -> Self {
        Self {
            screen: ListScreen::new(config, MemoryNavigation::new(), dataset),
            pump: LoadPump::new(source),
            clock: WallClock::new(),
            rows: Vec::new(),
            total: 0,
            focus: Focus::Search,
            status: None,
            confirmations: 0,
            last_error: None,
            search_area: Rect::default(),
        }
    }

    pub fn screen(&self) -> &ListScreen<Shipment, MemoryNavigation> {
        &self.screen
    }

    pub fn rows(&self) -> &[Shipment] {
        &self.rows
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn status(&self) -> Option<ShipmentStatus> {
        self.status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn page_count(&self) -> u32 {
        self.total.div_ceil(PAGE_SIZE).max(1) as u32
    }

    /// First load plus initial focus and anchors.
    pub fn start(&mut self, width: u16, height: u16) {
        self.resize(width, height);
        self.screen.focus_search();
        self.screen.open();
        self.flush_events();
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        let (input, viewport, track) = layout::anchors(width, height);
        self.search_area = layout::areas(Rect::new(0, 0, width, height)).search;
        self.screen.viewport_changed(input, viewport, track);
    }

    /// Returns false when the app wants to quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return true;
        }
        if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return false;
        }

        match (key.code, key.modifiers.contains(KeyModifiers::ALT)) {
            (KeyCode::Left, true) => self.history(false),
            (KeyCode::Right, true) => self.history(true),
            (KeyCode::F(2), _) => self.confirm_stage(),
            (KeyCode::F(3), _) => self.screen.track_failed(),
            (KeyCode::Tab, _) => self.toggle_focus(),
            _ => match self.focus {
                Focus::Search => self.search_key(key.code),
                Focus::List => self.list_key(key.code),
            },
        }
        self.flush_events();
        true
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let (x, y) = (mouse.column as f64, mouse.row as f64);

        // mousedown on the list blurs the input before the click lands
        if let Some(index) = self.screen.suggestions().row_at(x, y) {
            self.screen.blur_search();
            self.screen.select_suggestion(index);
            self.focus = Focus::List;
        } else if self.search_hit(mouse.column, mouse.row) {
            self.set_focus(Focus::Search);
        } else {
            self.set_focus(Focus::List);
        }
        self.flush_events();
    }

    /// Drive timers and collect finished loads. Called once per frame.
    pub fn poll(&mut self) {
        self.clock.drive(&mut self.screen);
        while let Some(result) = self.pump.try_next() {
            let is_latest = self.screen.filter().latest_request() == Some(result.id);
            let error = result.page.as_ref().err().map(|err| format!("{:#}", err));
            match driver::deliver(&mut self.screen, result) {
                Some(page) => {
                    self.rows = page.items;
                    self.total = page.total;
                    self.last_error = None;
                }
                None if is_latest => self.last_error = error,
                None => {}
            }
        }
        self.flush_events();
    }

    pub fn teardown(&mut self) {
        self.screen.teardown();
        self.pump.cancel_all();
        info!("demo: screen closed");
    }

    fn search_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char(c) => {
                let mut text = self.screen.filter().draft_search().to_string();
                text.push(c);
                self.screen.type_search(&text);
            }
            KeyCode::Backspace => {
                let mut text = self.screen.filter().draft_search().to_string();
                text.pop();
                self.screen.type_search(&text);
            }
            KeyCode::Up => {
                self.screen.suggestion_key(SuggestKey::Up);
            }
            KeyCode::Down => {
                self.screen.suggestion_key(SuggestKey::Down);
            }
            KeyCode::Enter => {
                self.screen.suggestion_key(SuggestKey::Enter);
            }
            KeyCode::Esc => {
                if !self.screen.suggestion_key(SuggestKey::Esc) {
                    self.set_focus(Focus::List);
                }
            }
            _ => {}
        }
    }

    fn list_key(&mut self, code: KeyCode) {
        let page = self.screen.filter().committed().page();
        match code {
            KeyCode::Char('s') => self.cycle_status(),
            KeyCode::Char('r') => self.screen.refresh(),
            KeyCode::Char('/') => self.set_focus(Focus::Search),
            KeyCode::PageDown | KeyCode::Right if page < self.page_count() => self.screen.set_page(page + 1),
            KeyCode::PageUp | KeyCode::Left if page > 1 => self.screen.set_page(page - 1),
            _ => {}
        }
    }

    fn toggle_focus(&mut self) {
        let next = match self.focus {
            Focus::Search => Focus::List,
            Focus::List => Focus::Search,
        };
        self.set_focus(next);
    }

    fn set_focus(&mut self, focus: Focus) {
        if focus == self.focus {
            return;
        }
        match focus {
            Focus::Search => self.screen.focus_search(),
            Focus::List => self.screen.blur_search(),
        }
        self.focus = focus;
    }

    fn cycle_status(&mut self) {
        self.status = ShipmentStatus::next(self.status);
        debug!("demo: status filter {:?}", self.status);
        self.screen
            .set_filter(FilterPatch::new().set_opt("status", self.status.map(|s| s.key())));
    }

    fn confirm_stage(&mut self) {
        if self.confirmations >= STAGE_LABELS.len() {
            return;
        }
        self.confirmations += 1;
        if self.confirmations == STAGE_LABELS.len() {
            self.screen.track_completed();
        } else {
            self.screen.track_progress(self.confirmations as f64 * 0.25);
        }
    }

    fn history(&mut self, forward: bool) {
        let moved = if forward {
            self.screen.navigation_mut().forward()
        } else {
            self.screen.navigation_mut().back()
        };
        if moved {
            self.screen.navigation_changed();
            self.status = self
                .screen
                .filter()
                .committed()
                .get("status")
                .and_then(ShipmentStatus::from_key);
        }
    }

    fn search_hit(&self, column: u16, row: u16) -> bool {
        self.search_area.contains(Position { x: column, y: row })
    }

    fn flush_events(&mut self) {
        for event in self.screen.drain_events() {
            logging::screen_event(&event);
            if let ScreenEvent::Load(request) = event {
                self.pump.spawn(&request);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InMemorySource, sample_shipments};
    use crate::motion::{MarkerState, TrackStatus};
    use std::time::Duration;

    fn app() -> DemoApp {
        let source = InMemorySource::new(sample_shipments()).with_latency(Duration::ZERO, Duration::ZERO);
        let mut app = DemoApp::new(&EngineConfig::default(), Arc::new(source), sample_shipments());
        app.start(100, 40);
        app
    }

    fn press(app: &mut DemoApp, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    async fn settle(app: &mut DemoApp, by: Duration) {
        tokio::time::advance(by).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        app.poll();
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_page_loads() {
        let mut app = app();
        settle(&mut app, Duration::from_millis(10)).await;
        assert_eq!(app.rows().len(), PAGE_SIZE);
        assert_eq!(app.total(), 48);
        assert_eq!(app.page_count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_commits_after_quiet_period() {
        let mut app = app();
        for c in "ibu".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        assert_eq!(app.screen().filter().draft_search(), "ibu");
        assert!(app.screen().filter().is_dirty());

        settle(&mut app, Duration::from_millis(600)).await;
        settle(&mut app, Duration::from_millis(10)).await;
        assert!(!app.screen().filter().is_dirty());
        assert!(app.rows().iter().all(|s| s.drug.starts_with("Ibuprofen")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_cycle_and_history() {
        let mut app = app();
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus(), Focus::List);

        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.status(), Some(ShipmentStatus::Manufactured));
        assert_eq!(app.screen().filter().committed().get("status"), Some("manufactured"));

        app.handle_key(KeyEvent::new(KeyCode::Left, KeyModifiers::ALT));
        assert_eq!(app.status(), None);
        app.handle_key(KeyEvent::new(KeyCode::Right, KeyModifiers::ALT));
        assert_eq!(app.status(), Some(ShipmentStatus::Manufactured));
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmations_drive_tracking() {
        let mut app = app();
        press(&mut app, KeyCode::F(2));
        press(&mut app, KeyCode::F(2));
        assert_eq!(app.screen().motion().target(), 0.5);
        assert_eq!(app.screen().motion().markers()[2], MarkerState::Lit);

        press(&mut app, KeyCode::F(2));
        press(&mut app, KeyCode::F(2));
        assert_eq!(app.screen().motion().status(), TrackStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_keeps_rows_without_loader() {
        let mut app = app();
        settle(&mut app, Duration::from_millis(10)).await;
        settle(&mut app, Duration::from_secs(2)).await;
        assert!(!app.screen().is_loading_visible());

        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char('r'));
        assert!(!app.screen().is_loading_visible());
        settle(&mut app, Duration::from_millis(10)).await;
        assert_eq!(app.rows().len(), PAGE_SIZE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ctrl_q_quits() {
        let mut app = app();
        assert!(!app.handle_key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL)));
        app.teardown();
        assert_eq!(app.screen().pending_timers(), 0);
    }
}
