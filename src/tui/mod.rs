//! Terminal demo of the feedback engine.

pub mod app;
pub mod layout;
pub mod theme;
pub mod view;

pub use app::DemoApp;
pub use theme::Theme;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{self as term, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::{Backend, CrosstermBackend},
};
use std::io;
use std::time::{Duration, Instant};

const FRAME: Duration = Duration::from_millis(16);

pub async fn launch(app: &mut DemoApp) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, app).await;
    app.teardown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

async fn run<B: Backend>(terminal: &mut Terminal<B>, app: &mut DemoApp) -> Result<()> {
    let theme = Theme::default();
    let (width, height) = term::size()?;
    app.start(width, height);

    loop {
        let frame_start = Instant::now();

        // Drain input first for minimal latency
        let mut should_quit = false;
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(key) => {
                    if !app.handle_key(key) {
                        should_quit = true;
                        break;
                    }
                }
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                Event::Resize(width, height) => app.resize(width, height),
                _ => {}
            }
        }

        if should_quit {
            break;
        }

        app.poll();

        terminal.draw(|frame| view::render(frame, app, &theme))?;

        // Sleep for remainder of the frame
        if let Some(remaining) = FRAME.checked_sub(frame_start.elapsed()) {
            tokio::time::sleep(remaining).await;
        }
    }

    Ok(())
}
