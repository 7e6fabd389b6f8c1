use super::app::{DemoApp, Focus, STAGE_LABELS};
use super::layout::{self, Areas, MARKER_WIDTH};
use super::theme::Theme;
use crate::motion::{MarkerState, TrackStatus};
use ratatui::{
    Frame,
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Row, Table},
};

pub fn render(frame: &mut Frame, app: &DemoApp, theme: &Theme) {
    let areas = layout::areas(frame.area());

    render_title(frame, areas.title, theme);
    render_search(frame, &areas, app, theme);
    render_status(frame, areas.status, app, theme);
    render_progress(frame, areas.progress, app, theme);
    render_table(frame, areas.table, app, theme);
    render_tracking(frame, areas.tracking, app, theme);
    render_help(frame, areas.help, theme);

    // overlay last so it draws over the table
    render_suggestions(frame, app, theme);
}

fn render_title(frame: &mut Frame, area: Rect, theme: &Theme) {
    let title = Line::from(vec![
        Span::styled("PharmaTrack", Style::default().fg(theme.blue).add_modifier(Modifier::BOLD)),
        Span::styled(" · shipments", theme.muted_style()),
    ]);
    frame.render_widget(Paragraph::new(title), area);
}

fn render_search(frame: &mut Frame, areas: &Areas, app: &DemoApp, theme: &Theme) {
    let focused = app.focus() == Focus::Search;
    let filter = app.screen().filter();
    let title = if filter.is_dirty() {
        " Search (drug, batch, holder) • pending "
    } else {
        " Search (drug, batch, holder) "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(theme.border_style(focused));

    let mut spans = vec![Span::styled(filter.draft_search().to_string(), Style::default().fg(theme.text))];
    if focused {
        spans.push(Span::styled("▏", Style::default().fg(theme.lavender)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), areas.search);
}

fn render_status(frame: &mut Frame, area: Rect, app: &DemoApp, theme: &Theme) {
    let committed = app.screen().filter().committed();
    let status = app
        .status()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "All".to_string());

    let mut spans = vec![
        Span::styled(format!("Status: {}", status), theme.info_style()),
        Span::styled(
            format!("  Page {}/{}  {} shipments  ", committed.page(), app.page_count(), app.total()),
            Style::default().fg(theme.subtext0),
        ),
        Span::styled(
            format!("?{}", crate::filter::to_query_string(&committed.to_pairs())),
            theme.muted_style(),
        ),
    ];
    if let Some(error) = app.last_error() {
        spans.push(Span::styled(format!("  {}", error), theme.error_style()));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_progress(frame: &mut Frame, area: Rect, app: &DemoApp, theme: &Theme) {
    let progress = app.screen().progress();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_style(false));

    if app.screen().is_loading_visible() {
        let gauge = Gauge::default()
            .block(block.title(" Loading "))
            .gauge_style(Style::default().fg(theme.peach).bg(theme.surface0))
            .ratio(progress.value())
            .label(format!("{}%", progress.percent()));
        frame.render_widget(gauge, area);
    } else {
        let idle = Paragraph::new(Span::styled("Up to date", theme.success_style())).block(block);
        frame.render_widget(idle, area);
    }
}

fn render_table(frame: &mut Frame, area: Rect, app: &DemoApp, theme: &Theme) {
    let header = Row::new(vec!["ID", "Drug", "Batch", "Holder", "Status"])
        .style(Style::default().fg(theme.subtext0).add_modifier(Modifier::BOLD));

    let rows = app.rows().iter().map(|s| {
        Row::new(vec![
            s.id.clone(),
            s.drug.clone(),
            s.batch_code.clone(),
            s.holder.clone(),
            s.status.to_string(),
        ])
        .style(Style::default().fg(theme.text))
    });

    let widths = [
        Constraint::Length(9),
        Constraint::Percentage(30),
        Constraint::Length(9),
        Constraint::Percentage(35),
        Constraint::Length(12),
    ];
    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Shipments ")
            .border_style(theme.border_style(app.focus() == Focus::List)),
    );
    frame.render_widget(table, area);
}

fn marker_style(state: MarkerState, theme: &Theme) -> Style {
    match state {
        MarkerState::Pending => Style::default().fg(theme.overlay0),
        MarkerState::Lit => Style::default().fg(theme.yellow).add_modifier(Modifier::BOLD),
        MarkerState::Done => Style::default().fg(theme.green),
        MarkerState::Error => Style::default().fg(theme.red).add_modifier(Modifier::BOLD),
    }
}

fn render_tracking(frame: &mut Frame, area: Rect, app: &DemoApp, theme: &Theme) {
    let motion = app.screen().motion();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Tracking SHP-1000 ")
        .border_style(theme.border_style(false));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let offset = motion.offset().round().max(0.0) as usize;
    let track_width = inner.width as usize;
    let trail = "━".repeat(offset.min(track_width));
    let rest = "─".repeat(track_width.saturating_sub(offset + MARKER_WIDTH as usize));
    let truck_style = match motion.status() {
        TrackStatus::Failed => theme.error_style(),
        TrackStatus::Completed => theme.success_style(),
        TrackStatus::Ramping => Style::default().fg(theme.peach),
    };
    let road = Line::from(vec![
        Span::styled(trail, Style::default().fg(theme.surface1)),
        Span::styled("[▶]", truck_style),
        Span::styled(rest, Style::default().fg(theme.overlay0)),
    ]);

    let markers = motion.markers();
    let mut stage_spans = Vec::new();
    for (label, state) in STAGE_LABELS.iter().zip(markers) {
        let glyph = match state {
            MarkerState::Pending => "○",
            MarkerState::Lit => "◉",
            MarkerState::Done => "●",
            MarkerState::Error => "✗",
        };
        stage_spans.push(Span::styled(format!("{} {}   ", glyph, label), marker_style(state, theme)));
    }

    let summary = match motion.status() {
        TrackStatus::Ramping => format!("{:.0}% confirmed", motion.rendered() * 100.0),
        TrackStatus::Completed => "Delivered and verified".to_string(),
        TrackStatus::Failed => "Verification failed".to_string(),
    };

    let lines = vec![
        road,
        Line::from(stage_spans),
        Line::from(Span::styled(summary, Style::default().fg(theme.subtext0))),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_help(frame: &mut Frame, area: Rect, theme: &Theme) {
    let help = "Tab focus · ↑↓ Enter pick · s status · r refresh · PgUp/PgDn page · F2 confirm · F3 fail · Alt+←/→ history · Ctrl+Q quit";
    frame.render_widget(Paragraph::new(Span::styled(help, theme.muted_style())), area);
}

fn render_suggestions(frame: &mut Frame, app: &DemoApp, theme: &Theme) {
    let suggestions = app.screen().suggestions();
    let Some(placement) = suggestions.placement() else {
        return;
    };
    let area = layout::to_rect(placement.bounds, frame.area());
    if area.is_empty() {
        return;
    }

    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.overlay1))
        .style(Style::default().bg(theme.base));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let highlighted = suggestions.highlighted();
    let lines: Vec<Line> = suggestions
        .set()
        .candidates
        .iter()
        .enumerate()
        .take(inner.height as usize)
        .map(|(idx, candidate)| {
            if Some(idx) == highlighted {
                Line::styled(
                    format!("> {}", candidate.label),
                    Style::default().fg(theme.text).bg(theme.surface0),
                )
            } else {
                Line::styled(format!("  {}", candidate.label), Style::default().fg(theme.text))
            }
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}
