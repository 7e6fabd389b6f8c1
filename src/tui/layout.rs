use crate::motion::Track;
use crate::suggest::{Bounds, Viewport};
use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Cells taken by the truck glyph on the tracking line.
pub const MARKER_WIDTH: u16 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Areas {
    pub title: Rect,
    pub search: Rect,
    pub status: Rect,
    pub progress: Rect,
    pub table: Rect,
    pub tracking: Rect,
    pub help: Rect,
}

pub fn areas(area: Rect) -> Areas {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(area);

    Areas {
        title: chunks[0],
        search: chunks[1],
        status: chunks[2],
        progress: chunks[3],
        table: chunks[4],
        tracking: chunks[5],
        help: chunks[6],
    }
}

pub fn to_bounds(rect: Rect) -> Bounds {
    Bounds::new(rect.x as f64, rect.y as f64, rect.width as f64, rect.height as f64)
}

/// Overlay bounds back to cells, clipped to the frame.
pub fn to_rect(bounds: Bounds, frame: Rect) -> Rect {
    let rect = Rect {
        x: bounds.x.max(0.0) as u16,
        y: bounds.y.max(0.0) as u16,
        width: bounds.width.max(0.0) as u16,
        height: bounds.height.max(0.0) as u16,
    };
    rect.intersection(frame)
}

/// Anchor inputs for a terminal of `width` x `height` cells.
pub fn anchors(width: u16, height: u16) -> (Bounds, Viewport, Track) {
    let areas = areas(Rect::new(0, 0, width, height));
    let track_width = areas.tracking.width.saturating_sub(2);
    (
        to_bounds(areas.search),
        Viewport::new(width as f64, height as f64),
        Track::new(track_width as f64, MARKER_WIDTH as f64),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchors_follow_terminal_size() {
        let (input, viewport, track) = anchors(100, 40);
        assert_eq!(input, Bounds::new(0.0, 1.0, 100.0, 3.0));
        assert_eq!(viewport, Viewport::new(100.0, 40.0));
        assert_eq!(track.width, 98.0);
    }

    #[test]
    fn test_to_rect_clips_to_frame() {
        let frame = Rect::new(0, 0, 80, 24);
        let rect = to_rect(Bounds::new(70.0, 20.0, 30.0, 10.0), frame);
        assert_eq!(rect, Rect::new(70, 20, 10, 4));
    }
}
