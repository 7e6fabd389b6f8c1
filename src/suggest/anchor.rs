//! Overlay placement for the suggestion list.
//!
//! The list is drawn outside normal layout and anchored to the input's live
//! bounding box. Coordinates are viewport-relative (pixels in a browser,
//! cells in the terminal demo).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Below,
    Above,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub bounds: Bounds,
    pub side: Side,
    pub row_height: f64,
}

impl Placement {
    /// Row under a viewport point, if the point is on a candidate row.
    pub fn row_at(&self, x: f64, y: f64, rows: usize, chrome: f64) -> Option<usize> {
        if !self.bounds.contains(x, y) || self.row_height <= 0.0 {
            return None;
        }
        let offset = y - self.bounds.y - chrome / 2.0;
        if offset < 0.0 {
            return None;
        }
        let row = (offset / self.row_height) as usize;
        (row < rows).then_some(row)
    }
}

/// Place a list of `rows` directly below the input when it fits inside the
/// viewport, above it otherwise. The list always matches the input's width;
/// `chrome` is the extra height taken by borders or padding.
pub fn place_overlay(input: Bounds, viewport: Viewport, rows: usize, row_height: f64, chrome: f64) -> Placement {
    let height = rows as f64 * row_height + chrome;
    let (y, side) = if input.bottom() + height <= viewport.height {
        (input.bottom(), Side::Below)
    } else {
        ((input.y - height).max(0.0), Side::Above)
    };
    let x = input.x.min((viewport.width - input.width).max(0.0)).max(0.0);

    Placement {
        bounds: Bounds::new(x, y, input.width, height),
        side,
        row_height,
    }
}
