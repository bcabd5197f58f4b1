use crate::selection::monitor::DisplayInfo;
use crate::selection::overlay::{ContentMessage, OverlayWindow};
use crate::selection::types::{LogicalPoint, Size};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;

/// Square expanded overlay, centred horizontally on the cursor's display and
/// pushed towards its upper part.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpandedGeometry {
    #[serde(default = "default_size")]
    pub size: i32,
    /// Fraction of the display height above the overlay's top edge.
    #[serde(default = "default_vertical_ratio")]
    pub vertical_ratio: f64,
}

fn default_size() -> i32 {
    600
}

fn default_vertical_ratio() -> f64 {
    0.3
}

impl Default for ExpandedGeometry {
    fn default() -> Self {
        Self {
            size: default_size(),
            vertical_ratio: default_vertical_ratio(),
        }
    }
}

impl ExpandedGeometry {
    /// Origin and size on `display`, in logical units.
    pub fn frame(&self, display: &DisplayInfo) -> Option<(LogicalPoint, Size)> {
        if !(display.scale_factor.is_finite() && display.scale_factor > 0.0) {
            return None;
        }
        let bounds = display.logical_bounds();
        let side = self.size.min(bounds.width).min(bounds.height);
        if side <= 0 {
            return None;
        }
        let x = bounds.left() + ((bounds.width - side) as f64 / 2.0).ceil() as i32;
        let y = bounds.top() + (bounds.height as f64 * self.vertical_ratio).ceil() as i32;
        let y = y.min(bounds.bottom() - side);
        Some((LogicalPoint::new(x, y), Size::new(side, side)))
    }
}

/// Owns the expanded overlay. Payloads wait until its content reports ready.
pub struct ExpandedSpawner {
    window: Box<dyn OverlayWindow>,
    geometry: ExpandedGeometry,
    ready: bool,
    pending: VecDeque<ContentMessage>,
}

impl ExpandedSpawner {
    pub fn new(window: Box<dyn OverlayWindow>, geometry: ExpandedGeometry) -> Self {
        Self {
            window,
            geometry,
            ready: false,
            pending: VecDeque::new(),
        }
    }

    /// Show the overlay on `display` and hand it the chosen action and the
    /// captured text.
    pub fn open(&mut self, display: &DisplayInfo, action: Value, text: &str) {
        match self.geometry.frame(display) {
            Some((origin, size)) => self.window.set_bounds(origin, size, display.scale_factor),
            None => {
                let shown = display;
                tracing::debug!(
                    display = ?shown,
                    "no usable display area for the expanded overlay"
                );
                return;
            }
        }
        self.window.show_inactive();
        self.pending.push_back(ContentMessage::app(action));
        self.pending.push_back(ContentMessage::submit(text));
        self.flush();
    }

    pub fn mark_ready(&mut self) {
        self.ready = true;
        self.flush();
    }

    pub fn close(&mut self) {
        self.window.hide();
    }

    pub fn is_visible(&self) -> bool {
        self.window.is_visible()
    }

    pub fn teardown(&mut self) {
        self.pending.clear();
        self.window.hide();
        self.window.destroy();
    }

    fn flush(&mut self) {
        if !self.ready {
            return;
        }
        while let Some(message) = self.pending.pop_front() {
            self.window.send(message);
        }
    }
}
