//! Geometry of the contextual menu: where it goes relative to a selection.
//!
//! Everything here is pure. Selection points and display bounds arrive in
//! physical pixels and are converted to logical units with the display's
//! scale factor before any comparison, so one code path serves both
//! DPI-virtualizing and uniform-scale platforms.

use crate::selection::monitor::DisplayInfo;
use crate::selection::types::{LogicalPoint, Placement, SelectionSpan, Size};
use serde::{Deserialize, Serialize};

/// Menu window dimensions and its distance to the selection, in logical units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuGeometry {
    #[serde(default = "default_menu_width")]
    pub width: i32,
    /// Height the collapsed menu occupies on screen.
    #[serde(default = "default_realized_height")]
    pub realized_height: i32,
    #[serde(default = "default_offset_above")]
    pub offset_above: i32,
    #[serde(default = "default_offset_below")]
    pub offset_below: i32,
}

fn default_menu_width() -> i32 {
    600
}

fn default_realized_height() -> i32 {
    46
}

fn default_offset_above() -> i32 {
    54
}

fn default_offset_below() -> i32 {
    10
}

impl Default for MenuGeometry {
    fn default() -> Self {
        Self {
            width: default_menu_width(),
            realized_height: default_realized_height(),
            offset_above: default_offset_above(),
            offset_below: default_offset_below(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementResult {
    pub origin: LogicalPoint,
    pub size: Size,
    pub placement: Placement,
}

/// Place the menu for `span` on `display`.
///
/// Returns `None` when the display has no usable area (zero-size monitors
/// show up briefly while the display arrangement is being reconfigured).
pub fn place(
    span: SelectionSpan,
    display: &DisplayInfo,
    prior: Placement,
    menu: MenuGeometry,
) -> Option<PlacementResult> {
    if !(display.scale_factor.is_finite() && display.scale_factor > 0.0) {
        return None;
    }
    let bounds = display.logical_bounds();
    let size = Size::new(
        menu.width.min(bounds.width),
        menu.realized_height.min(bounds.height),
    );
    if size.is_empty() {
        return None;
    }

    let (start, end) = span.to_logical(display.scale_factor);
    let top_y = start.y.min(end.y);
    let bottom_y = start.y.max(end.y);
    let above_y = top_y - menu.offset_above;
    let below_y = bottom_y + menu.offset_below;

    let mut x = start.x.min(end.x);
    if x + size.width > bounds.right() {
        x = bounds.right() - size.width;
    }
    if x < bounds.left() {
        x = bounds.left();
    }

    let (mut y, placement) = match prior {
        Placement::Above if above_y < bounds.top() => (below_y, Placement::Below),
        Placement::Above => (above_y, Placement::Above),
        Placement::Below if below_y + size.height > bounds.bottom() => {
            (above_y, Placement::Above)
        }
        Placement::Below => (below_y, Placement::Below),
    };

    // Selections hugging both edges can still overflow after the flip.
    if y + size.height > bounds.bottom() {
        y = bounds.bottom() - size.height;
    }
    if y < bounds.top() {
        y = bounds.top();
    }

    Some(PlacementResult {
        origin: LogicalPoint::new(x, y),
        size,
        placement,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SelectionBand {
    min_y: i32,
    max_y: i32,
}

/// Remembers the placement bias between gestures so consecutive nearby
/// selections keep the menu on the same side.
#[derive(Debug, Clone)]
pub struct PlacementMemory {
    bias: Placement,
    band: Option<SelectionBand>,
    reset_distance: i32,
}

impl PlacementMemory {
    pub fn new(reset_distance: i32) -> Self {
        Self {
            bias: Placement::Above,
            band: None,
            reset_distance,
        }
    }

    pub fn bias(&self) -> Placement {
        self.bias
    }

    /// Place the menu for `span` and update the remembered bias and band.
    pub fn place(
        &mut self,
        span: SelectionSpan,
        display: &DisplayInfo,
        menu: MenuGeometry,
    ) -> Option<PlacementResult> {
        let (start, end) = span.to_logical(display.scale_factor);
        let band = SelectionBand {
            min_y: start.y.min(end.y),
            max_y: start.y.max(end.y),
        };

        if let Some(previous) = self.band {
            let jump = if band.max_y < previous.min_y {
                previous.min_y - band.max_y
            } else if band.min_y > previous.max_y {
                band.min_y - previous.max_y
            } else {
                0
            };
            if jump > self.reset_distance {
                self.bias = Placement::Above;
            }
        }

        let result = place(span, display, self.bias, menu)?;
        self.bias = result.placement;
        if result.origin.y < band.min_y {
            self.bias = Placement::Above;
        } else if result.origin.y > band.max_y {
            self.bias = Placement::Below;
        }
        self.band = Some(band);
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::types::{Rect, ScreenPoint};

    fn display() -> DisplayInfo {
        DisplayInfo::new(Rect::new(0, 0, 1920, 1080), 1.0)
    }

    fn span(x0: i32, y0: i32, x1: i32, y1: i32) -> SelectionSpan {
        SelectionSpan::new(ScreenPoint::new(x0, y0), ScreenPoint::new(x1, y1))
    }

    fn place_on(display: &DisplayInfo, span: SelectionSpan, prior: Placement) -> PlacementResult {
        place(span, display, prior, MenuGeometry::default()).unwrap()
    }

    #[test]
    fn above_by_default() {
        let result = place_on(&display(), span(500, 300, 700, 300), Placement::Above);
        assert_eq!(result.origin, LogicalPoint::new(500, 246));
        assert_eq!(result.placement, Placement::Above);
        assert_eq!(result.size, Size::new(600, 46));
    }

    #[test]
    fn near_top_edge_flips_below() {
        let result = place_on(&display(), span(500, 20, 700, 20), Placement::Above);
        assert_eq!(result.origin.y, 30);
        assert_eq!(result.placement, Placement::Below);
    }

    #[test]
    fn near_bottom_edge_flips_above() {
        let result = place_on(&display(), span(100, 1060, 300, 1070), Placement::Below);
        assert_eq!(result.placement, Placement::Above);
        assert_eq!(result.origin.y, 1060 - 54);
    }

    #[test]
    fn right_edge_clamps_x() {
        let result = place_on(&display(), span(1800, 500, 1900, 520), Placement::Above);
        assert_eq!(result.origin.x, 1920 - 600);
    }

    #[test]
    fn scaled_display_converts_to_logical_units() {
        let display = DisplayInfo::new(Rect::new(0, 0, 3840, 2160), 2.0);
        let result = place_on(&display, span(1000, 600, 1400, 640), Placement::Above);
        assert_eq!(result.origin, LogicalPoint::new(500, 300 - 54));
    }

    #[test]
    fn degenerate_display_yields_nothing() {
        let zero = DisplayInfo::new(Rect::new(0, 0, 0, 0), 1.0);
        let menu = MenuGeometry::default();
        assert!(place(span(0, 0, 10, 10), &zero, Placement::Above, menu).is_none());
        let bad_scale = DisplayInfo::new(Rect::new(0, 0, 1920, 1080), 0.0);
        assert!(place(span(0, 0, 10, 10), &bad_scale, Placement::Above, menu).is_none());
    }

    #[test]
    fn memory_keeps_flip_for_nearby_selection_and_resets_after_jump() {
        let mut memory = PlacementMemory::new(200);
        let first = memory
            .place(span(500, 20, 700, 20), &display(), MenuGeometry::default())
            .unwrap();
        assert_eq!(first.placement, Placement::Below);
        assert_eq!(memory.bias(), Placement::Below);

        let second = memory
            .place(span(500, 120, 700, 130), &display(), MenuGeometry::default())
            .unwrap();
        assert_eq!(second.placement, Placement::Below);
        assert_eq!(second.origin.y, 140);

        let third = memory
            .place(span(500, 700, 700, 710), &display(), MenuGeometry::default())
            .unwrap();
        assert_eq!(third.placement, Placement::Above);
        assert_eq!(third.origin.y, 646);
    }

    #[test]
    fn geometry_sizes_menu_from_realized_height() {
        let menu: MenuGeometry = serde_json::from_str(r#"{"width": 500, "height": 600}"#).unwrap();
        assert_eq!(menu.realized_height, 46);
        let result = place(span(10, 300, 20, 300), &display(), Placement::Above, menu).unwrap();
        assert_eq!(result.size, Size::new(500, 46));
    }
}
