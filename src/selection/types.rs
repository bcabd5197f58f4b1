use serde::{Deserialize, Serialize};

/// Point in physical (device) pixels, the native unit of the input hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn to_logical(self, scale_factor: f64) -> LogicalPoint {
        LogicalPoint {
            x: to_logical(self.x, scale_factor),
            y: to_logical(self.y, scale_factor),
        }
    }
}

/// Point in logical units (physical / scale factor). Placement works in these;
/// native windows convert back with the scale of the display they land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LogicalPoint {
    pub x: i32,
    pub y: i32,
}

impl LogicalPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn to_physical(self, scale_factor: f64) -> ScreenPoint {
        ScreenPoint {
            x: to_physical(self.x, scale_factor),
            y: to_physical(self.y, scale_factor),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn to_physical(self, scale_factor: f64) -> Size {
        Size {
            width: to_physical(self.width, scale_factor),
            height: to_physical(self.height, scale_factor),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn contains(&self, point: ScreenPoint) -> bool {
        point.x >= self.left()
            && point.x < self.right()
            && point.y >= self.top()
            && point.y < self.bottom()
    }

    /// Squared distance from `point` to the closest point of the rectangle;
    /// zero when the point lies inside.
    pub fn distance_sq(&self, point: ScreenPoint) -> i64 {
        let dx = if point.x < self.left() {
            self.left() - point.x
        } else if point.x >= self.right() {
            point.x - (self.right() - 1)
        } else {
            0
        } as i64;
        let dy = if point.y < self.top() {
            self.top() - point.y
        } else if point.y >= self.bottom() {
            point.y - (self.bottom() - 1)
        } else {
            0
        } as i64;
        dx * dx + dy * dy
    }

    pub fn to_logical(&self, scale_factor: f64) -> Rect {
        Rect {
            x: to_logical(self.x, scale_factor),
            y: to_logical(self.y, scale_factor),
            width: to_logical(self.width, scale_factor),
            height: to_logical(self.height, scale_factor),
        }
    }
}

fn to_logical(value: i32, scale_factor: f64) -> i32 {
    if !(scale_factor.is_finite() && scale_factor > 0.0) {
        return value;
    }
    (value as f64 / scale_factor).round() as i32
}

fn to_physical(value: i32, scale_factor: f64) -> i32 {
    if !(scale_factor.is_finite() && scale_factor > 0.0) {
        return value;
    }
    (value as f64 * scale_factor).round() as i32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Primary,
    Secondary,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Down,
    Up,
    Move,
    Click,
}

/// One raw mouse event as delivered by a hook backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEvent {
    pub button: MouseButton,
    pub kind: InputKind,
    pub point: ScreenPoint,
    pub timestamp_ms: u64,
}

impl InputEvent {
    pub fn new(
        button: MouseButton,
        kind: InputKind,
        point: ScreenPoint,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            button,
            kind,
            point,
            timestamp_ms,
        }
    }

    pub fn primary_down(point: ScreenPoint, timestamp_ms: u64) -> Self {
        Self::new(MouseButton::Primary, InputKind::Down, point, timestamp_ms)
    }

    pub fn primary_up(point: ScreenPoint, timestamp_ms: u64) -> Self {
        Self::new(MouseButton::Primary, InputKind::Up, point, timestamp_ms)
    }

    pub fn moved(point: ScreenPoint, timestamp_ms: u64) -> Self {
        Self::new(MouseButton::Other, InputKind::Move, point, timestamp_ms)
    }
}

/// Down/up points of a qualifying drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionSpan {
    pub start: ScreenPoint,
    pub end: ScreenPoint,
}

impl SelectionSpan {
    pub fn new(start: ScreenPoint, end: ScreenPoint) -> Self {
        Self { start, end }
    }

    pub fn to_logical(&self, scale_factor: f64) -> (LogicalPoint, LogicalPoint) {
        (
            self.start.to_logical(scale_factor),
            self.end.to_logical(scale_factor),
        )
    }
}

/// Text obtained from one clipboard round-trip. Empty means nothing new was
/// selected.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CapturedSelection {
    pub text: String,
}

impl CapturedSelection {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Menu position relative to the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    #[default]
    Above,
    Below,
}
