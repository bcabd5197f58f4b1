use crate::selection::types::{InputEvent, InputKind, MouseButton, ScreenPoint, SelectionSpan};

/// Signals derived from the raw mouse stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// A primary button went down; a new gesture begins.
    GestureStarted,
    /// Primary press released too quickly, or without moving, to be a drag.
    Click { point: ScreenPoint, timestamp_ms: u64 },
    /// The user finished dragging over something that may be text.
    DragSelectionCompleted(SelectionSpan),
}

#[derive(Debug, Clone, Copy)]
struct PendingPress {
    point: ScreenPoint,
    timestamp_ms: u64,
}

/// Reduces mouse events into [`Signal`]s. Holds at most one tentative press.
#[derive(Debug)]
pub struct GestureReducer {
    drag_threshold_ms: u64,
    pending: Option<PendingPress>,
    last_point: Option<ScreenPoint>,
}

impl GestureReducer {
    pub fn new(drag_threshold_ms: u64) -> Self {
        Self {
            drag_threshold_ms,
            pending: None,
            last_point: None,
        }
    }

    pub fn feed(&mut self, event: &InputEvent) -> Option<Signal> {
        self.last_point = Some(event.point);

        match (event.kind, event.button) {
            (InputKind::Down, MouseButton::Primary) => {
                self.pending = Some(PendingPress {
                    point: event.point,
                    timestamp_ms: event.timestamp_ms,
                });
                Some(Signal::GestureStarted)
            }
            (InputKind::Down, _) => {
                self.pending = None;
                None
            }
            (InputKind::Up, MouseButton::Primary) => {
                let press = self.pending.take()?;
                let elapsed = event.timestamp_ms.saturating_sub(press.timestamp_ms);
                if elapsed < self.drag_threshold_ms || press.point == event.point {
                    return Some(Signal::Click {
                        point: event.point,
                        timestamp_ms: event.timestamp_ms,
                    });
                }
                Some(Signal::DragSelectionCompleted(SelectionSpan::new(
                    press.point,
                    event.point,
                )))
            }
            // Clicks are derived from down/up timing so every backend behaves alike.
            (InputKind::Up, _) | (InputKind::Move, _) | (InputKind::Click, _) => None,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.pending.is_some()
    }

    /// Last pointer position seen on any event.
    pub fn last_point(&self) -> Option<ScreenPoint> {
        self.last_point
    }

    pub fn reset(&mut self) {
        self.pending = None;
    }
}
