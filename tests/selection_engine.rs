use glider::selection::{
    GestureReducer, InputEvent, InputKind, MouseButton, ScreenPoint, SelectionSpan, Signal,
};

fn down(x: i32, y: i32, t: u64) -> InputEvent {
    InputEvent::primary_down(ScreenPoint::new(x, y), t)
}

fn up(x: i32, y: i32, t: u64) -> InputEvent {
    InputEvent::primary_up(ScreenPoint::new(x, y), t)
}

#[test]
fn slow_press_with_movement_is_a_drag_selection() {
    let mut reducer = GestureReducer::new(200);
    assert_eq!(reducer.feed(&down(500, 300, 1_000)), Some(Signal::GestureStarted));
    assert!(reducer.is_tracking());
    assert_eq!(
        reducer.feed(&up(700, 300, 1_200)),
        Some(Signal::DragSelectionCompleted(SelectionSpan::new(
            ScreenPoint::new(500, 300),
            ScreenPoint::new(700, 300),
        )))
    );
    assert!(!reducer.is_tracking());
}

#[test]
fn quick_release_is_a_click_even_after_moving() {
    let mut reducer = GestureReducer::new(200);
    reducer.feed(&down(10, 10, 0));
    assert_eq!(
        reducer.feed(&up(300, 40, 199)),
        Some(Signal::Click {
            point: ScreenPoint::new(300, 40),
            timestamp_ms: 199
        })
    );
}

#[test]
fn long_press_without_movement_is_a_click() {
    let mut reducer = GestureReducer::new(200);
    reducer.feed(&down(42, 42, 0));
    assert!(matches!(
        reducer.feed(&up(42, 42, 5_000)),
        Some(Signal::Click { .. })
    ));
}

#[test]
fn release_without_press_emits_nothing() {
    let mut reducer = GestureReducer::new(200);
    assert_eq!(reducer.feed(&up(1, 1, 10)), None);

    reducer.feed(&down(0, 0, 0));
    reducer.feed(&up(50, 0, 400));
    // The tentative start is consumed by the first release.
    assert_eq!(reducer.feed(&up(90, 0, 800)), None);
}

#[test]
fn other_buttons_and_moves_never_signal() {
    let mut reducer = GestureReducer::new(200);
    let right_down = InputEvent::new(
        MouseButton::Secondary,
        InputKind::Down,
        ScreenPoint::new(0, 0),
        0,
    );
    let right_up = InputEvent::new(
        MouseButton::Secondary,
        InputKind::Up,
        ScreenPoint::new(90, 0),
        500,
    );
    let os_click = InputEvent::new(
        MouseButton::Primary,
        InputKind::Click,
        ScreenPoint::new(90, 0),
        500,
    );
    assert_eq!(reducer.feed(&right_down), None);
    assert_eq!(reducer.feed(&InputEvent::moved(ScreenPoint::new(45, 0), 200)), None);
    assert_eq!(reducer.feed(&right_up), None);
    assert_eq!(reducer.feed(&os_click), None);
    assert_eq!(reducer.last_point(), Some(ScreenPoint::new(90, 0)));
}

#[test]
fn threshold_is_configurable() {
    let mut reducer = GestureReducer::new(350);
    reducer.feed(&down(0, 0, 0));
    assert!(matches!(reducer.feed(&up(80, 0, 300)), Some(Signal::Click { .. })));
    reducer.feed(&down(0, 0, 1_000));
    assert!(matches!(
        reducer.feed(&up(80, 0, 1_350)),
        Some(Signal::DragSelectionCompleted(_))
    ));
}
