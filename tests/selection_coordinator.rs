
use glider::ipc::{ExpandedMessage, MenuMessage};
use glider::selection::{
    Coordinator, CoordinatorParts, DisplayInfo, InputEvent, LogicalPoint, MemoryClipboard,
    OverlayRole, OverlayState, Placement, RecordingOverlayFactory, Rect, ScreenPoint,
    SelectionProbe, Size, StaticTopology, SuppressSource,
};
use mock_platform::{boxed_clipboard, fast_settings, ScriptedPlatform};
use serde_json::json;
use serial_test::serial;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Harness {
    coordinator: Coordinator,
    platform: Arc<ScriptedPlatform>,
    clipboard: MemoryClipboard,
    overlays: RecordingOverlayFactory,
    topology: StaticTopology,
}

fn harness_with(topology: StaticTopology) -> Harness {
    let mut h = signed_out_harness(topology);
    h.coordinator.set_signed_in(true);
    h
}

fn signed_out_harness(topology: StaticTopology) -> Harness {
    let clipboard = MemoryClipboard::with_text("user data");
    let platform = ScriptedPlatform::new(&clipboard);
    let overlays = RecordingOverlayFactory::default();
    let coordinator = Coordinator::new(
        &fast_settings(),
        CoordinatorParts {
            platform: platform.clone(),
            clipboard: boxed_clipboard(&clipboard),
            topology: Box::new(topology.clone()),
            overlays: Arc::new(overlays.clone()),
        },
    )
    .unwrap();
    Harness {
        coordinator,
        platform,
        clipboard,
        overlays,
        topology,
    }
}

fn harness() -> Harness {
    harness_with(StaticTopology::single(1920, 1080, 1.0))
}

impl Harness {
    fn drag(&mut self, from: (i32, i32), to: (i32, i32), t: u64) {
        let now = Instant::now();
        self.coordinator.handle_input(
            &InputEvent::primary_down(ScreenPoint::new(from.0, from.1), t),
            now,
        );
        self.coordinator.handle_input(
            &InputEvent::primary_up(ScreenPoint::new(to.0, to.1), t + 400),
            now,
        );
    }

    fn click(&mut self, at: (i32, i32), t: u64, now: Instant) {
        let point = ScreenPoint::new(at.0, at.1);
        self.coordinator
            .handle_input(&InputEvent::primary_down(point, t), now);
        self.coordinator
            .handle_input(&InputEvent::primary_up(point, t + 60), now);
    }

    fn menu_visible(&self) -> bool {
        self.overlays.record(OverlayRole::Menu).unwrap().visible
    }
}

#[test]
#[serial]
fn drag_selection_shows_menu_above_the_text() {
    let mut h = harness();
    h.platform.select(Some("hello world"));

    h.drag((500, 300), (700, 300), 1_000);

    let record = h.overlays.record(OverlayRole::Menu).unwrap();
    assert!(record.visible);
    assert_eq!(record.origin, Some(LogicalPoint::new(500, 246)));
    assert_eq!(record.size, Some(Size::new(600, 46)));
    assert_eq!(record.messages.len(), 1);
    assert_eq!(record.messages[0].kind, "selection");
    assert_eq!(record.messages[0].data, Some(json!("hello world")));

    let state = h.coordinator.menu_state();
    assert!(state.visible);
    assert_eq!(state.suppress_hide_once, Some(SuppressSource::Shown));
    assert_eq!(h.coordinator.current_text(), Some("hello world"));
    assert_eq!(h.clipboard.text().as_deref(), Some("user data"));
}

#[test]
#[serial]
fn first_click_outside_after_show_is_absorbed() {
    let mut h = harness();
    h.platform.select(Some("hello world"));
    h.drag((500, 300), (700, 300), 0);

    h.coordinator.click_outside();
    assert!(h.menu_visible());
    assert_eq!(h.coordinator.menu_state().suppress_hide_once, None);

    h.coordinator.click_outside();
    assert!(!h.menu_visible());
    assert_eq!(h.coordinator.current_text(), None);
}

#[test]
#[serial]
fn click_elsewhere_hides_after_the_delay() {
    let mut h = harness();
    h.platform.select(Some("hello world"));
    h.drag((500, 300), (700, 300), 0);

    let now = Instant::now();
    h.click((1500, 900), 2_000, now);
    assert!(h.coordinator.next_deadline().is_some());

    h.coordinator.fire_due(now + Duration::from_millis(100));
    assert!(h.menu_visible());

    h.coordinator.fire_due(now + Duration::from_millis(250));
    assert!(!h.menu_visible());
    assert_eq!(h.coordinator.next_deadline(), None);
}

#[test]
#[serial]
fn tap_inside_menu_keeps_it_open_once() {
    let mut h = harness();
    h.platform.select(Some("hello world"));
    h.drag((500, 300), (700, 300), 0);

    let now = Instant::now();
    h.click((520, 260), 2_000, now);
    h.coordinator.handle_menu(MenuMessage::Tap);
    assert_eq!(
        h.coordinator.menu_state().suppress_hide_once,
        Some(SuppressSource::Tap)
    );
    h.coordinator.fire_due(now + Duration::from_millis(250));
    assert!(h.menu_visible());

    h.click((1500, 900), 3_000, now);
    h.coordinator.fire_due(now + Duration::from_millis(500));
    assert!(!h.menu_visible());
}

#[test]
#[serial]
fn clicks_while_hidden_schedule_nothing() {
    let mut h = harness();
    h.click((10, 10), 0, Instant::now());
    assert_eq!(h.coordinator.next_deadline(), None);
    assert_eq!(h.platform.copies(), 0);
}

#[test]
#[serial]
fn short_press_never_touches_the_clipboard() {
    let mut h = harness();
    h.platform.select(Some("hello world"));
    let now = Instant::now();
    h.coordinator
        .handle_input(&InputEvent::primary_down(ScreenPoint::new(0, 0), 0), now);
    h.coordinator
        .handle_input(&InputEvent::primary_up(ScreenPoint::new(300, 0), 150), now);
    assert_eq!(h.platform.copies(), 0);
    assert!(!h.menu_visible());
}

#[test]
#[serial]
fn inactive_probe_abandons_the_gesture() {
    let mut h = harness();
    h.platform.select(Some("hello world"));
    h.platform.set_probe(SelectionProbe::Inactive);
    h.drag((500, 300), (700, 300), 0);
    assert_eq!(h.platform.copies(), 0);
    assert!(!h.menu_visible());

    h.platform.set_probe(SelectionProbe::Unknown);
    h.drag((500, 300), (700, 300), 1_000);
    assert!(h.menu_visible());
}

#[test]
#[serial]
fn drag_without_selection_shows_nothing() {
    let mut h = harness();
    h.drag((500, 300), (700, 300), 0);
    assert_eq!(h.platform.copies(), 1);
    assert!(!h.menu_visible());
    assert_eq!(h.clipboard.text().as_deref(), Some("user data"));
}

#[test]
#[serial]
fn new_selection_repositions_without_hiding() {
    let mut h = harness();
    h.platform.select(Some("first"));
    h.drag((500, 300), (700, 300), 0);
    h.platform.select(Some("second"));
    h.drag((100, 600), (400, 620), 1_000);

    let record = h.overlays.record(OverlayRole::Menu).unwrap();
    assert_eq!(record.show_count, 1);
    assert_eq!(record.hide_count, 0);
    assert_eq!(record.origin, Some(LogicalPoint::new(100, 546)));
    assert_eq!(h.coordinator.current_text(), Some("second"));
    assert_eq!(h.overlays.created_count(OverlayRole::Menu), 1);
}

#[test]
#[serial]
fn identical_text_still_moves_the_menu() {
    let mut h = harness();
    h.platform.select(Some("same words"));
    h.drag((500, 300), (700, 300), 0);
    h.drag((900, 700), (1100, 700), 1_000);

    let record = h.overlays.record(OverlayRole::Menu).unwrap();
    assert_eq!(record.origin, Some(LogicalPoint::new(900, 646)));
    assert_eq!(record.messages.len(), 2);
}

#[test]
#[serial]
fn hide_message_overrides_suppression() {
    let mut h = harness();
    h.platform.select(Some("hello world"));
    h.drag((500, 300), (700, 300), 0);
    h.coordinator.handle_menu(MenuMessage::Hide);
    assert!(!h.menu_visible());
    assert_eq!(h.coordinator.menu_state().suppress_hide_once, None);
}

#[test]
#[serial]
fn select_opens_expanded_overlay_with_payloads_after_ready() {
    let mut h = harness();
    h.platform.select(Some("hello world"));
    h.drag((500, 300), (700, 300), 0);

    h.coordinator.handle_menu(MenuMessage::Select {
        data: json!({"id": "translate"}),
    });

    assert!(!h.menu_visible());
    let expanded = h.overlays.record(OverlayRole::Expanded).unwrap();
    assert!(expanded.visible);
    assert_eq!(expanded.origin, Some(LogicalPoint::new(660, 324)));
    assert_eq!(expanded.size, Some(Size::new(600, 600)));
    assert!(expanded.messages.is_empty());

    h.coordinator.handle_expanded(ExpandedMessage::Ready);
    let expanded = h.overlays.record(OverlayRole::Expanded).unwrap();
    let kinds: Vec<_> = expanded.messages.iter().map(|m| m.kind.as_str()).collect();
    assert_eq!(kinds, ["app", "submit"]);
    assert_eq!(expanded.messages[0].data, Some(json!({"id": "translate"})));
    assert_eq!(expanded.messages[1].data, Some(json!("hello world")));
    assert!(expanded.messages.iter().all(|m| m.channel == "fastchat:service"));

    h.coordinator.handle_expanded(ExpandedMessage::Close);
    assert!(!h.coordinator.expanded_visible());
}

#[test]
#[serial]
fn expanded_overlay_follows_the_cursor_display() {
    let displays = vec![
        DisplayInfo::new(Rect::new(0, 0, 1920, 1080), 1.0),
        DisplayInfo::new(Rect::new(1920, 0, 2560, 1440), 1.0),
    ];
    let mut h = harness_with(StaticTopology::new(displays));
    h.platform.select(Some("hello world"));
    h.drag((500, 300), (700, 300), 0);
    h.topology.set_cursor(Some(ScreenPoint::new(2500, 700)));

    h.coordinator.handle_expanded(ExpandedMessage::Ready);
    h.coordinator.handle_menu(MenuMessage::Select { data: json!(null) });

    let expanded = h.overlays.record(OverlayRole::Expanded).unwrap();
    assert_eq!(expanded.origin, Some(LogicalPoint::new(1920 + 980, 432)));
    assert_eq!(expanded.messages.len(), 2);
}

#[test]
#[serial]
fn focused_window_scale_converts_to_logical_units() {
    let mut h = harness_with(StaticTopology::single(3840, 2160, 2.0));
    h.platform.select(Some("hello world"));
    h.drag((1000, 600), (1400, 640), 0);

    let record = h.overlays.record(OverlayRole::Menu).unwrap();
    assert_eq!(record.origin, Some(LogicalPoint::new(500, 246)));
    assert_eq!(h.coordinator.placement_bias(), Placement::Above);
}

#[test]
#[serial]
fn teardown_destroys_both_windows() {
    let mut h = harness();
    h.platform.select(Some("hello world"));
    h.drag((500, 300), (700, 300), 0);
    h.coordinator.teardown();

    let menu = h.overlays.record(OverlayRole::Menu).unwrap();
    let expanded = h.overlays.record(OverlayRole::Expanded).unwrap();
    assert!(menu.destroyed && !menu.visible);
    assert!(expanded.destroyed);
    assert_eq!(h.coordinator.current_text(), None);
}

#[test]
#[serial]
fn mixed_scale_monitors_place_in_the_focused_display_units() {
    let primary = DisplayInfo::new(Rect::new(0, 0, 1920, 1080), 1.0);
    let secondary = DisplayInfo::new(Rect::new(1920, 0, 2880, 1620), 1.5);
    let mut h = harness_with(StaticTopology::new(vec![primary, secondary]));
    h.topology.set_focused(Some(secondary));
    h.platform.select(Some("hello world"));

    h.drag((2400, 600), (2700, 600), 0);

    let record = h.overlays.record(OverlayRole::Menu).unwrap();
    assert_eq!(record.origin, Some(LogicalPoint::new(1600, 346)));
    assert_eq!(record.size, Some(Size::new(600, 46)));
    assert_eq!(record.scale_factor, Some(1.5));
    let physical = record.origin.unwrap().to_physical(1.5);
    assert!(secondary.bounds.contains(physical), "{physical:?}");

    h.topology.set_focused(Some(primary));
    h.drag((300, 500), (500, 500), 1_000);
    let record = h.overlays.record(OverlayRole::Menu).unwrap();
    assert_eq!(record.origin, Some(LogicalPoint::new(300, 446)));
    assert_eq!(record.scale_factor, Some(1.0));
}

#[test]
#[serial]
fn signed_out_session_leaves_the_clipboard_alone() {
    let mut h = signed_out_harness(StaticTopology::single(1920, 1080, 1.0));
    h.platform.select(Some("hello world"));

    h.drag((500, 300), (700, 300), 0);
    assert_eq!(h.platform.copies(), 0);
    assert!(!h.menu_visible());
    assert_eq!(h.coordinator.current_text(), None);

    h.coordinator.set_signed_in(true);
    h.drag((500, 300), (700, 300), 1_000);
    assert!(h.menu_visible());
}

#[test]
#[serial]
fn signing_out_closes_both_overlays() {
    let mut h = harness();
    h.platform.select(Some("hello world"));
    h.drag((500, 300), (700, 300), 0);
    h.coordinator.handle_expanded(ExpandedMessage::Ready);
    h.coordinator.handle_menu(MenuMessage::Select { data: json!(null) });
    assert!(h.coordinator.expanded_visible());

    h.drag((500, 600), (700, 600), 1_000);
    assert!(h.menu_visible());

    h.coordinator.set_signed_in(false);
    assert!(!h.menu_visible());
    assert!(!h.coordinator.expanded_visible());
    assert_eq!(h.coordinator.current_text(), None);
    assert_eq!(h.coordinator.menu_state(), OverlayState::default());
}

#[test]
#[serial]
fn host_window_opening_hides_the_menu() {
    let mut h = harness();
    h.platform.select(Some("hello world"));
    let now = Instant::now();
    h.drag((500, 300), (700, 300), 0);
    h.click((1500, 900), 2_000, now);

    h.coordinator.host_opened();
    assert!(!h.menu_visible());
    assert_eq!(h.coordinator.menu_state(), OverlayState::default());
    assert_eq!(h.coordinator.next_deadline(), None);
}
