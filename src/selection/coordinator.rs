//! Show/hide state machine of the contextual menu.
//!
//! The coordinator lives on the service's worker thread and owns everything
//! a gesture touches: the reducer, the extractor, both overlay windows and the
//! pending click-outside deadlines. Nothing in here is shared, so nothing is
//! locked.

use crate::ipc::{ExpandedMessage, MenuMessage};
use crate::selection::clipboard::{ClipboardAccess, SelectionExtractor};
use crate::selection::engine::{GestureReducer, Signal};
use crate::selection::expanded::ExpandedSpawner;
use crate::selection::monitor::{display_nearest_point, DisplayInfo, DisplayTopology};
use crate::selection::overlay::{ContentMessage, OverlayFactory, OverlayRole, OverlayWindow};
use crate::selection::placement::{MenuGeometry, PlacementMemory};
use crate::selection::platform::SelectionPlatform;
use crate::selection::types::{
    CapturedSelection, InputEvent, Placement, ScreenPoint, SelectionSpan,
};
use crate::settings::Settings;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What armed a pending "ignore the next click-outside".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressSource {
    /// The show that opened the menu. Cleared when the next gesture starts.
    Shown,
    /// A click inside the menu. Survives until a click-outside consumes it.
    Tap,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayState {
    pub visible: bool,
    pub suppress_hide_once: Option<SuppressSource>,
}

/// Collaborators handed to a coordinator when the feature is enabled.
pub struct CoordinatorParts {
    pub platform: Arc<dyn SelectionPlatform>,
    pub clipboard: Box<dyn ClipboardAccess>,
    pub topology: Box<dyn DisplayTopology>,
    pub overlays: Arc<dyn OverlayFactory>,
}

pub struct Coordinator {
    reducer: GestureReducer,
    extractor: SelectionExtractor,
    platform: Arc<dyn SelectionPlatform>,
    topology: Box<dyn DisplayTopology>,
    memory: PlacementMemory,
    menu_geometry: MenuGeometry,
    menu: Box<dyn OverlayWindow>,
    menu_state: OverlayState,
    expanded: ExpandedSpawner,
    current_text: Option<String>,
    signed_in: bool,
    click_outside_delay: Duration,
    click_deadlines: VecDeque<Instant>,
}

impl Coordinator {
    /// Creates both overlay windows; they live until [`teardown`](Self::teardown).
    pub fn new(settings: &Settings, parts: CoordinatorParts) -> anyhow::Result<Self> {
        let menu = parts.overlays.create(OverlayRole::Menu)?;
        let expanded = match parts.overlays.create(OverlayRole::Expanded) {
            Ok(window) => window,
            Err(err) => {
                let mut menu = menu;
                menu.destroy();
                return Err(err);
            }
        };
        let timing = settings.timing;
        Ok(Self {
            reducer: GestureReducer::new(timing.drag_threshold_ms),
            extractor: SelectionExtractor::new(
                parts.clipboard,
                Duration::from_millis(timing.copy_settle_ms),
                Duration::from_millis(timing.retry_delay_ms),
            ),
            platform: parts.platform,
            topology: parts.topology,
            memory: PlacementMemory::new(settings.band_reset_px),
            menu_geometry: settings.menu,
            menu,
            menu_state: OverlayState::default(),
            expanded: ExpandedSpawner::new(expanded, settings.expanded),
            current_text: None,
            signed_in: false,
            click_outside_delay: Duration::from_millis(timing.click_outside_delay_ms),
            click_deadlines: VecDeque::new(),
        })
    }

    pub fn menu_state(&self) -> OverlayState {
        self.menu_state
    }

    pub fn expanded_visible(&self) -> bool {
        self.expanded.is_visible()
    }

    /// Text of the last gesture that showed the menu.
    pub fn current_text(&self) -> Option<&str> {
        self.current_text.as_deref()
    }

    pub fn placement_bias(&self) -> Placement {
        self.memory.bias()
    }

    pub fn is_signed_in(&self) -> bool {
        self.signed_in
    }

    /// Selections are only captured for a signed-in user. Signing out closes
    /// both overlays and forgets the last selection.
    pub fn set_signed_in(&mut self, signed_in: bool) {
        if self.signed_in == signed_in {
            return;
        }
        self.signed_in = signed_in;
        if !signed_in {
            self.click_deadlines.clear();
            self.hide_menu();
            self.expanded.close();
            self.current_text = None;
        }
        tracing::info!(signed_in, "session changed");
    }

    /// The host brought its main window forward.
    pub fn host_opened(&mut self) {
        self.click_deadlines.clear();
        self.hide_menu();
    }

    pub fn handle_input(&mut self, event: &InputEvent, now: Instant) {
        match self.reducer.feed(event) {
            Some(Signal::GestureStarted) => {
                if self.menu_state.suppress_hide_once == Some(SuppressSource::Shown) {
                    self.menu_state.suppress_hide_once = None;
                }
            }
            Some(Signal::Click { point, .. }) => {
                if self.menu_state.visible {
                    tracing::trace!(?point, "click while menu is visible");
                    self.click_deadlines.push_back(now + self.click_outside_delay);
                }
            }
            Some(Signal::DragSelectionCompleted(span)) => self.on_drag_selection(span),
            None => {}
        }
    }

    fn on_drag_selection(&mut self, span: SelectionSpan) {
        if !self.signed_in {
            tracing::debug!("signed out, selection ignored");
            return;
        }
        let probe = self.platform.probe_selection();
        if !probe.should_extract() {
            tracing::debug!(?probe, "no active selection reported, gesture abandoned");
            return;
        }
        let selection = self.extractor.extract_with_retry(self.platform.as_ref());
        self.show_selection(span, selection);
    }

    /// Place and show the menu for a selection made along `span`.
    pub fn show_selection(&mut self, span: SelectionSpan, selection: CapturedSelection) {
        if selection.is_empty() {
            tracing::debug!("drag produced no new clipboard text");
            return;
        }
        if !self.signed_in {
            tracing::debug!("signed out, menu not shown");
            return;
        }
        let text = selection.text;
        if self.current_text.as_deref() == Some(text.as_str()) {
            tracing::debug!(chars = text.chars().count(), "selection not novel");
        }

        let Some(display) = self.resolve_display(span) else {
            tracing::debug!(?span, "no display for selection");
            return;
        };
        let Some(result) = self.memory.place(span, &display, self.menu_geometry) else {
            let shown = &display;
            tracing::debug!(display = ?shown, "menu does not fit the display, not showing");
            return;
        };

        self.menu.set_bounds(result.origin, result.size, display.scale_factor);
        if !self.menu_state.visible {
            self.menu.show_inactive();
            self.menu_state.visible = true;
        }
        self.menu_state.suppress_hide_once = Some(SuppressSource::Shown);
        self.menu.send(ContentMessage::selection(&text));
        tracing::debug!(origin = ?result.origin, placement = ?result.placement, "menu shown");
        self.current_text = Some(text);
    }

    /// Bounds from the display nearest the selection start, scale from the
    /// display of the focused window.
    fn resolve_display(&self, span: SelectionSpan) -> Option<DisplayInfo> {
        let displays = match self.topology.displays() {
            Ok(displays) => displays,
            Err(err) => {
                tracing::warn!(?err, "display enumeration failed");
                return None;
            }
        };
        let nearest = display_nearest_point(&displays, span.start)?;
        let scale_factor = self
            .topology
            .focused_window_display()
            .map_or(nearest.scale_factor, |focused| focused.scale_factor);
        Some(DisplayInfo::new(nearest.bounds, scale_factor))
    }

    /// The delayed signal that follows a plain click while the menu is open.
    pub fn click_outside(&mut self) {
        if !self.menu_state.visible {
            return;
        }
        if let Some(source) = self.menu_state.suppress_hide_once.take() {
            tracing::trace!(?source, "click-outside absorbed");
            return;
        }
        self.hide_menu();
        self.current_text = None;
    }

    fn hide_menu(&mut self) {
        if self.menu_state.visible {
            self.menu.hide();
        }
        self.menu_state = OverlayState::default();
    }

    pub fn handle_menu(&mut self, message: MenuMessage) {
        match message {
            MenuMessage::Select { data } => self.spawn_expanded(data),
            MenuMessage::Tap => {
                if self.menu_state.visible {
                    self.menu_state.suppress_hide_once = Some(SuppressSource::Tap);
                }
            }
            MenuMessage::Hide => self.hide_menu(),
        }
    }

    fn spawn_expanded(&mut self, data: serde_json::Value) {
        let cursor = self
            .topology
            .cursor_position()
            .or_else(|| self.reducer.last_point())
            .unwrap_or(ScreenPoint::default());
        let display = self
            .topology
            .displays()
            .ok()
            .and_then(|displays| display_nearest_point(&displays, cursor));
        match display {
            Some(display) => {
                let text = self.current_text.clone().unwrap_or_default();
                self.expanded.open(&display, data, &text);
            }
            None => tracing::warn!(?cursor, "no display for the expanded overlay"),
        }
        self.hide_menu();
    }

    pub fn handle_expanded(&mut self, message: ExpandedMessage) {
        match message {
            ExpandedMessage::Close => self.expanded.close(),
            ExpandedMessage::Ready => self.expanded.mark_ready(),
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.click_deadlines.front().copied()
    }

    /// Fire every click-outside whose deadline has passed.
    pub fn fire_due(&mut self, now: Instant) {
        while let Some(deadline) = self.click_deadlines.front().copied() {
            if deadline > now {
                break;
            }
            self.click_deadlines.pop_front();
            self.click_outside();
        }
    }

    /// Hide and destroy both windows.
    pub fn teardown(&mut self) {
        self.click_deadlines.clear();
        self.reducer.reset();
        self.hide_menu();
        self.menu.destroy();
        self.expanded.teardown();
        self.current_text = None;
    }
}
