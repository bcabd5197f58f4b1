//! The two long-lived overlay windows and the channel their content is fed through.

use crate::selection::types::{LogicalPoint, Size};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const MENU_CHANNEL: &str = "glider:service";
pub const EXPANDED_CHANNEL: &str = "fastchat:service";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayRole {
    /// Contextual menu placed next to the selection.
    Menu,
    /// Larger assistant overlay spawned from the menu.
    Expanded,
}

impl OverlayRole {
    pub fn channel(self) -> &'static str {
        match self {
            OverlayRole::Menu => MENU_CHANNEL,
            OverlayRole::Expanded => EXPANDED_CHANNEL,
        }
    }
}

/// Message for the web content hosted in an overlay window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentMessage {
    pub channel: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ContentMessage {
    pub fn new(role: OverlayRole, kind: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            channel: role.channel().to_string(),
            kind: kind.into(),
            data,
        }
    }

    /// Captured text for the menu.
    pub fn selection(text: &str) -> Self {
        Self::new(OverlayRole::Menu, "selection", Some(Value::String(text.to_string())))
    }

    /// Action payload chosen in the menu, for the expanded overlay.
    pub fn app(data: Value) -> Self {
        Self::new(OverlayRole::Expanded, "app", Some(data))
    }

    pub fn submit(text: &str) -> Self {
        Self::new(OverlayRole::Expanded, "submit", Some(Value::String(text.to_string())))
    }

    /// Native window state, for hosts that draw the overlay themselves.
    pub fn window_state(
        role: OverlayRole,
        visible: bool,
        origin: LogicalPoint,
        size: Size,
    ) -> Self {
        Self::new(
            role,
            "window",
            Some(json!({
                "visible": visible,
                "x": origin.x,
                "y": origin.y,
                "width": size.width,
                "height": size.height,
            })),
        )
    }
}

/// Delivers content messages to the host's web content.
pub trait ContentSink: Send + Sync {
    fn deliver(&self, message: &ContentMessage) -> anyhow::Result<()>;
}

/// Keeps every delivered message, for tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingContentSink {
    messages: Arc<Mutex<Vec<ContentMessage>>>,
}

impl RecordingContentSink {
    pub fn messages(&self) -> Vec<ContentMessage> {
        self.messages
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl ContentSink for RecordingContentSink {
    fn deliver(&self, message: &ContentMessage) -> anyhow::Result<()> {
        self.messages
            .lock()
            .map_err(|_| anyhow::anyhow!("recording sink poisoned"))?
            .push(message.clone());
        Ok(())
    }
}

/// Borderless, always-on-top window that never takes focus.
pub trait OverlayWindow: Send {
    /// Move and resize. `scale_factor` belongs to the display the logical
    /// bounds were computed on.
    fn set_bounds(&mut self, origin: LogicalPoint, size: Size, scale_factor: f64);
    /// Show without activating, so the foreign selection stays highlighted.
    fn show_inactive(&mut self);
    fn hide(&mut self);
    fn is_visible(&self) -> bool;
    fn send(&mut self, message: ContentMessage);
    fn destroy(&mut self);
}

pub trait OverlayFactory: Send + Sync {
    fn create(&self, role: OverlayRole) -> anyhow::Result<Box<dyn OverlayWindow>>;
}

/// Native popup windows on Windows, host-drawn windows elsewhere. Content
/// always goes through `sink`.
pub struct DefaultOverlayFactory {
    sink: Arc<dyn ContentSink>,
}

impl DefaultOverlayFactory {
    pub fn new(sink: Arc<dyn ContentSink>) -> Self {
        Self { sink }
    }
}

impl OverlayFactory for DefaultOverlayFactory {
    fn create(&self, role: OverlayRole) -> anyhow::Result<Box<dyn OverlayWindow>> {
        #[cfg(windows)]
        {
            Ok(Box::new(PopupOverlayWindow::create(role, Arc::clone(&self.sink))?))
        }
        #[cfg(not(windows))]
        {
            Ok(Box::new(HostOverlayWindow::new(role, Arc::clone(&self.sink))))
        }
    }
}

fn deliver(sink: &dyn ContentSink, message: &ContentMessage) {
    if let Err(err) = sink.deliver(message) {
        tracing::warn!(
            ?err,
            channel = %message.channel,
            kind = %message.kind,
            "failed to deliver overlay message"
        );
    }
}

/// Overlay whose surface is drawn by the host; geometry and visibility are
/// reported as `window` messages on the role's channel.
pub struct HostOverlayWindow {
    role: OverlayRole,
    sink: Arc<dyn ContentSink>,
    origin: LogicalPoint,
    size: Size,
    visible: bool,
}

impl HostOverlayWindow {
    pub fn new(role: OverlayRole, sink: Arc<dyn ContentSink>) -> Self {
        Self {
            role,
            sink,
            origin: LogicalPoint::default(),
            size: Size::default(),
            visible: false,
        }
    }

    fn publish(&self) {
        deliver(
            self.sink.as_ref(),
            &ContentMessage::window_state(self.role, self.visible, self.origin, self.size),
        );
    }
}

impl OverlayWindow for HostOverlayWindow {
    // Hosts lay windows out in logical units themselves.
    fn set_bounds(&mut self, origin: LogicalPoint, size: Size, _scale_factor: f64) {
        self.origin = origin;
        self.size = size;
        if self.visible {
            self.publish();
        }
    }

    fn show_inactive(&mut self) {
        self.visible = true;
        self.publish();
    }

    fn hide(&mut self) {
        if self.visible {
            self.visible = false;
            self.publish();
        }
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn send(&mut self, message: ContentMessage) {
        deliver(self.sink.as_ref(), &message);
    }

    fn destroy(&mut self) {
        self.hide();
    }
}

#[cfg(windows)]
pub struct PopupOverlayWindow {
    sink: Arc<dyn ContentSink>,
    hwnd: isize,
    visible: bool,
    thread: Option<std::thread::JoinHandle<()>>,
}

#[cfg(windows)]
impl PopupOverlayWindow {
    /// Spawn the window thread and wait for the window to exist.
    pub fn create(role: OverlayRole, sink: Arc<dyn ContentSink>) -> anyhow::Result<Self> {
        use std::time::Duration;

        let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel::<anyhow::Result<isize>>(1);
        let thread = std::thread::spawn(move || {
            use windows::core::{w, PCWSTR};
            use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
            use windows::Win32::System::LibraryLoader::GetModuleHandleW;
            use windows::Win32::UI::WindowsAndMessaging::{
                CreateWindowExW, DefWindowProcW, DispatchMessageW, GetMessageW, PostQuitMessage,
                RegisterClassW, TranslateMessage, CS_HREDRAW, CS_VREDRAW, HMENU, MA_NOACTIVATE, MSG,
                WM_DESTROY, WM_MOUSEACTIVATE, WNDCLASSW, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW,
                WS_EX_TOPMOST, WS_POPUP,
            };

            unsafe extern "system" fn wndproc(
                hwnd: HWND,
                msg: u32,
                wparam: WPARAM,
                lparam: LPARAM,
            ) -> LRESULT {
                if msg == WM_MOUSEACTIVATE {
                    return LRESULT(MA_NOACTIVATE as isize);
                }
                if msg == WM_DESTROY {
                    PostQuitMessage(0);
                }
                DefWindowProcW(hwnd, msg, wparam, lparam)
            }

            unsafe {
                let class_name = w!("GliderOverlay");
                let hinstance = GetModuleHandleW(None).unwrap_or_default();
                let wc = WNDCLASSW {
                    style: CS_HREDRAW | CS_VREDRAW,
                    lpfnWndProc: Some(wndproc),
                    hInstance: hinstance.into(),
                    lpszClassName: class_name,
                    ..Default::default()
                };
                // Fails harmlessly when the class was registered by the other role.
                let _ = RegisterClassW(&wc);
                let hwnd = CreateWindowExW(
                    WS_EX_TOPMOST | WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE,
                    wc.lpszClassName,
                    PCWSTR::null(),
                    WS_POPUP,
                    0,
                    0,
                    0,
                    0,
                    None,
                    HMENU::default(),
                    hinstance,
                    None,
                );
                match hwnd {
                    Ok(hwnd) if !hwnd.0.is_null() => {
                        let _ = ready_tx.send(Ok(hwnd.0 as isize));
                    }
                    Ok(_) => {
                        let _ = ready_tx.send(Err(windows::core::Error::from_win32().into()));
                        return;
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.into()));
                        return;
                    }
                }

                let mut msg = MSG::default();
                while GetMessageW(&mut msg, HWND(std::ptr::null_mut()), 0, 0).into() {
                    let _ = TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                }
            }
        });

        let hwnd = ready_rx
            .recv_timeout(Duration::from_secs(2))
            .map_err(|_| anyhow::anyhow!("overlay window thread did not start"))??;
        tracing::debug!(?role, hwnd, "overlay window created");
        Ok(Self {
            sink,
            hwnd,
            visible: false,
            thread: Some(thread),
        })
    }

    fn handle(&self) -> windows::Win32::Foundation::HWND {
        windows::Win32::Foundation::HWND(self.hwnd as *mut _)
    }
}

#[cfg(windows)]
impl OverlayWindow for PopupOverlayWindow {
    fn set_bounds(&mut self, origin: LogicalPoint, size: Size, scale_factor: f64) {
        use windows::Win32::UI::WindowsAndMessaging::{
            SetWindowPos, HWND_TOPMOST, SWP_NOACTIVATE,
        };
        // Per-monitor aware process: SetWindowPos takes physical pixels.
        let origin = origin.to_physical(scale_factor);
        let size = size.to_physical(scale_factor);
        unsafe {
            let _ = SetWindowPos(
                self.handle(),
                HWND_TOPMOST,
                origin.x,
                origin.y,
                size.width,
                size.height,
                SWP_NOACTIVATE,
            );
        }
    }

    fn show_inactive(&mut self) {
        use windows::Win32::UI::WindowsAndMessaging::{ShowWindow, SW_SHOWNOACTIVATE};
        unsafe {
            let _ = ShowWindow(self.handle(), SW_SHOWNOACTIVATE);
        }
        self.visible = true;
    }

    fn hide(&mut self) {
        use windows::Win32::UI::WindowsAndMessaging::{ShowWindow, SW_HIDE};
        unsafe {
            let _ = ShowWindow(self.handle(), SW_HIDE);
        }
        self.visible = false;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn send(&mut self, message: ContentMessage) {
        deliver(self.sink.as_ref(), &message);
    }

    fn destroy(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.visible = false;
        unsafe {
            let _ = windows::Win32::UI::WindowsAndMessaging::PostMessageW(
                self.handle(),
                windows::Win32::UI::WindowsAndMessaging::WM_CLOSE,
                windows::Win32::Foundation::WPARAM(0),
                windows::Win32::Foundation::LPARAM(0),
            );
        }
        let _ = thread.join();
    }
}

#[cfg(windows)]
impl Drop for PopupOverlayWindow {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Everything a [`RecordingOverlayWindow`] was asked to do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayRecord {
    pub visible: bool,
    pub origin: Option<LogicalPoint>,
    pub size: Option<Size>,
    pub scale_factor: Option<f64>,
    pub show_count: usize,
    pub hide_count: usize,
    pub messages: Vec<ContentMessage>,
    pub destroyed: bool,
}

pub struct RecordingOverlayWindow {
    record: Arc<Mutex<OverlayRecord>>,
}

impl RecordingOverlayWindow {
    fn update(&self, f: impl FnOnce(&mut OverlayRecord)) {
        if let Ok(mut record) = self.record.lock() {
            f(&mut record);
        }
    }
}

impl OverlayWindow for RecordingOverlayWindow {
    fn set_bounds(&mut self, origin: LogicalPoint, size: Size, scale_factor: f64) {
        self.update(|r| {
            r.origin = Some(origin);
            r.size = Some(size);
            r.scale_factor = Some(scale_factor);
        });
    }

    fn show_inactive(&mut self) {
        self.update(|r| {
            r.visible = true;
            r.show_count += 1;
        });
    }

    fn hide(&mut self) {
        self.update(|r| {
            r.visible = false;
            r.hide_count += 1;
        });
    }

    fn is_visible(&self) -> bool {
        self.record.lock().map(|r| r.visible).unwrap_or(false)
    }

    fn send(&mut self, message: ContentMessage) {
        self.update(|r| r.messages.push(message));
    }

    fn destroy(&mut self) {
        self.update(|r| {
            r.visible = false;
            r.destroyed = true;
        });
    }
}

/// Hands out [`RecordingOverlayWindow`]s and keeps their records, one per role
/// and creation.
#[derive(Clone, Default)]
pub struct RecordingOverlayFactory {
    created: Arc<Mutex<HashMap<OverlayRole, Vec<Arc<Mutex<OverlayRecord>>>>>>,
}

impl RecordingOverlayFactory {
    pub fn created_count(&self, role: OverlayRole) -> usize {
        self.created
            .lock()
            .map(|map| map.get(&role).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Record of the most recently created window for `role`.
    pub fn record(&self, role: OverlayRole) -> Option<OverlayRecord> {
        let map = self.created.lock().ok()?;
        let latest = map.get(&role)?.last()?;
        let record = latest.lock().ok()?;
        Some(record.clone())
    }
}

impl OverlayFactory for RecordingOverlayFactory {
    fn create(&self, role: OverlayRole) -> anyhow::Result<Box<dyn OverlayWindow>> {
        let record = Arc::new(Mutex::new(OverlayRecord::default()));
        self.created
            .lock()
            .map_err(|_| anyhow::anyhow!("recording factory poisoned"))?
            .entry(role)
            .or_default()
            .push(Arc::clone(&record));
        Ok(Box::new(RecordingOverlayWindow { record }))
    }
}
