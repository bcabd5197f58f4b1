use crate::error::GliderError;
use crate::selection::types::{InputEvent, InputKind, MouseButton, ScreenPoint};
use anyhow::anyhow;
use once_cell::sync::{Lazy, OnceCell};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Installs a system-wide mouse hook and forwards every event as an
/// [`InputEvent`]. Events are observed, never consumed.
pub trait HookBackend: Send {
    fn install(&mut self, sender: Sender<InputEvent>) -> anyhow::Result<()>;
    fn uninstall(&mut self) -> anyhow::Result<()>;
    fn is_installed(&self) -> bool;
}

static CLOCK_ORIGIN: Lazy<Instant> = Lazy::new(Instant::now);

/// Milliseconds on the process-wide monotonic clock all hook backends stamp
/// events with.
pub fn now_ms() -> u64 {
    CLOCK_ORIGIN.elapsed().as_millis() as u64
}

struct HookDispatch {
    enabled: AtomicBool,
    sender: Mutex<Option<Sender<InputEvent>>>,
    last_point: Mutex<ScreenPoint>,
}

impl HookDispatch {
    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn set_sender(&self, sender: Option<Sender<InputEvent>>) {
        if let Ok(mut guard) = self.sender.lock() {
            *guard = sender;
        }
    }

    fn forward(&self, event: InputEvent) {
        if !self.is_enabled() {
            return;
        }
        // Never block the OS callback thread on the lock.
        if let Ok(guard) = self.sender.try_lock() {
            if let Some(sender) = guard.as_ref() {
                let _ = sender.send(event);
            }
        }
    }

    #[cfg_attr(windows, allow(dead_code))]
    fn remember_point(&self, point: ScreenPoint) {
        if let Ok(mut guard) = self.last_point.lock() {
            *guard = point;
        }
    }

    #[cfg_attr(windows, allow(dead_code))]
    fn last_point(&self) -> ScreenPoint {
        self.last_point
            .lock()
            .map(|guard| *guard)
            .unwrap_or_default()
    }
}

static HOOK_DISPATCH: OnceCell<HookDispatch> = OnceCell::new();

fn hook_dispatch() -> &'static HookDispatch {
    HOOK_DISPATCH.get_or_init(|| HookDispatch {
        enabled: AtomicBool::new(false),
        sender: Mutex::new(None),
        last_point: Mutex::new(ScreenPoint::default()),
    })
}

#[cfg(windows)]
struct HookThread {
    thread_id: u32,
    join: std::thread::JoinHandle<()>,
}

/// `WH_MOUSE_LL` hook running on its own thread with a message loop.
#[cfg(windows)]
#[derive(Default)]
pub struct DefaultHookBackend {
    hook_thread: Option<HookThread>,
}

#[cfg(windows)]
unsafe impl Send for DefaultHookBackend {}

#[cfg(windows)]
impl HookBackend for DefaultHookBackend {
    fn install(&mut self, sender: Sender<InputEvent>) -> anyhow::Result<()> {
        if self.hook_thread.is_some() {
            return Ok(());
        }

        hook_dispatch().set_sender(Some(sender));
        hook_dispatch().set_enabled(true);

        use std::time::Duration;
        use windows::Win32::Foundation::ERROR_ACCESS_DENIED;
        use windows::Win32::System::LibraryLoader::GetModuleHandleW;
        use windows::Win32::System::Threading::GetCurrentThreadId;
        use windows::Win32::UI::WindowsAndMessaging::{
            DispatchMessageW, GetMessageW, PeekMessageW, SetWindowsHookExW, TranslateMessage,
            UnhookWindowsHookEx, MSG, PM_NOREMOVE, WH_MOUSE_LL,
        };

        // install() only returns once the hook thread is actually ready.
        let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel::<anyhow::Result<u32>>(1);

        let join = std::thread::spawn(move || {
            // Ensure the thread has a message queue.
            let mut msg = MSG::default();
            unsafe {
                let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);
            }

            let thread_id = unsafe { GetCurrentThreadId() };

            let hmodule = match unsafe { GetModuleHandleW(None) } {
                Ok(h) => h,
                Err(e) => {
                    let _ = ready_tx.send(Err(GliderError::HookUnavailable(e.to_string()).into()));
                    return;
                }
            };

            let hook_error = |e: windows::core::Error| -> anyhow::Error {
                if e.code() == ERROR_ACCESS_DENIED.to_hresult() {
                    GliderError::HookPermission(e.to_string()).into()
                } else {
                    GliderError::HookUnavailable(e.to_string()).into()
                }
            };

            let mouse_hook =
                match unsafe { SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_hook_proc), hmodule, 0) } {
                    Ok(h) if !h.0.is_null() => h,
                    Ok(_) => {
                        let _ = ready_tx.send(Err(hook_error(windows::core::Error::from_win32())));
                        return;
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(hook_error(e)));
                        return;
                    }
                };

            let _ = ready_tx.send(Ok(thread_id));

            // Message loop keeps WH_MOUSE_LL callbacks flowing.
            loop {
                let r = unsafe { GetMessageW(&mut msg, None, 0, 0) };
                if r.0 == 0 || r.0 == -1 {
                    break;
                }
                unsafe {
                    let _ = TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                }
            }

            unsafe {
                let _ = UnhookWindowsHookEx(mouse_hook);
            }
        });

        let ready = ready_rx
            .recv_timeout(Duration::from_secs(2))
            .map_err(|_| {
                anyhow!(GliderError::HookUnavailable(
                    "hook thread did not signal readiness".into()
                ))
            })
            .and_then(|result| result);
        match ready {
            Ok(thread_id) => {
                self.hook_thread = Some(HookThread { thread_id, join });
                Ok(())
            }
            Err(err) => {
                hook_dispatch().set_enabled(false);
                hook_dispatch().set_sender(None);
                Err(err)
            }
        }
    }

    fn uninstall(&mut self) -> anyhow::Result<()> {
        // Stop dispatch first so nothing new is queued while shutting down.
        hook_dispatch().set_enabled(false);
        hook_dispatch().set_sender(None);

        if let Some(th) = self.hook_thread.take() {
            use windows::Win32::Foundation::{LPARAM, WPARAM};
            use windows::Win32::UI::WindowsAndMessaging::{PostThreadMessageW, WM_QUIT};
            unsafe {
                let _ = PostThreadMessageW(th.thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
            }
            let _ = th.join.join();
        }

        Ok(())
    }

    fn is_installed(&self) -> bool {
        self.hook_thread.is_some()
    }
}

#[cfg(windows)]
unsafe extern "system" fn mouse_hook_proc(
    n_code: i32,
    w_param: windows::Win32::Foundation::WPARAM,
    l_param: windows::Win32::Foundation::LPARAM,
) -> windows::Win32::Foundation::LRESULT {
    use windows::Win32::UI::WindowsAndMessaging::{
        CallNextHookEx, HC_ACTION, HHOOK, MSLLHOOKSTRUCT, WM_LBUTTONDOWN, WM_LBUTTONUP,
        WM_MBUTTONDOWN, WM_MBUTTONUP, WM_MOUSEMOVE, WM_RBUTTONDOWN, WM_RBUTTONUP,
    };

    if n_code == HC_ACTION as i32 {
        let dispatch = hook_dispatch();
        if dispatch.is_enabled() {
            let info = &*(l_param.0 as *const MSLLHOOKSTRUCT);
            // Always physical pixels, whatever the process DPI awareness.
            let point = ScreenPoint::new(info.pt.x, info.pt.y);
            let translated = match w_param.0 as u32 {
                WM_LBUTTONDOWN => Some((MouseButton::Primary, InputKind::Down)),
                WM_LBUTTONUP => Some((MouseButton::Primary, InputKind::Up)),
                WM_RBUTTONDOWN => Some((MouseButton::Secondary, InputKind::Down)),
                WM_RBUTTONUP => Some((MouseButton::Secondary, InputKind::Up)),
                WM_MBUTTONDOWN => Some((MouseButton::Other, InputKind::Down)),
                WM_MBUTTONUP => Some((MouseButton::Other, InputKind::Up)),
                WM_MOUSEMOVE => Some((MouseButton::Other, InputKind::Move)),
                _ => None,
            };
            if let Some((button, kind)) = translated {
                dispatch.forward(InputEvent::new(button, kind, point, now_ms()));
            }
        }
    }

    CallNextHookEx(HHOOK(std::ptr::null_mut()), n_code, w_param, l_param)
}

#[cfg(not(windows))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListenerState {
    Idle,
    Running,
}

#[cfg(not(windows))]
static LISTENER: Mutex<ListenerState> = Mutex::new(ListenerState::Idle);

/// `rdev::listen` on a background thread. The listener cannot be stopped once
/// running, so uninstalling closes the dispatch gate and drops the sender.
#[cfg(not(windows))]
#[derive(Debug, Default)]
pub struct DefaultHookBackend {
    installed: bool,
}

#[cfg(not(windows))]
impl DefaultHookBackend {
    // A listener that cannot start fails almost immediately.
    const STARTUP_GRACE: std::time::Duration = std::time::Duration::from_millis(250);

    fn ensure_listener() -> anyhow::Result<()> {
        let mut state = LISTENER
            .lock()
            .map_err(|_| anyhow!("hook listener state poisoned"))?;
        if *state == ListenerState::Running {
            return Ok(());
        }

        let (err_tx, err_rx) = std::sync::mpsc::sync_channel::<String>(1);
        std::thread::spawn(move || {
            let result = rdev::listen(|event| {
                if let Some(input) = translate_rdev(&event.event_type) {
                    hook_dispatch().forward(input);
                }
            });
            let reason = match result {
                Ok(()) => "listener exited".to_string(),
                Err(e) => format!("{e:?}"),
            };
            tracing::error!(%reason, "global mouse listener stopped");
            // Report before touching the state: install() holds the lock while waiting.
            let _ = err_tx.send(reason);
            if let Ok(mut state) = LISTENER.lock() {
                *state = ListenerState::Idle;
            }
        });

        match err_rx.recv_timeout(Self::STARTUP_GRACE) {
            Ok(reason) => {
                if cfg!(target_os = "macos") {
                    Err(GliderError::HookPermission(reason).into())
                } else {
                    Err(GliderError::HookUnavailable(reason).into())
                }
            }
            Err(_) => {
                *state = ListenerState::Running;
                Ok(())
            }
        }
    }
}

#[cfg(not(windows))]
fn translate_rdev(event: &rdev::EventType) -> Option<InputEvent> {
    use rdev::{Button, EventType};

    let dispatch = hook_dispatch();
    let button = |b: &Button| match b {
        Button::Left => MouseButton::Primary,
        Button::Right => MouseButton::Secondary,
        _ => MouseButton::Other,
    };
    match event {
        EventType::MouseMove { x, y } => {
            let point = ScreenPoint::new(x.round() as i32, y.round() as i32);
            dispatch.remember_point(point);
            Some(InputEvent::new(MouseButton::Other, InputKind::Move, point, now_ms()))
        }
        // Button events carry no position; use the last pointer location.
        EventType::ButtonPress(b) => Some(InputEvent::new(
            button(b),
            InputKind::Down,
            dispatch.last_point(),
            now_ms(),
        )),
        EventType::ButtonRelease(b) => Some(InputEvent::new(
            button(b),
            InputKind::Up,
            dispatch.last_point(),
            now_ms(),
        )),
        _ => None,
    }
}

#[cfg(not(windows))]
impl HookBackend for DefaultHookBackend {
    fn install(&mut self, sender: Sender<InputEvent>) -> anyhow::Result<()> {
        if self.installed {
            return Ok(());
        }
        Self::ensure_listener()?;
        hook_dispatch().set_sender(Some(sender));
        hook_dispatch().set_enabled(true);
        self.installed = true;
        Ok(())
    }

    fn uninstall(&mut self) -> anyhow::Result<()> {
        hook_dispatch().set_enabled(false);
        hook_dispatch().set_sender(None);
        self.installed = false;
        Ok(())
    }

    fn is_installed(&self) -> bool {
        self.installed
    }
}

/// In-process hook for tests, observed and driven through its
/// [`MockHookHandle`].
pub struct MockHookBackend {
    state: Arc<MockHookState>,
}

#[derive(Default)]
struct MockHookState {
    install_count: AtomicUsize,
    uninstall_count: AtomicUsize,
    deny_permission: AtomicBool,
    sender: Mutex<Option<Sender<InputEvent>>>,
}

impl MockHookBackend {
    pub fn new() -> (Self, MockHookHandle) {
        let state = Arc::new(MockHookState::default());
        (
            Self {
                state: Arc::clone(&state),
            },
            MockHookHandle { state },
        )
    }
}

impl HookBackend for MockHookBackend {
    fn install(&mut self, sender: Sender<InputEvent>) -> anyhow::Result<()> {
        if self.state.deny_permission.load(Ordering::SeqCst) {
            return Err(GliderError::HookPermission("input monitoring not granted".into()).into());
        }
        let mut guard = self.state.sender.lock().map_err(|_| anyhow!("lock"))?;
        if guard.is_none() {
            self.state.install_count.fetch_add(1, Ordering::SeqCst);
            *guard = Some(sender);
        }
        Ok(())
    }

    fn uninstall(&mut self) -> anyhow::Result<()> {
        let mut guard = self.state.sender.lock().map_err(|_| anyhow!("lock"))?;
        if guard.is_some() {
            self.state.uninstall_count.fetch_add(1, Ordering::SeqCst);
        }
        *guard = None;
        Ok(())
    }

    fn is_installed(&self) -> bool {
        match self.state.sender.lock() {
            Ok(guard) => guard.is_some(),
            Err(_) => false,
        }
    }
}

#[derive(Clone)]
pub struct MockHookHandle {
    state: Arc<MockHookState>,
}

impl MockHookHandle {
    pub fn install_count(&self) -> usize {
        self.state.install_count.load(Ordering::SeqCst)
    }

    pub fn uninstall_count(&self) -> usize {
        self.state.uninstall_count.load(Ordering::SeqCst)
    }

    /// Make subsequent installs fail the way a missing OS grant does.
    pub fn deny_permission(&self, deny: bool) {
        self.state.deny_permission.store(deny, Ordering::SeqCst);
    }

    pub fn emit(&self, event: InputEvent) -> bool {
        match self.state.sender.lock() {
            Ok(guard) => guard
                .as_ref()
                .map(|sender| sender.send(event).is_ok())
                .unwrap_or(false),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn mock_counts_transitions_once() {
        let (mut backend, handle) = MockHookBackend::new();
        let (tx, rx) = mpsc::channel();
        backend.install(tx.clone()).unwrap();
        backend.install(tx).unwrap();
        assert_eq!(handle.install_count(), 1);

        assert!(handle.emit(InputEvent::moved(ScreenPoint::new(3, 4), 1)));
        assert_eq!(rx.recv().unwrap().point, ScreenPoint::new(3, 4));

        backend.uninstall().unwrap();
        backend.uninstall().unwrap();
        assert_eq!(handle.uninstall_count(), 1);
        assert!(!handle.emit(InputEvent::moved(ScreenPoint::new(0, 0), 2)));
    }

    #[test]
    fn denied_install_reports_permission_error() {
        let (mut backend, handle) = MockHookBackend::new();
        handle.deny_permission(true);
        let (tx, _rx) = mpsc::channel();
        let err = backend.install(tx).unwrap_err();
        assert!(GliderError::is_permission(&err));
        assert!(!backend.is_installed());
    }

    #[test]
    fn clock_is_monotonic() {
        let a = now_ms();
        let b = now_ms();
        assert!(b >= a);
    }
}
