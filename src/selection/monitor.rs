use crate::selection::types::{Rect, ScreenPoint};
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex};

/// One connected monitor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayInfo {
    /// Monitor rectangle in physical pixels.
    pub bounds: Rect,
    pub scale_factor: f64,
}

impl DisplayInfo {
    pub fn new(bounds: Rect, scale_factor: f64) -> Self {
        Self {
            bounds,
            scale_factor,
        }
    }

    /// Monitor rectangle in the logical units overlay windows are placed in.
    pub fn logical_bounds(&self) -> Rect {
        self.bounds.to_logical(self.scale_factor)
    }
}

/// Live queries against the OS display arrangement. Nothing is cached: the
/// arrangement and the focused window can change between two gestures.
pub trait DisplayTopology: Send {
    fn displays(&self) -> anyhow::Result<Vec<DisplayInfo>>;
    /// Monitor currently showing the foreground window.
    fn focused_window_display(&self) -> Option<DisplayInfo>;
    fn cursor_position(&self) -> Option<ScreenPoint>;
}

/// Opt the process into per-monitor DPI awareness, once, so monitor rects and
/// window positions are physical pixels like the hook's points.
pub fn enable_per_monitor_dpi() {
    static APPLIED: OnceCell<()> = OnceCell::new();
    APPLIED.get_or_init(|| {
        #[cfg(windows)]
        {
            use windows::Win32::UI::HiDpi::{
                SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
            };
            let result = unsafe {
                SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2)
            };
            match result {
                Ok(()) => tracing::debug!("per-monitor DPI awareness enabled"),
                // Already set by a manifest or an earlier call.
                Err(err) => tracing::debug!(?err, "DPI awareness left unchanged"),
            }
        }
    });
}

pub fn display_contains_point(display: &DisplayInfo, point: ScreenPoint) -> bool {
    display.bounds.contains(point)
}

/// The display containing `point`, or the one closest to it.
pub fn display_nearest_point(
    displays: &[DisplayInfo],
    point: ScreenPoint,
) -> Option<DisplayInfo> {
    displays
        .iter()
        .copied()
        .find(|display| display_contains_point(display, point))
        .or_else(|| {
            displays
                .iter()
                .copied()
                .min_by_key(|display| display.bounds.distance_sq(point))
        })
}

/// Topology backed by the running OS.
#[derive(Debug, Default)]
pub struct SystemTopology {
    uniform_scale: bool,
}

impl SystemTopology {
    /// `uniform_scale` forces every display to report a scale factor of 1.0,
    /// for platforms without DPI virtualization of window coordinates.
    pub fn new(uniform_scale: bool) -> Self {
        Self { uniform_scale }
    }

    fn normalize(&self, mut display: DisplayInfo) -> DisplayInfo {
        if self.uniform_scale {
            display.scale_factor = 1.0;
        }
        display
    }
}

impl DisplayTopology for SystemTopology {
    fn displays(&self) -> anyhow::Result<Vec<DisplayInfo>> {
        Ok(enumerate_displays()?
            .into_iter()
            .map(|display| self.normalize(display))
            .collect())
    }

    fn focused_window_display(&self) -> Option<DisplayInfo> {
        focused_window_display().map(|display| self.normalize(display))
    }

    fn cursor_position(&self) -> Option<ScreenPoint> {
        cursor_position()
    }
}

#[cfg(windows)]
fn enumerate_displays() -> anyhow::Result<Vec<DisplayInfo>> {
    use windows::Win32::Foundation::{BOOL, LPARAM, RECT};
    use windows::Win32::Graphics::Gdi::{EnumDisplayMonitors, HDC, HMONITOR};

    extern "system" fn monitor_enum_proc(
        monitor: HMONITOR,
        _hdc: HDC,
        _rc_clip: *mut RECT,
        data: LPARAM,
    ) -> BOOL {
        let displays = unsafe { &mut *(data.0 as *mut Vec<DisplayInfo>) };
        if let Some(display) = describe_monitor(monitor) {
            displays.push(display);
        }
        BOOL(1)
    }

    let mut displays: Vec<DisplayInfo> = Vec::new();
    let ok = unsafe {
        EnumDisplayMonitors(
            HDC::default(),
            None,
            Some(monitor_enum_proc),
            LPARAM(&mut displays as *mut Vec<DisplayInfo> as isize),
        )
    };
    if !ok.as_bool() {
        let err = crate::error::GliderError::Topology("EnumDisplayMonitors failed".into());
        return Err(err.into());
    }
    Ok(displays)
}

#[cfg(windows)]
fn describe_monitor(monitor: windows::Win32::Graphics::Gdi::HMONITOR) -> Option<DisplayInfo> {
    use std::mem;
    use windows::Win32::Graphics::Gdi::{GetMonitorInfoW, MONITORINFO};
    use windows::Win32::UI::HiDpi::{GetDpiForMonitor, MDT_EFFECTIVE_DPI};

    let mut info = MONITORINFO {
        cbSize: mem::size_of::<MONITORINFO>() as u32,
        ..Default::default()
    };
    if !unsafe { GetMonitorInfoW(monitor, &mut info) }.as_bool() {
        return None;
    }
    let rc = info.rcMonitor;
    let (mut dpi_x, mut dpi_y) = (0u32, 0u32);
    let dpi = unsafe { GetDpiForMonitor(monitor, MDT_EFFECTIVE_DPI, &mut dpi_x, &mut dpi_y) };
    let scale_factor = match dpi {
        Ok(()) if dpi_x > 0 => dpi_x as f64 / 96.0,
        _ => 1.0,
    };
    Some(DisplayInfo::new(
        Rect::new(rc.left, rc.top, rc.right - rc.left, rc.bottom - rc.top),
        scale_factor,
    ))
}

#[cfg(windows)]
fn focused_window_display() -> Option<DisplayInfo> {
    use windows::Win32::Graphics::Gdi::{MonitorFromWindow, MONITOR_DEFAULTTONEAREST};
    use windows::Win32::UI::WindowsAndMessaging::GetForegroundWindow;

    let hwnd = unsafe { GetForegroundWindow() };
    if hwnd.0.is_null() {
        return None;
    }
    let monitor = unsafe { MonitorFromWindow(hwnd, MONITOR_DEFAULTTONEAREST) };
    if monitor.is_invalid() {
        return None;
    }
    describe_monitor(monitor)
}

#[cfg(windows)]
fn cursor_position() -> Option<ScreenPoint> {
    use windows::Win32::Foundation::POINT;
    use windows::Win32::UI::WindowsAndMessaging::GetCursorPos;

    let mut point = POINT::default();
    if unsafe { GetCursorPos(&mut point) }.is_ok() {
        Some(ScreenPoint::new(point.x, point.y))
    } else {
        None
    }
}

#[cfg(not(windows))]
fn enumerate_displays() -> anyhow::Result<Vec<DisplayInfo>> {
    let screens = screenshots::Screen::all()
        .map_err(|err| crate::error::GliderError::Topology(err.to_string()))?;
    Ok(screens
        .into_iter()
        .map(|screen| {
            let info = &screen.display_info;
            DisplayInfo::new(
                Rect::new(info.x, info.y, info.width as i32, info.height as i32),
                info.scale_factor as f64,
            )
        })
        .collect())
}

// Without a portable foreground-window query the primary display stands in.
#[cfg(not(windows))]
fn focused_window_display() -> Option<DisplayInfo> {
    let screens = screenshots::Screen::all().ok()?;
    screens
        .iter()
        .find(|screen| screen.display_info.is_primary)
        .or_else(|| screens.first())
        .map(|screen| {
            let info = &screen.display_info;
            DisplayInfo::new(
                Rect::new(info.x, info.y, info.width as i32, info.height as i32),
                info.scale_factor as f64,
            )
        })
}

#[cfg(not(windows))]
fn cursor_position() -> Option<ScreenPoint> {
    None
}

/// Fixed topology for tests and headless runs.
#[derive(Debug, Clone, Default)]
pub struct StaticTopology {
    state: Arc<Mutex<StaticTopologyState>>,
}

#[derive(Debug, Default)]
struct StaticTopologyState {
    displays: Vec<DisplayInfo>,
    focused: Option<DisplayInfo>,
    cursor: Option<ScreenPoint>,
}

impl StaticTopology {
    pub fn new(displays: Vec<DisplayInfo>) -> Self {
        let topology = Self::default();
        if let Ok(mut state) = topology.state.lock() {
            state.focused = displays.first().copied();
            state.displays = displays;
        }
        topology
    }

    pub fn single(width: i32, height: i32, scale_factor: f64) -> Self {
        Self::new(vec![DisplayInfo::new(
            Rect::new(0, 0, width, height),
            scale_factor,
        )])
    }

    pub fn set_focused(&self, display: Option<DisplayInfo>) {
        if let Ok(mut state) = self.state.lock() {
            state.focused = display;
        }
    }

    pub fn set_cursor(&self, cursor: Option<ScreenPoint>) {
        if let Ok(mut state) = self.state.lock() {
            state.cursor = cursor;
        }
    }
}

impl DisplayTopology for StaticTopology {
    fn displays(&self) -> anyhow::Result<Vec<DisplayInfo>> {
        self.state
            .lock()
            .map(|state| state.displays.clone())
            .map_err(|_| anyhow::anyhow!("topology lock poisoned"))
    }

    fn focused_window_display(&self) -> Option<DisplayInfo> {
        self.state.lock().ok().and_then(|state| state.focused)
    }

    fn cursor_position(&self) -> Option<ScreenPoint> {
        self.state.lock().ok().and_then(|state| state.cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn side_by_side() -> Vec<DisplayInfo> {
        vec![
            DisplayInfo::new(Rect::new(-1920, 0, 1920, 1080), 1.0),
            DisplayInfo::new(Rect::new(0, 0, 2560, 1440), 1.5),
        ]
    }

    #[test]
    fn point_maps_to_containing_display() {
        let displays = side_by_side();
        assert_eq!(
            display_nearest_point(&displays, ScreenPoint::new(-10, 100)),
            Some(displays[0])
        );
        assert_eq!(
            display_nearest_point(&displays, ScreenPoint::new(200, 100)),
            Some(displays[1])
        );
    }

    #[test]
    fn point_outside_every_display_maps_to_closest() {
        let displays = side_by_side();
        assert_eq!(
            display_nearest_point(&displays, ScreenPoint::new(-500, 1200)),
            Some(displays[0])
        );
        assert_eq!(
            display_nearest_point(&displays, ScreenPoint::new(2700, -40)),
            Some(displays[1])
        );
        assert_eq!(display_nearest_point(&[], ScreenPoint::new(0, 0)), None);
    }

    #[test]
    fn logical_bounds_divide_by_scale() {
        let display = DisplayInfo::new(Rect::new(0, 0, 2880, 1620), 1.5);
        assert_eq!(display.logical_bounds(), Rect::new(0, 0, 1920, 1080));
    }
}
